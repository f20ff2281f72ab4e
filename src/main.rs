use anyhow::{Context, Result, bail};
use futures::{StreamExt, pin_mut};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use video_uploader::{
    config::{AppConfig, Command},
    models::{
        metadata::VideoMetadata,
        policy::UploadPolicy,
        source::UploadSource,
        video::{Registration, VideoUpdate},
    },
    services::{api_client::ApiClient, upload_service::Uploader},
};

const PROGRESS_TEMPLATE: &str =
    "{spinner} {msg} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;
    tracing::debug!("Starting video-uploader with config: {:?}", cfg);

    let api = ApiClient::new(cfg.api_url.clone()).context("building HTTP client")?;

    // --- Session ---
    if command.needs_session() {
        if let Some((email, password)) = &cfg.credentials {
            api.login(email, password).await.context("logging in")?;
        }
    }

    // --- Dispatch ---
    match command {
        Command::Upload {
            path,
            title,
            description,
            mime_type,
        } => {
            let metadata = VideoMetadata::new(title, description);
            run_upload(&api, &cfg, path, metadata, mime_type).await
        }
        Command::List => {
            let videos = api.list_videos().await.context("listing videos")?;
            if videos.is_empty() {
                println!("no videos");
            }
            for video in videos {
                println!("{}\t{}\t{}", video.id, video.status, video.title);
            }
            Ok(())
        }
        Command::Show { id } => {
            let video = api.get_video(&id).await.with_context(|| format!("fetching video {id}"))?;
            println!("id:          {}", video.id);
            println!("title:       {}", video.title);
            println!("description: {}", video.description);
            println!("status:      {}", video.status);
            if let Some(thumbnail) = video.thumbnail {
                println!("thumbnail:   {thumbnail}");
            }
            Ok(())
        }
        Command::Delete { id } => {
            api.delete_video(&id).await.with_context(|| format!("deleting video {id}"))?;
            println!("deleted {id}");
            Ok(())
        }
        Command::Update {
            id,
            title,
            description,
        } => {
            let update = VideoUpdate { title, description };
            api.update_video(&id, &update)
                .await
                .with_context(|| format!("updating video {id}"))?;
            println!("updated {id}");
            Ok(())
        }
        Command::Config => {
            let config = api.fetch_config().await.context("fetching /config")?;
            println!("file size limit: {} bytes", config.file_size_limit);
            for allowed in config.supported_file_types {
                println!("accepts:         {} ({})", allowed.mime_type, allowed.extension);
            }
            Ok(())
        }
        Command::Events => follow_events(&api).await,
        Command::Register { username } => {
            let Some((email, password)) = &cfg.credentials else {
                bail!("register needs --email and --password");
            };
            let registration = Registration::new(username.as_str(), email.as_str(), password.as_str());
            api.register(&registration).await.context("registering")?;
            println!("registered {username}");
            Ok(())
        }
        Command::Logout => {
            if cfg.credentials.is_none() {
                bail!("logout needs --email and --password to open the session it closes");
            }
            api.logout().await.context("logging out")?;
            println!("logged out");
            Ok(())
        }
    }
}

/// Upload one file with a progress bar. Ctrl-C stops before the next chunk.
async fn run_upload(
    api: &ApiClient,
    cfg: &AppConfig,
    path: PathBuf,
    metadata: VideoMetadata,
    mime_type: Option<String>,
) -> Result<()> {
    let source = UploadSource::from_path(&path, mime_type)
        .await
        .with_context(|| format!("opening {}", path.display()))?;

    let server_config = api
        .fetch_config()
        .await
        .context("fetching upload limits from /config")?;
    let policy = UploadPolicy::from_server_config(cfg.chunk_size, server_config);

    let uploader = Uploader::new(api.chunk_transport()?).with_chunk_timeout(cfg.chunk_timeout);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current chunk");
                cancel.cancel();
            }
        })
    };

    let bar = ProgressBar::new(source.total_bytes());
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .context("building progress bar style")?
            .progress_chars("#>-"),
    );
    bar.set_message(source.name().to_string());

    let result = uploader
        .upload(&source, &metadata, &policy, &cancel, |progress| {
            bar.set_position(progress.sent);
        })
        .await;
    interrupt.abort();

    let outcome = match result {
        Ok(outcome) => {
            bar.finish();
            outcome
        }
        Err(err) => {
            bar.abandon();
            return Err(err).with_context(|| format!("uploading {}", source.name()));
        }
    };

    println!(
        "uploaded {} as {} ({} bytes in {} chunks, server said: {})",
        source.name(),
        outcome.upload_id,
        outcome.bytes_sent,
        outcome.chunks_sent,
        outcome.last_response.trim()
    );
    Ok(())
}

/// Print `upload_status` events until the stream ends or Ctrl-C.
async fn follow_events(api: &ApiClient) -> Result<()> {
    let events = api.server_events().await.context("connecting to /server-events/")?;
    pin_mut!(events);
    let interrupt = tokio::signal::ctrl_c();
    pin_mut!(interrupt);

    tracing::info!("Listening for upload status events");
    loop {
        tokio::select! {
            _ = &mut interrupt => break,
            next = events.next() => match next {
                Some(Ok(event)) => match event.upload_status() {
                    Some(Ok(status)) => println!(
                        "{}\t{}\t{}",
                        status.id,
                        status.status,
                        status.title.unwrap_or_default()
                    ),
                    Some(Err(err)) => tracing::warn!("Undecodable upload_status payload: {}", err),
                    None => tracing::debug!(event = %event.event, "Ignoring event"),
                },
                Some(Err(err)) => return Err(err).context("reading event stream"),
                None => break,
            },
        }
    }
    Ok(())
}
