use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::{env, fmt, num::NonZeroU64, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/";
/// 5 MB per request.
pub const DEFAULT_CHUNK_SIZE: u64 = 5_000_000;
pub const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 120;

/// Centralized client configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub api_url: Url,
    pub chunk_size: NonZeroU64,
    /// `None` disables the per-chunk timeout.
    pub chunk_timeout: Option<Duration>,
    pub credentials: Option<(String, String)>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_url", &self.api_url.as_str())
            .field("chunk_size", &self.chunk_size)
            .field("chunk_timeout", &self.chunk_timeout)
            .field("email", &self.credentials.as_ref().map(|(email, _)| email))
            .finish_non_exhaustive()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Chunked upload client for the video API")]
pub struct Args {
    /// Base URL of the API (overrides VIDEO_UPLOADER_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bytes per upload request (overrides VIDEO_UPLOADER_CHUNK_SIZE)
    #[arg(long, global = true)]
    pub chunk_size: Option<NonZeroU64>,

    /// Seconds to wait for each chunk's response, 0 to wait indefinitely
    /// (overrides VIDEO_UPLOADER_CHUNK_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub chunk_timeout_secs: Option<u64>,

    /// Log in with this email first (overrides VIDEO_UPLOADER_EMAIL)
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Password for --email (overrides VIDEO_UPLOADER_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload a video file in chunks
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// MIME type to declare instead of guessing from the extension
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// List your videos
    List,
    /// Show one video
    Show { id: String },
    /// Delete a video
    Delete { id: String },
    /// Change a video's title and description
    Update {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Print the server's upload limits
    Config,
    /// Follow processing status events until interrupted
    Events,
    /// Create an account with --email and --password
    Register {
        #[arg(long)]
        username: String,
    },
    /// Log in with --email and --password, then end the session on the server
    Logout,
}

impl Command {
    /// Whether the configured credentials are used to log in before running.
    /// Registration creates the account those credentials belong to.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Command::Register { .. })
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        // Parse CLI once
        let args = Args::parse();
        let command = args.command.clone();
        let cfg = Self::resolve(args, |key| env::var(key).ok())?;
        Ok((cfg, command))
    }

    /// Merge `args` over the variables returned by `lookup`, then defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_api_url = lookup("VIDEO_UPLOADER_API_URL");
        let env_chunk_size = lookup("VIDEO_UPLOADER_CHUNK_SIZE")
            .map(|value| {
                value
                    .trim()
                    .parse::<NonZeroU64>()
                    .with_context(|| format!("parsing VIDEO_UPLOADER_CHUNK_SIZE value `{value}`"))
            })
            .transpose()?;
        let env_timeout = lookup("VIDEO_UPLOADER_CHUNK_TIMEOUT_SECS")
            .map(|value| {
                value.trim().parse::<u64>().with_context(|| {
                    format!("parsing VIDEO_UPLOADER_CHUNK_TIMEOUT_SECS value `{value}`")
                })
            })
            .transpose()?;

        // --- Merge ---
        let raw_url = args
            .api_url
            .or(env_api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.into());
        let api_url =
            Url::parse(&raw_url).with_context(|| format!("parsing API url `{raw_url}`"))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            bail!("API url `{raw_url}` must use http or https");
        }

        let chunk_size = args
            .chunk_size
            .or(env_chunk_size)
            .or(NonZeroU64::new(DEFAULT_CHUNK_SIZE))
            .context("chunk size must be greater than zero")?;

        let timeout_secs = args
            .chunk_timeout_secs
            .or(env_timeout)
            .unwrap_or(DEFAULT_CHUNK_TIMEOUT_SECS);
        let chunk_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let email = args.email.or_else(|| lookup("VIDEO_UPLOADER_EMAIL"));
        let password = args.password.or_else(|| lookup("VIDEO_UPLOADER_PASSWORD"));
        let credentials = match (email, password) {
            (Some(email), Some(password)) => Some((email, password)),
            (Some(_), None) => bail!("--email given without --password"),
            (None, Some(_)) => bail!("--password given without --email"),
            (None, None) => None,
        };

        Ok(Self {
            api_url,
            chunk_size,
            chunk_timeout,
            credentials,
        })
    }
}
