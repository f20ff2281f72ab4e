//! Typed access to the video API.
//!
//! One `reqwest::Client` with a cookie store backs every call, so the
//! session cookie set by `/login` is presented on uploads and management
//! calls alike.

use crate::{
    errors::{ApiError, ApiResult},
    models::{
        event::ServerEvent,
        metadata::ensure_field_safe,
        policy::ServerConfig,
        video::{Credentials, Registration, Video, VideoUpdate},
    },
    services::{events::decode_event_stream, transport::HttpChunkTransport},
};
use futures::{Stream, StreamExt};
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, info};
use url::Url;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client with its own cookie store.
    pub fn new(base_url: Url) -> ApiResult<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use an existing client. A missing trailing `/` is added to the base
    /// so relative paths resolve beneath it.
    pub fn with_client(client: Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Chunk transport sharing this client's connection pool and cookies.
    pub fn chunk_transport(&self) -> ApiResult<HttpChunkTransport> {
        Ok(HttpChunkTransport::new(self.client.clone(), &self.base_url)?)
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// `<base>/video/<id>` with `id` percent-encoded as a single segment.
    fn video_url(&self, id: &str) -> ApiResult<Url> {
        let mut url = self.url("video/")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// `GET /config`: upload limits advertised by the server.
    pub async fn fetch_config(&self) -> ApiResult<ServerConfig> {
        let response = self.client.get(self.url("config")?).send().await?;
        let config: ServerConfig = decode_json(ensure_success(response).await?).await?;
        debug!(
            file_size_limit = config.file_size_limit,
            types = config.supported_file_types.len(),
            "fetched server config"
        );
        Ok(config)
    }

    /// `POST /login`. On success the session cookie is kept for later calls.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<()> {
        let body = Credentials {
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        };
        if body.email.is_empty() || body.password.is_empty() {
            return Err(ApiError::status(
                StatusCode::BAD_REQUEST,
                "Please fill in both email and password",
            ));
        }

        let response = self.client.post(self.url("login")?).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => "Invalid email or password",
                StatusCode::NOT_FOUND => "User does not exist",
                StatusCode::INTERNAL_SERVER_ERROR => "Internal server error",
                _ => return Err(status_error(response).await),
            };
            return Err(ApiError::status(status, message));
        }

        info!(email = %body.email, "logged in");
        Ok(())
    }

    /// `POST /register`.
    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url("register")?)
            .json(registration)
            .send()
            .await?;
        ensure_success(response).await?;
        info!(username = %registration.username, "registered");
        Ok(())
    }

    /// `POST /logout`.
    pub async fn logout(&self) -> ApiResult<()> {
        let response = self.client.post(self.url("logout")?).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// `GET /video`.
    pub async fn list_videos(&self) -> ApiResult<Vec<Video>> {
        let response = self.client.get(self.url("video")?).send().await?;
        decode_json(ensure_success(response).await?).await
    }

    /// `GET /video/:id`.
    pub async fn get_video(&self, id: &str) -> ApiResult<Video> {
        let response = self.client.get(self.video_url(id)?).send().await?;
        decode_json(ensure_success(response).await?).await
    }

    /// `DELETE /video/:id`.
    pub async fn delete_video(&self, id: &str) -> ApiResult<()> {
        let response = self.client.delete(self.video_url(id)?).send().await?;
        ensure_success(response).await?;
        info!(id, "video deleted");
        Ok(())
    }

    /// `PATCH /video/:id`. Title and description pass the same allow-list as uploads.
    pub async fn update_video(&self, id: &str, update: &VideoUpdate) -> ApiResult<()> {
        ensure_field_safe("title", &update.title)?;
        ensure_field_safe("description", &update.description)?;

        let response = self
            .client
            .patch(self.video_url(id)?)
            .json(update)
            .send()
            .await?;
        ensure_success(response).await?;
        info!(id, "video updated");
        Ok(())
    }

    /// `GET /server-events/` as a stream of decoded events.
    pub async fn server_events(&self) -> ApiResult<impl Stream<Item = ApiResult<ServerEvent>>> {
        let response = self
            .client
            .get(self.url("server-events/")?)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(decode_event_stream(response.bytes_stream()).map(|item| item.map_err(ApiError::from)))
    }
}

async fn ensure_success(response: Response) -> ApiResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

/// Turn a non-success response into `ApiError::Status`. The message is the
/// `error` field of a JSON body when there is one, otherwise the body text.
async fn status_error(response: Response) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    ApiError::status(status, error_message(status, &text))
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        if !error.trim().is_empty() {
            return error.trim().to_string();
        }
    }
    match body.trim() {
        "" => status.canonical_reason().unwrap_or("request failed").to_string(),
        trimmed => trimmed.to_string(),
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))
}
