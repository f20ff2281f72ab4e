//! Sending a single chunk to the ingest endpoint.

use crate::{errors::TransportError, models::chunk::ChunkRequest};
use reqwest::{
    Client, StatusCode,
    header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use std::future::Future;
use url::Url;

/// Path of the ingest endpoint relative to the API base.
pub const INGEST_PATH: &str = "video/";

/// What the endpoint answered for an accepted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReceipt {
    pub status: StatusCode,
    pub body: String,
}

/// Delivers one chunk and resolves once the endpoint has answered.
///
/// Implementations must not return before the response status is known: the
/// upload loop relies on this to keep at most one chunk in flight.
pub trait ChunkTransport {
    fn send_chunk(
        &self,
        request: &ChunkRequest,
    ) -> impl Future<Output = Result<ChunkReceipt, TransportError>> + Send;
}

/// `POST <base>/video/` over HTTP.
#[derive(Clone, Debug)]
pub struct HttpChunkTransport {
    client: Client,
    endpoint: Url,
}

impl HttpChunkTransport {
    /// `base_url` should end with `/` so that the ingest path is appended
    /// rather than replacing the last segment.
    pub fn new(client: Client, base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            endpoint: base_url.join(INGEST_PATH)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn headers_for(request: &ChunkRequest) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(request.body.len() as u64));

        for (name, value) in request.header_pairs() {
            let value = HeaderValue::from_str(&value).map_err(|_| {
                TransportError::InvalidRequest(format!("`{name}` cannot be sent as a header value"))
            })?;
            headers.insert(HeaderName::from_static(name), value);
        }
        Ok(headers)
    }
}

impl ChunkTransport for HttpChunkTransport {
    async fn send_chunk(&self, request: &ChunkRequest) -> Result<ChunkReceipt, TransportError> {
        let headers = Self::headers_for(request)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(TransportError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(TransportError::Network)?;

        if !status.is_success() {
            return Err(TransportError::Status { status, body });
        }
        Ok(ChunkReceipt { status, body })
    }
}
