//! Chunked upload client.
//!
//! `Uploader::upload` turns one source file and its metadata into a strictly
//! ordered sequence of chunk requests:
//!
//! - Validation (metadata, empty file, MIME type, size limit) runs first and
//!   never touches the network.
//! - One upload identifier is generated per session and repeated, together
//!   with title, description and total size, on every chunk.
//! - Each chunk is awaited before the next is read, so at most one chunk is
//!   in flight and the endpoint's answers pace the sender.
//! - The first failed chunk ends the session. Nothing is retried and no
//!   cleanup request is sent; a fresh session starts from scratch.

use crate::{
    errors::TransportError,
    models::{
        chunk::{ChunkPlan, ChunkRequest},
        metadata::{InvalidField, VideoMetadata},
        policy::UploadPolicy,
        progress::Progress,
        source::UploadSource,
    },
    services::transport::{ChunkReceipt, ChunkTransport},
};
use reqwest::StatusCode;
use std::{io, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{field} is invalid: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("file type `{mime_type}` is not supported (allowed: {allowed})")]
    UnsupportedType { mime_type: String, allowed: String },
    #[error("file is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("chunk {chunk_index} was not accepted: {cause}")]
    TransmissionFailed {
        chunk_index: u64,
        #[source]
        cause: TransportError,
    },
    #[error("upload cancelled after {chunks_sent} chunks ({bytes_sent} bytes)")]
    Cancelled { chunks_sent: u64, bytes_sent: u64 },
    #[error("could not read chunk {chunk_index} from the source file")]
    ReadFailed {
        chunk_index: u64,
        #[source]
        source: io::Error,
    },
}

impl From<InvalidField> for UploadError {
    fn from(err: InvalidField) -> Self {
        UploadError::InvalidInput {
            field: err.field,
            reason: err.reason,
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;

/// A session that delivered every chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub upload_id: Uuid,
    pub bytes_sent: u64,
    pub chunks_sent: u64,
    /// Status of the final chunk's response.
    pub last_status: StatusCode,
    /// Body of the final chunk's response.
    pub last_response: String,
}

/// Check everything that can be checked without the network.
///
/// Order: title, description, non-empty file, MIME type, size limit.
pub fn validate_upload(
    source: &UploadSource,
    metadata: &VideoMetadata,
    policy: &UploadPolicy,
) -> UploadResult<()> {
    metadata.validate()?;

    if source.total_bytes() == 0 {
        return Err(UploadError::InvalidInput {
            field: "file",
            reason: format!("`{}` is empty", source.name()),
        });
    }

    if !policy.allows_mime_type(source.mime_type()) {
        return Err(UploadError::UnsupportedType {
            mime_type: source.mime_type().to_string(),
            allowed: policy.allowed_mime_types().join(", "),
        });
    }

    if source.total_bytes() > policy.max_file_size {
        return Err(UploadError::TooLarge {
            size: source.total_bytes(),
            limit: policy.max_file_size,
        });
    }

    Ok(())
}

/// Sends files through a [`ChunkTransport`], one chunk at a time.
#[derive(Debug, Clone)]
pub struct Uploader<T> {
    transport: T,
    chunk_timeout: Option<Duration>,
}

impl<T: ChunkTransport> Uploader<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chunk_timeout: None,
        }
    }

    /// Bound the wait for each chunk's response. Expiry counts as a failed
    /// transmission. `None` leaves only the transport's own limits.
    pub fn with_chunk_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload `source` under a fresh upload identifier.
    ///
    /// `cancel` is checked before each chunk is issued; a chunk already in
    /// flight runs to completion. `on_progress` is called after every
    /// accepted chunk.
    pub async fn upload<F>(
        &self,
        source: &UploadSource,
        metadata: &VideoMetadata,
        policy: &UploadPolicy,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> UploadResult<UploadOutcome>
    where
        F: FnMut(Progress),
    {
        validate_upload(source, metadata, policy)?;

        let upload_id = Uuid::new_v4();
        let span = tracing::info_span!("upload", %upload_id, file = source.name());
        self.run_session(upload_id, source, metadata, policy, cancel, on_progress)
            .instrument(span)
            .await
    }

    async fn run_session<F>(
        &self,
        upload_id: Uuid,
        source: &UploadSource,
        metadata: &VideoMetadata,
        policy: &UploadPolicy,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> UploadResult<UploadOutcome>
    where
        F: FnMut(Progress),
    {
        let total = source.total_bytes();
        let plan = ChunkPlan::new(total, policy.chunk_size);
        info!(
            total_bytes = total,
            chunk_size = plan.chunk_size(),
            chunks = plan.chunk_count(),
            "starting upload"
        );

        let mut reader = source
            .reader()
            .await
            .map_err(|source| UploadError::ReadFailed {
                chunk_index: 0,
                source,
            })?;

        let mut bytes_sent = 0u64;
        let mut chunks_sent = 0u64;
        let mut last_status = StatusCode::OK;
        let mut last_response = String::new();

        for range in plan.iter() {
            if cancel.is_cancelled() {
                warn!(chunks_sent, bytes_sent, "upload cancelled");
                return Err(UploadError::Cancelled {
                    chunks_sent,
                    bytes_sent,
                });
            }

            let body = reader
                .read_range(range.as_range())
                .await
                .map_err(|source| UploadError::ReadFailed {
                    chunk_index: range.index,
                    source,
                })?;

            let request = ChunkRequest {
                upload_id,
                range,
                total_size: total,
                title: metadata.title.clone(),
                description: metadata.description.clone(),
                body,
            };

            debug!(
                index = range.index,
                start = range.start,
                end = range.end,
                first = range.is_first(),
                "sending chunk"
            );

            let receipt = self.send(&request).await.map_err(|cause| {
                warn!(index = range.index, error = %cause, "chunk failed, aborting upload");
                UploadError::TransmissionFailed {
                    chunk_index: range.index,
                    cause,
                }
            })?;
            debug!(index = range.index, status = %receipt.status, response = %receipt.body, "chunk accepted");

            bytes_sent += range.len();
            chunks_sent += 1;
            on_progress(Progress::new(bytes_sent, total));

            last_status = receipt.status;
            last_response = receipt.body;
        }

        info!(bytes_sent, chunks_sent, "upload finished");
        Ok(UploadOutcome {
            upload_id,
            bytes_sent,
            chunks_sent,
            last_status,
            last_response,
        })
    }

    async fn send(&self, request: &ChunkRequest) -> Result<ChunkReceipt, TransportError> {
        match self.chunk_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.send_chunk(request))
                .await
                .map_err(|_| TransportError::TimedOut(limit))?,
            None => self.transport.send_chunk(request).await,
        }
    }
}
