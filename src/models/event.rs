//! Events pushed over `/server-events/`.

use super::video::VideoStatus;
use serde::{Deserialize, Serialize};

/// Event name carrying processing updates for an uploaded video.
pub const UPLOAD_STATUS_EVENT: &str = "upload_status";

/// One dispatched Server-Sent Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

impl ServerEvent {
    /// Decode the payload of an `upload_status` event. Returns `None` for any
    /// other event name.
    pub fn upload_status(&self) -> Option<serde_json::Result<UploadStatusEvent>> {
        (self.event == UPLOAD_STATUS_EVENT).then(|| serde_json::from_str(&self.data))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatusEvent {
    pub id: String,
    pub status: VideoStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}
