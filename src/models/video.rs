//! Videos as the API reports them, and the request bodies that manage them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Processing state reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum VideoStatus {
    ProcessingFailed,
    #[default]
    UploadPending,
    UploadedOnServer,
    ProcessingCompleted,
}

impl TryFrom<i8> for VideoStatus {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::ProcessingFailed),
            0 => Ok(Self::UploadPending),
            1 => Ok(Self::UploadedOnServer),
            2 => Ok(Self::ProcessingCompleted),
            other => Err(format!("unknown video status {other}")),
        }
    }
}

impl From<VideoStatus> for i8 {
    fn from(status: VideoStatus) -> Self {
        match status {
            VideoStatus::ProcessingFailed => -1,
            VideoStatus::UploadPending => 0,
            VideoStatus::UploadedOnServer => 1,
            VideoStatus::ProcessingCompleted => 2,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ProcessingFailed => "processing failed",
            Self::UploadPending => "upload pending",
            Self::UploadedOnServer => "uploaded",
            Self::ProcessingCompleted => "ready",
        };
        f.write_str(label)
    }
}

/// A video record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Server-side identifier (the upload identifier of the session that created it).
    pub id: String,

    pub title: String,

    pub description: String,

    /// Thumbnail URL once processing produced one.
    #[serde(default, deserialize_with = "deserialize_thumbnail")]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub status: VideoStatus,
}

/// Thumbnails arrive as a plain string, `null`, or a nullable-string object
/// `{"String": "...", "Valid": true}`. Empty strings count as absent.
fn deserialize_thumbnail<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Nullable {
            #[serde(rename = "String")]
            value: String,
            #[serde(rename = "Valid")]
            valid: bool,
        },
    }

    let value = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Nullable { value, valid: true }) => Some(value),
        Some(Raw::Nullable { valid: false, .. }) | None => None,
    };
    Ok(value.filter(|s| !s.is_empty()))
}

/// Body of `PATCH /video/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoUpdate {
    pub title: String,
    pub description: String,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body of `POST /register`. The server rejects it unless
/// `confirm_password` equals `password`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    /// Registration where the confirmation repeats `password`.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            email: email.into(),
            confirm_password: password.clone(),
            password,
        }
    }
}
