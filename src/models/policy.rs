//! Upload limits: the `/config` payload and the policy derived from it.

use serde::{Deserialize, Deserializer, Serialize, de};
use std::num::NonZeroU64;

/// A file type the server accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedType {
    #[serde(rename = "file_type")]
    pub mime_type: String,
    #[serde(rename = "file_extension")]
    pub extension: String,
}

impl AllowedType {
    pub fn new(mime_type: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            extension: extension.into(),
        }
    }
}

/// Body of `GET /config`.
///
/// The server sends the size limit as a string; numbers are accepted too.
/// Either way the limit is parsed to an integer byte count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(alias = "FILE_SIZE_LIMIT", deserialize_with = "deserialize_byte_limit")]
    pub file_size_limit: u64,
    #[serde(default)]
    pub supported_file_types: Vec<AllowedType>,
}

fn deserialize_byte_limit<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<u64>().map_err(|_| {
            de::Error::custom(format!("file size limit `{s}` is not a byte count"))
        }),
    }
}

/// Everything the upload client checks a source against, plus the chunk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub chunk_size: NonZeroU64,
    pub allowed_types: Vec<AllowedType>,
    pub max_file_size: u64,
}

impl UploadPolicy {
    pub fn new(chunk_size: NonZeroU64, allowed_types: Vec<AllowedType>, max_file_size: u64) -> Self {
        Self {
            chunk_size,
            allowed_types,
            max_file_size,
        }
    }

    /// Build a policy from the server's advertised limits.
    pub fn from_server_config(chunk_size: NonZeroU64, config: ServerConfig) -> Self {
        Self::new(chunk_size, config.supported_file_types, config.file_size_limit)
    }

    /// MIME types compare case-insensitively, ignoring parameters such as `; codecs=...`.
    pub fn allows_mime_type(&self, mime_type: &str) -> bool {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        self.allowed_types
            .iter()
            .any(|t| t.mime_type.eq_ignore_ascii_case(essence))
    }

    pub fn allowed_mime_types(&self) -> Vec<&str> {
        self.allowed_types.iter().map(|t| t.mime_type.as_str()).collect()
    }
}
