//! Data types for the upload client and the video API.
//!
//! `source`, `metadata`, `chunk`, `policy` and `progress` describe one upload
//! session. `video` and `event` mirror what the API returns.

pub mod chunk;
pub mod event;
pub mod metadata;
pub mod policy;
pub mod progress;
pub mod source;
pub mod video;
