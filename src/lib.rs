//! Client for a video-hosting API: chunked uploads plus typed access to the
//! listing, management, configuration and status-event endpoints.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
