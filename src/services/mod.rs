//! Network-facing services.
//!
//! `upload_service` drives a chunked upload through a `transport`;
//! `api_client` covers the remaining endpoints and `events` decodes the
//! server-sent status feed.

pub mod api_client;
pub mod events;
pub mod transport;
pub mod upload_service;
