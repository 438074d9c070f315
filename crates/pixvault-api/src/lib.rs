//! Pixvault HTTP API
//!
//! `axum` adapter over the upload pipeline: multipart extraction, owner identity,
//! error rendering and server setup.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;
