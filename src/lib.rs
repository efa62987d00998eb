//! Code Quest: developer-question search across Stack Overflow and Reddit.
//!
//! This crate is the application around [`codequest_search`]:
//!
//! - **Config**: TOML file plus environment overrides (`.env` supported)
//! - **Server**: `axum` front-end exposing `/search` and `/send_email`
//! - **Digest**: validation and HTML rendering of emailed result digests
//! - **Mail**: pluggable delivery, with a pickup-directory transport
//! - **Logging**: `tracing` to stderr and an optional log file

pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod mail;
pub mod server;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use server::{AppState, router};
