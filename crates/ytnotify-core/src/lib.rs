//! # ytnotify core
//!
//! Shared domain types, collaborator traits, the error enum and the
//! configuration tree used by every other ytnotify crate.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{MessagingError, RecorderError, Result, YtNotifyError};
