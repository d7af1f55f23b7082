//! Error types for the fallible edges of the layout engine.
//!
//! Layout itself never fails. Only loading configuration and talking to a
//! saved-layout store can.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while loading a [`LayoutConfig`](crate::config::LayoutConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid layout config in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by a [`LayoutStore`](crate::persist::LayoutStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid saved layout: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid store key {0:?}")]
    InvalidKey(String),
}
