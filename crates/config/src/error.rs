//! Error types for settings and keymap loading.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, Clone)]
/// Errors produced while loading or parsing configuration files.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// Settings or keymap file did not parse.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("layout '{layout}' not present in keymap file")]
    /// The keymap file parsed but does not contain the requested layout.
    UnknownLayout {
        /// Path of the keymap file.
        path: PathBuf,
        /// The layout name that was requested.
        layout: String,
    },
}

impl Error {
    /// Render a human-friendly error message including the path when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse { path, message } => match path {
                Some(p) => format!("Parse error at {}: {}", p.display(), message),
                None => format!("Parse error: {}", message),
            },
            Self::UnknownLayout { path, layout } => format!(
                "Keymap at {} has no layout named '{}'",
                path.display(),
                layout
            ),
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path.as_deref(),
            Self::UnknownLayout { path, .. } => Some(path),
        }
    }
}
