use std::path::PathBuf;

use thiserror::Error;

/// The document never produced a page count.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("document {reference:?} could not be found")]
    NotFound { reference: String },
    #[error("document {reference:?} could not be opened: {message}")]
    Unreadable { reference: String, message: String },
}

/// A single page could not be rendered. Siblings are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageFault {
    #[error("page {page} is outside the document")]
    OutOfRange { page: usize },
    #[error("page {page} failed to render: {message}")]
    Render { page: usize, message: String },
}

impl PageFault {
    pub fn page(&self) -> usize {
        match self {
            PageFault::OutOfRange { page } | PageFault::Render { page, .. } => *page,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
