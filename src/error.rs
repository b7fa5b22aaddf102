use std::io;
use thiserror::Error;

/// Errors that abort a publish run
#[derive(Error, Debug)]
pub enum PublishError {
    /// Credentials were not present in the environment
    #[error(
        "Both 'AWS_ACCESS_KEY_ID' and 'AWS_SECRET_ACCESS_KEY' must be provided as environment variables"
    )]
    MissingCredentials,

    /// The walk could not access an entry
    #[error("could not walk {path}: {source}")]
    WalkAccess {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A discovered file could not be opened
    #[error("could not open {path} for reading: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The uploader rejected the object
    #[error("failed to upload {path}: {source}")]
    Upload {
        path: String,
        #[source]
        source: UploadError,
    },
}

impl PublishError {
    /// Path of the entry that caused the failure, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::MissingCredentials => None,
            Self::WalkAccess { path, .. } | Self::Open { path, .. } | Self::Upload { path, .. } => {
                Some(path)
            }
        }
    }
}

/// Errors reported by an uploader
#[derive(Error, Debug)]
pub enum UploadError {
    /// The object body could not be read
    #[error("failed to read upload body: {0}")]
    Body(#[from] io::Error),

    /// The store refused or failed the write
    #[error("failed to upload to S3: {0}")]
    Store(String),
}

impl UploadError {
    /// Wrap any displayable storage failure
    pub fn store<E: std::fmt::Display>(error: E) -> Self {
        Self::Store(error.to_string())
    }
}

/// Result type for publish operations
pub type Result<T> = std::result::Result<T, PublishError>;
