use std::fmt;

use thiserror::Error;

use omni_core::{ConversionRequest, FileEntry, OutputArtifact, ProgressState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    UnsupportedInput { media_type: String },
    Processing,
    Output,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::UnsupportedInput { media_type } => {
                write!(f, "unsupported input type {media_type}")
            }
            FailureKind::Processing => write!(f, "processing error"),
            FailureKind::Output => write!(f, "output error"),
        }
    }
}

/// Rejection from a unit converter. Opaque to the workflow beyond its text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ConvertError {
    pub kind: FailureKind,
    pub message: String,
}

impl ConvertError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Receives per-file progress while a conversion runs.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: ProgressState);
}

/// Performs the actual transcoding or transcription of one file.
///
/// Implementations report non-decreasing progress that ends at 100 before
/// resolving, or reject with a [`ConvertError`].
#[async_trait::async_trait]
pub trait UnitConverter: Send + Sync {
    async fn convert(
        &self,
        file: &FileEntry,
        request: &ConversionRequest,
        sink: &dyn ProgressSink,
    ) -> Result<OutputArtifact, ConvertError>;
}
