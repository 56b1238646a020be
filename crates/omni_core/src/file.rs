use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One captured input file. Immutable after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    data: Bytes,
    name: String,
    size: u64,
    media_type: String,
    last_modified: DateTime<Utc>,
}

impl FileEntry {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        last_modified: DateTime<Utc>,
        data: Bytes,
    ) -> Self {
        Self {
            size: data.len() as u64,
            data,
            name: name.into(),
            media_type: media_type.into(),
            last_modified,
        }
    }

    /// Opaque content handle; cloning it is cheap.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

/// Result of converting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// Where the output can be downloaded from (path or URI).
    pub reference: String,
    pub filename: String,
}
