use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::numbered_filename;

/// Upper bound on `name-N` variants tried before giving up.
const MAX_NAME_VARIANTS: usize = 10_000;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory {path} is unusable: {reason}")]
    Dir { path: PathBuf, reason: String },
    #[error("no free file name left for {0}")]
    NamesExhausted(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` if needed and checks that files can be created in it.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::Dir {
        path: dir.to_path_buf(),
        reason,
    };
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(unusable("not a directory".into())),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|err| unusable(err.to_string()))?;
        }
        Err(err) => return Err(unusable(err.to_string())),
    }
    NamedTempFile::new_in(dir).map_err(|err| unusable(err.to_string()))?;
    Ok(())
}

/// Writes whole files into one directory through a staged temp file, so a
/// reader sees either nothing, the previous content or the complete new
/// content.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `{dir}/{filename}`, replacing any existing file of that name.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let staged = self.stage(content)?;
        let target = self.dir.join(filename);
        staged.persist(&target).map_err(|err| err.error)?;
        Ok(target)
    }

    /// Writes `content` under `filename`, or under the first free
    /// `stem-2.ext`, `stem-3.ext`, ... when the name is taken. Existing files
    /// are never replaced.
    pub fn write_new(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut staged = self.stage(content)?;
        for variant in 1..=MAX_NAME_VARIANTS {
            let target = self.dir.join(numbered_filename(filename, variant));
            match staged.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => staged = err.file,
                Err(err) => return Err(err.error.into()),
            }
        }
        Err(PersistError::NamesExhausted(filename.to_string()))
    }

    fn stage(&self, content: &[u8]) -> Result<NamedTempFile, PersistError> {
        ensure_dir(&self.dir)?;
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(content)?;
        staged.flush()?;
        staged.as_file_mut().sync_all()?;
        Ok(staged)
    }
}
