use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::store::SessionMarker;

/// Errors that can occur when reading the persisted session record.
#[derive(Debug)]
pub enum PersistError {
    /// Failed to read the record from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the record as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Read { path, source } => {
                write!(f, "Failed to read session record at {}: {}", path.display(), source)
            }
            PersistError::Parse { path, source } => {
                write!(f, "Failed to parse session record at {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for PersistError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PersistError::Read { source, .. } => Some(source),
            PersistError::Parse { source, .. } => Some(source),
        }
    }
}

/// On-disk shape of the persisted record. Everything except the last
/// session marker is discarded at teardown; this one field survives to seed
/// the next reconciler run.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    last_session: Option<SessionMarker>,
}

/// The serialized session record on disk.
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "colloquy")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("session.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last persisted marker, if any. A missing file is not an
    /// error; it just means no prior session survives.
    pub fn load(&self) -> Result<Option<SessionMarker>, PersistError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| PersistError::Read {
            path: self.path.clone(),
            source,
        })?;
        let state: PersistedState =
            toml::from_str(&contents).map_err(|source| PersistError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(state.last_session)
    }

    /// Atomically replace the record with the given marker.
    pub fn save(&self, marker: &SessionMarker) -> Result<(), Box<dyn StdError>> {
        let parent = self.path.parent().filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let state = PersistedState {
            last_session: Some(marker.clone()),
        };
        let contents = toml::to_string_pretty(&state)?;

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file
            .persist(&self.path)
            .map_err(|err| -> Box<dyn StdError> { Box::new(err) })?;
        Ok(())
    }
}
