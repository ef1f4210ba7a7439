//! Persist the best score (XDG config or ~/.config/neontris/record).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "neontris";
const FILENAME: &str = "record";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("record file {path} is corrupt: {content:?}")]
    Corrupt { path: PathBuf, content: String },
}

/// Storage for the single best-score value.
pub trait RecordStore {
    /// Current record; 0 (and storage initialised) when nothing was stored yet.
    fn read_record(&mut self) -> Result<u32, RecordError>;
    fn write_record(&mut self, record: u32) -> Result<(), RecordError>;
}

/// Per-user config directory for this game.
pub fn config_dir() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join(APP_DIR)
}

/// Record kept as a decimal integer in a text file.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/neontris/record`.
    pub fn default_location() -> Self {
        Self::new(config_dir().join(FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> RecordError {
        RecordError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for FileRecordStore {
    fn read_record(&mut self) -> Result<u32, RecordError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("no record at {}, starting from 0", self.path.display());
                self.write_record(0)?;
                return Ok(0);
            }
            Err(e) => return Err(self.io_err(e)),
        };
        content
            .lines()
            .next()
            .map(str::trim)
            .and_then(|l| l.parse::<u32>().ok())
            .ok_or_else(|| RecordError::Corrupt {
                path: self.path.clone(),
                content: content.clone(),
            })
    }

    fn write_record(&mut self, record: u32) -> Result<(), RecordError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }
        fs::write(&self.path, record.to_string()).map_err(|e| self.io_err(e))?;
        log::debug!("record {} written to {}", record, self.path.display());
        Ok(())
    }
}

/// Record held in memory only; `writes` counts every write for inspection.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    pub value: Option<u32>,
    pub writes: u32,
}

#[cfg(test)]
impl RecordStore for MemoryRecordStore {
    fn read_record(&mut self) -> Result<u32, RecordError> {
        Ok(*self.value.get_or_insert(0))
    }

    fn write_record(&mut self, record: u32) -> Result<(), RecordError> {
        self.value = Some(record);
        self.writes += 1;
        Ok(())
    }
}
