//! Whole-collection durable storage.
//!
//! The store never writes individual records: every save replaces the full
//! collection, and every load returns it in insertion order. A missing copy
//! loads as `Ok(None)`; an unparsable one is [`PersistError::Parse`].

use crate::error::ErrorCode;
use crate::lock::{LockError, StoreLock};
use crate::model::incident::Incident;
use crate::recovery;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_FILE_NAME: &str = "incidents.json";
pub const LOCK_FILE_NAME: &str = "incidents.lock";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("wrote {} but could not sync its directory: {source}", .path.display())]
    Unsynced { path: PathBuf, source: io::Error },

    #[error("failed to serialize incidents: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to move {} aside: {source}", .path.display())]
    Quarantine { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("durable storage unavailable: {0}")]
    Unavailable(String),
}

impl PersistError {
    /// Machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::StoreReadFailed,
            Self::Parse { .. } => ErrorCode::CorruptStore,
            Self::Write { .. }
            | Self::Unsynced { .. }
            | Self::Serialize(_)
            | Self::Quarantine { .. }
            | Self::Unavailable(_) => ErrorCode::StoreWriteFailed,
            Self::Lock(err) => err.code(),
        }
    }

    /// True when the durable copy exists but cannot be decoded.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// True when the new copy already replaced the old one before the
    /// failure, so the caller must treat the save as applied.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Unsynced { .. })
    }
}

/// Reads and writes the entire incident collection as one unit.
pub trait Persistence {
    /// Load the durable copy. `Ok(None)` means no copy exists yet.
    ///
    /// # Errors
    ///
    /// [`PersistError::Parse`] for a present but undecodable copy,
    /// [`PersistError::Read`] for any other read failure.
    fn load(&self) -> Result<Option<Vec<Incident>>, PersistError>;

    /// Replace the durable copy with `incidents`.
    ///
    /// A failed save must leave the previous copy readable, unless the error
    /// reports [`PersistError::is_committed`], in which case the new copy is
    /// the readable one.
    ///
    /// # Errors
    ///
    /// Any failure to serialize or durably store the collection.
    fn save(&self, incidents: &[Incident]) -> Result<(), PersistError>;

    /// Move the current durable copy aside. Returns where it went, or `None`
    /// when there was nothing to move.
    ///
    /// # Errors
    ///
    /// [`PersistError::Quarantine`] when the copy exists but cannot be moved.
    fn quarantine(&self) -> Result<Option<PathBuf>, PersistError>;
}

/// JSON file backend: one pretty-printed array per data directory.
///
/// Holds the directory's [`StoreLock`] for as long as it lives.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    _lock: StoreLock,
}

impl JsonFileStore {
    /// Open (without reading) the store file `file_name` under `data_dir`.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or the lock is held
    /// elsewhere past `lock_timeout`.
    pub fn open(
        data_dir: &Path,
        file_name: &str,
        lock_timeout: Duration,
    ) -> Result<Self, PersistError> {
        fs::create_dir_all(data_dir).map_err(|source| PersistError::Write {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let lock = StoreLock::acquire(&data_dir.join(LOCK_FILE_NAME), lock_timeout)?;

        Ok(Self {
            path: data_dir.join(file_name),
            _lock: lock,
        })
    }

    /// Path of the durable JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_synced(path: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(body)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

impl Persistence for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Incident>>, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, incidents: &[Incident]) -> Result<(), PersistError> {
        let mut body = serde_json::to_vec_pretty(incidents).map_err(PersistError::Serialize)?;
        body.push(b'\n');

        let tmp = self.tmp_path();
        if let Err(source) =
            write_synced(&tmp, &body).and_then(|()| fs::rename(&tmp, &self.path))
        {
            let _ = fs::remove_file(&tmp);
            return Err(PersistError::Write {
                path: self.path.clone(),
                source,
            });
        }

        // The rename is the commit point; past it the new copy is live.
        if let Some(dir) = self.path.parent() {
            sync_dir(dir).map_err(|source| PersistError::Unsynced {
                path: self.path.clone(),
                source,
            })?;
        }

        tracing::debug!(path = %self.path.display(), count = incidents.len(), "incidents saved");
        Ok(())
    }

    fn quarantine(&self) -> Result<Option<PathBuf>, PersistError> {
        recovery::quarantine_file(&self.path).map_err(|source| PersistError::Quarantine {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    durable: Option<Vec<u8>>,
    quarantined: Vec<Vec<u8>>,
    fail_saves: bool,
    fail_syncs: bool,
    fail_loads: bool,
    saves: usize,
}

/// In-process backend sharing its "durable" bytes across clones.
///
/// Saves go through the same JSON encoding as [`JsonFileStore`], so decode
/// failures and round-trips behave the same. Failure switches let tests
/// exercise rollback paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPersistence {
    const LABEL: &'static str = "<memory>";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `incidents` already durable.
    ///
    /// # Errors
    ///
    /// Fails only if the incidents cannot be serialized.
    pub fn with_incidents(incidents: &[Incident]) -> Result<Self, PersistError> {
        let backend = Self::new();
        backend.state.lock().durable =
            Some(serde_json::to_vec_pretty(incidents).map_err(PersistError::Serialize)?);
        Ok(backend)
    }

    /// Make every following save fail (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.state.lock().fail_saves = fail;
    }

    /// Make every following save replace the copy and then report a failed
    /// sync, like a directory fsync error after the rename.
    pub fn fail_syncs(&self, fail: bool) {
        self.state.lock().fail_syncs = fail;
    }

    /// Make every following load fail with a read error.
    pub fn fail_loads(&self, fail: bool) {
        self.state.lock().fail_loads = fail;
    }

    /// Overwrite the durable copy with bytes that do not decode.
    pub fn corrupt(&self) {
        self.state.lock().durable = Some(b"{ not json ]".to_vec());
    }

    /// Decode the current durable copy, if any.
    ///
    /// # Errors
    ///
    /// [`PersistError::Parse`] when the copy has been corrupted.
    pub fn snapshot(&self) -> Result<Option<Vec<Incident>>, PersistError> {
        self.load_unchecked()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state.lock().saves
    }

    /// Raw bytes of every copy moved aside, oldest first.
    #[must_use]
    pub fn quarantined(&self) -> Vec<Vec<u8>> {
        self.state.lock().quarantined.clone()
    }

    fn load_unchecked(&self) -> Result<Option<Vec<Incident>>, PersistError> {
        let state = self.state.lock();
        let Some(bytes) = state.durable.as_deref() else {
            return Ok(None);
        };
        serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|source| PersistError::Parse {
                path: PathBuf::from(Self::LABEL),
                source,
            })
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Option<Vec<Incident>>, PersistError> {
        if self.state.lock().fail_loads {
            return Err(PersistError::Read {
                path: PathBuf::from(Self::LABEL),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "injected read failure"),
            });
        }
        self.load_unchecked()
    }

    fn save(&self, incidents: &[Incident]) -> Result<(), PersistError> {
        let body = serde_json::to_vec_pretty(incidents).map_err(PersistError::Serialize)?;
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err(PersistError::Unavailable("injected save failure".to_string()));
        }
        state.durable = Some(body);
        state.saves += 1;
        if state.fail_syncs {
            return Err(PersistError::Unsynced {
                path: PathBuf::from(Self::LABEL),
                source: io::Error::other("injected sync failure"),
            });
        }
        Ok(())
    }

    fn quarantine(&self) -> Result<Option<PathBuf>, PersistError> {
        let mut state = self.state.lock();
        let Some(bytes) = state.durable.take() else {
            return Ok(None);
        };
        state.quarantined.push(bytes);
        Ok(Some(PathBuf::from(format!(
            "{}.corrupt-{}",
            Self::LABEL,
            state.quarantined.len()
        ))))
    }
}
