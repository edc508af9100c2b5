//! Versioned persistence contract for stateful components.
//!
//! # Responsibility
//! - Define the `save`/`load` contract every stateful component implements.
//! - Provide file-scoped wrappers with directory creation and an exclusive
//!   file lock held for the duration of the call.
//!
//! # Invariants
//! - Payload layout is `[int32 version][versioned body]`.
//! - Readers accept the current and the immediately prior version; any other
//!   tag fails with `IncompatibleVersion` before the body is touched.
//! - The file lock is released on every exit path, including encode/decode
//!   failure.

pub mod codec;

use fs2::FileExt;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub type PersistResult<T> = Result<T, PersistError>;

/// Stream-scoped persistence contract.
pub trait Serializable {
    /// Format version written by `save`.
    fn serializable_version(&self) -> i32;

    /// Writes the version tag followed by the full reconstructable state.
    fn save(&self, writer: &mut dyn Write) -> PersistResult<()>;

    /// Reads the version tag, then the body for that version.
    fn load(&mut self, reader: &mut dyn Read) -> PersistResult<()>;
}

/// Saves `value` to `path`, creating parent directories first.
pub fn save_to_file<T: Serializable + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
) -> PersistResult<()> {
    write_file(path, |writer| value.save(writer))
}

/// Loads `value` from `path`.
pub fn load_from_file<T: Serializable + ?Sized>(
    value: &mut T,
    path: impl AsRef<Path>,
) -> PersistResult<()> {
    read_file(path, |reader| value.load(reader))
}

/// Runs `encode` against `path` truncated and exclusively locked.
pub fn write_file<T, E>(
    path: impl AsRef<Path>,
    encode: impl FnOnce(&mut dyn Write) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<PersistError>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(PersistError::from)?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(PersistError::from)?;
    let guard = LockedFile::acquire(file, path)?;
    guard.file.set_len(0).map_err(PersistError::from)?;

    let mut writer = BufWriter::new(&guard.file);
    let value = encode(&mut writer)?;
    writer.flush().map_err(PersistError::from)?;
    drop(writer);
    guard.file.sync_all().map_err(PersistError::from)?;

    debug!(
        "event=persist_write module=persist status=ok path={}",
        path.display()
    );
    Ok(value)
}

/// Runs `decode` against `path` exclusively locked.
pub fn read_file<T, E>(
    path: impl AsRef<Path>,
    decode: impl FnOnce(&mut dyn Read) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<PersistError>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(PersistError::from)?;
    let guard = LockedFile::acquire(file, path)?;

    let mut reader = BufReader::new(&guard.file);
    let value = decode(&mut reader)?;

    debug!(
        "event=persist_read module=persist status=ok path={}",
        path.display()
    );
    Ok(value)
}

/// Exclusively locked file; unlocks on drop.
struct LockedFile {
    file: File,
}

impl LockedFile {
    fn acquire(file: File, path: &Path) -> PersistResult<Self> {
        FileExt::lock_exclusive(&file).map_err(|err| {
            warn!(
                "event=persist_lock module=persist status=error path={} error={}",
                path.display(),
                err
            );
            PersistError::Io(err)
        })?;
        Ok(Self { file })
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(
                "event=persist_unlock module=persist status=error error={}",
                err
            );
        }
    }
}

/// Persistence errors.
#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    IncompatibleVersion {
        found: i32,
        oldest_supported: i32,
        newest_supported: i32,
    },
    Corrupt(String),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::IncompatibleVersion {
                found,
                oldest_supported,
                newest_supported,
            } => write!(
                f,
                "persisted format version {found} is not supported (supported {oldest_supported}..={newest_supported})"
            ),
            Self::Corrupt(message) => write!(f, "persisted payload is corrupt: {message}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::IncompatibleVersion { .. } | Self::Corrupt(_) => None,
        }
    }
}

impl From<std::io::Error> for PersistError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
