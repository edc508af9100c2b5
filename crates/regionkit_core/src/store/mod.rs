//! SQLite store used by store-writing regions.
//!
//! # Responsibility
//! - Create a fresh SQLite store file, replacing whatever was at the path.
//! - Create per-stream tables and append `(iteration, value)` rows.
//!
//! # Invariants
//! - A store is always created from scratch; existing files are deleted first.
//! - Stream table names are validated SQL identifiers before any SQL runs.
//! - Stream table schema is `(iteration INTEGER PRIMARY KEY, value)`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod open;
mod stream_table;

pub use open::{close_store, create_store, open_existing_store};
pub use stream_table::{
    create_stream_table, insert_stream_row, list_stream_tables, read_stream_rows,
    stream_table_name, StreamRow,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    RemoveExisting {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidTableName(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::RemoveExisting { path, source } => write!(
                f,
                "cannot delete existing store file `{}`: {source}",
                path.display()
            ),
            Self::InvalidTableName(name) => {
                write!(f, "`{name}` is not a valid stream table name")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::RemoveExisting { source, .. } => Some(source),
            Self::InvalidTableName(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
