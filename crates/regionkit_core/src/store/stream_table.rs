//! Per-stream tables: `<prefix>_<port>` with one row per iteration.

use super::{StoreError, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// One stored stream sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamRow {
    pub iteration: i64,
    pub value: f64,
}

/// Builds the table name for one stream, rejecting non-identifiers.
pub fn stream_table_name(prefix: &str, port: &str) -> StoreResult<String> {
    let name = format!("{prefix}_{port}");
    if !IDENTIFIER_RE.is_match(&name) {
        return Err(StoreError::InvalidTableName(name));
    }
    Ok(name)
}

pub fn create_stream_table(conn: &Connection, table: &str) -> StoreResult<()> {
    ensure_identifier(table)?;
    conn.execute_batch(&format!(
        "CREATE TABLE {table} (iteration INTEGER PRIMARY KEY, value);"
    ))?;
    Ok(())
}

pub fn insert_stream_row(conn: &Connection, table: &str, row: StreamRow) -> StoreResult<()> {
    ensure_identifier(table)?;
    conn.execute(
        &format!("INSERT INTO {table} (iteration, value) VALUES (?1, ?2);"),
        params![row.iteration, row.value],
    )?;
    Ok(())
}

/// Reads all rows of one stream ordered by iteration.
pub fn read_stream_rows(conn: &Connection, table: &str) -> StoreResult<Vec<StreamRow>> {
    ensure_identifier(table)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT iteration, value FROM {table} ORDER BY iteration ASC;"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StreamRow {
                iteration: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Lists stream tables whose name starts with `<prefix>_`, sorted by name.
pub fn list_stream_tables(conn: &Connection, prefix: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND substr(name, 1, length(?1) + 1) = ?1 || '_'
         ORDER BY name ASC;",
    )?;
    let names = stmt
        .query_map([prefix], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn ensure_identifier(table: &str) -> StoreResult<()> {
    if IDENTIFIER_RE.is_match(table) {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(table.to_string()))
    }
}
