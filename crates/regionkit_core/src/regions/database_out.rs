//! Sink region that records scalar input streams into a SQLite file.
//!
//! # Responsibility
//! - Declare `dataIn0..dataIn9` and the `outputFile` / `tablePrefix`
//!   parameters.
//! - Own one SQLite connection and append one row per active input per
//!   compute into `<tablePrefix>_<input>`.
//!
//! # Invariants
//! - The store file is recreated from scratch on every open; it never holds
//!   rows from a previous store.
//! - Tables exist only for inputs that were connected with non-zero width.
//! - After `k` computes against one store, each table holds iterations
//!   `0..k-1`. One compute's rows commit together or not at all.
//! - The connection is released on `closeFile`, on a path change, on
//!   re-initialization and on drop.

use super::{resolve_param, unknown_parameter};
use crate::persist::codec::{read_str, read_version, write_str, write_version};
use crate::persist::{PersistError, PersistResult, Serializable};
use crate::port::PortSet;
use crate::region::{RegionError, RegionImpl, RegionResult, RegionType};
use crate::spec::{AccessMode, CommandSpec, InputSpec, ParameterSpec, Spec};
use crate::store::{
    close_store, create_store, create_stream_table, insert_stream_row, stream_table_name,
    StoreError, StreamRow,
};
use crate::types::{BasicType, Value, ValueMap};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::any::Any;
use std::collections::BTreeSet;
use std::io::{Read, Write};

/// Number of `dataIn<N>` inputs declared.
pub const MAX_NUMBER_OF_INPUTS: usize = 10;
pub const PARAM_OUTPUT_FILE: &str = "outputFile";
pub const PARAM_TABLE_PREFIX: &str = "tablePrefix";
pub const COMMAND_CLOSE_FILE: &str = "closeFile";
pub const DEFAULT_TABLE_PREFIX: &str = "dataStream";

const TYPE_NAME: &str = "DatabaseOutRegion";
const FORMAT_VERSION: i32 = 2;
const OLDEST_FORMAT_VERSION: i32 = 1;

static SPEC: Lazy<Spec> = Lazy::new(build_spec);

fn build_spec() -> Spec {
    let mut spec = Spec::new(
        "Writes up to ten scalar streams to a SQLite database file. Each connected \
         input gets its own table and one row per compute.",
    );
    for index in 0..MAX_NUMBER_OF_INPUTS {
        spec.inputs.push(
            InputSpec::new(
                &format!("dataIn{index}"),
                "Scalar stream to record.",
                BasicType::Real32,
            )
            .default_input(),
        );
    }
    spec.parameters.push(ParameterSpec::new(
        PARAM_OUTPUT_FILE,
        "Database file written on each compute. The file is recreated when the \
         region is initialized or the path changes.",
        BasicType::Byte,
        AccessMode::ReadWrite,
    ));
    spec.parameters.push(
        ParameterSpec::new(
            PARAM_TABLE_PREFIX,
            "Table name prefix; tables are named `<prefix>_<input>`.",
            BasicType::Byte,
            AccessMode::CreateOnly,
        )
        .constraints("identifier")
        .default_value(DEFAULT_TABLE_PREFIX),
    );
    spec.commands.push(CommandSpec::new(
        COMMAND_CLOSE_FILE,
        "Close the current database file, if open.",
    ));
    spec
}

/// SQLite sink for scalar streams.
#[derive(Debug)]
pub struct DatabaseOutRegion {
    output_file: String,
    table_prefix: String,
    store: Option<Connection>,
    /// Inputs that have a table in the current store.
    streams: BTreeSet<String>,
    next_iteration: i64,
    initialized: bool,
}

impl DatabaseOutRegion {
    pub fn new(output_file: &str, table_prefix: &str) -> RegionResult<Self> {
        validate_prefix(table_prefix)?;
        Ok(Self {
            output_file: output_file.to_string(),
            table_prefix: table_prefix.to_string(),
            store: None,
            streams: BTreeSet::new(),
            next_iteration: 0,
            initialized: false,
        })
    }

    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    pub fn is_store_open(&self) -> bool {
        self.store.is_some()
    }

    /// Iteration number the next compute will write.
    pub fn next_iteration(&self) -> i64 {
        self.next_iteration
    }

    /// Table name used for `input` in the current store.
    pub fn table_name(&self, input: &str) -> RegionResult<String> {
        Ok(stream_table_name(&self.table_prefix, input)?)
    }

    /// Opens a fresh store at `output_file` and creates the known tables.
    fn open_store(&mut self) -> RegionResult<()> {
        self.release_store()?;
        let conn = match create_store(&self.output_file) {
            Ok(conn) => conn,
            Err(err) => {
                self.output_file.clear();
                return Err(err.into());
            }
        };
        for input in &self.streams {
            create_stream_table(&conn, &stream_table_name(&self.table_prefix, input)?)?;
        }
        self.store = Some(conn);
        self.next_iteration = 0;
        Ok(())
    }

    fn release_store(&mut self) -> RegionResult<()> {
        match self.store.take() {
            Some(conn) => Ok(close_store(conn)?),
            None => Ok(()),
        }
    }

    fn redirect(&mut self, path: String) -> RegionResult<()> {
        info!(
            "event=database_out_redirect module=regions status=start path={}",
            path
        );
        self.release_store()?;
        self.output_file = path;
        self.next_iteration = 0;
        if self.initialized && !self.output_file.is_empty() {
            self.open_store()?;
        }
        Ok(())
    }
}

impl Serializable for DatabaseOutRegion {
    fn serializable_version(&self) -> i32 {
        FORMAT_VERSION
    }

    fn save(&self, writer: &mut dyn Write) -> PersistResult<()> {
        write_version(writer, FORMAT_VERSION)?;
        write_str(writer, &self.output_file)?;
        write_str(writer, &self.table_prefix)?;
        Ok(())
    }

    fn load(&mut self, reader: &mut dyn Read) -> PersistResult<()> {
        let version = read_version(reader, OLDEST_FORMAT_VERSION..=FORMAT_VERSION)?;
        let output_file = read_str(reader)?;
        let table_prefix = match version {
            1 => DEFAULT_TABLE_PREFIX.to_string(),
            _ => read_str(reader)?,
        };
        validate_prefix(&table_prefix).map_err(|err| PersistError::Corrupt(err.to_string()))?;

        if let Some(conn) = self.store.take() {
            if let Err(err) = close_store(conn) {
                warn!(
                    "event=database_out_load module=regions status=error path={} error={}",
                    self.output_file, err
                );
            }
        }
        self.output_file = output_file;
        self.table_prefix = table_prefix;
        self.streams.clear();
        self.next_iteration = 0;
        self.initialized = false;
        Ok(())
    }
}

impl RegionImpl for DatabaseOutRegion {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn spec(&self) -> &'static Spec {
        Self::create_spec()
    }

    fn initialize(&mut self, ports: &PortSet) -> RegionResult<()> {
        self.release_store()?;
        self.initialized = false;
        self.streams.clear();

        if self.output_file.is_empty() {
            return Err(RegionError::Configuration(format!(
                "{TYPE_NAME}: `{PARAM_OUTPUT_FILE}` must be set before initialize"
            )));
        }
        for (name, input) in ports.active_inputs() {
            check_scalar(name, input.element_count())?;
            self.streams.insert(name.to_string());
        }

        self.open_store()?;
        self.initialized = true;
        info!(
            "event=database_out_initialize module=regions status=ok path={} tables={}",
            self.output_file,
            self.streams.len()
        );
        Ok(())
    }

    fn release(&mut self) -> RegionResult<()> {
        self.initialized = false;
        self.streams.clear();
        self.release_store()
    }

    fn compute(&mut self, ports: &mut PortSet) -> RegionResult<()> {
        let mut samples = Vec::new();
        for (name, input) in ports.active_inputs() {
            check_scalar(name, input.element_count())?;
            let value = input.with_data(|data| data.get_f64(0))?.ok_or_else(|| {
                RegionError::Configuration(format!("{TYPE_NAME}: input `{name}` has no sample"))
            })?;
            samples.push((name.to_string(), value));
        }
        if samples.is_empty() {
            self.next_iteration += 1;
            return Ok(());
        }

        let conn = self.store.as_mut().ok_or_else(|| {
            RegionError::Configuration(format!("{TYPE_NAME}: no database file is open"))
        })?;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let mut created = Vec::new();
        for (name, value) in &samples {
            let table = stream_table_name(&self.table_prefix, name)?;
            if !self.streams.contains(name) {
                create_stream_table(&tx, &table)?;
                created.push(name.clone());
            }
            insert_stream_row(
                &tx,
                &table,
                StreamRow {
                    iteration: self.next_iteration,
                    value: *value,
                },
            )?;
        }
        tx.commit().map_err(StoreError::from)?;
        self.streams.extend(created);

        debug!(
            "event=database_out_write module=regions status=ok iteration={} rows={}",
            self.next_iteration,
            samples.len()
        );
        self.next_iteration += 1;
        Ok(())
    }

    fn get_parameter(&self, name: &str, _index: usize) -> RegionResult<Value> {
        match name {
            PARAM_OUTPUT_FILE => Ok(Value::Str(self.output_file.clone())),
            PARAM_TABLE_PREFIX => Ok(Value::Str(self.table_prefix.clone())),
            _ => Err(unknown_parameter(TYPE_NAME, name)),
        }
    }

    fn set_parameter(&mut self, name: &str, _index: usize, value: Value) -> RegionResult<()> {
        match (name, value) {
            (PARAM_OUTPUT_FILE, Value::Str(path)) => {
                if path == self.output_file {
                    return Ok(());
                }
                self.redirect(path)
            }
            (PARAM_OUTPUT_FILE, other) => Err(RegionError::ParameterType {
                name: name.to_string(),
                expected: BasicType::Byte,
                found: other.basic_type(),
            }),
            _ => Err(unknown_parameter(TYPE_NAME, name)),
        }
    }

    fn execute_command(&mut self, args: &[String]) -> RegionResult<Option<String>> {
        match args.first().map(String::as_str) {
            Some(COMMAND_CLOSE_FILE) => {
                self.release_store()?;
                self.output_file.clear();
                Ok(None)
            }
            Some(other) => Err(RegionError::UnknownCommand {
                region: TYPE_NAME.to_string(),
                command: other.to_string(),
            }),
            None => Err(RegionError::Configuration(format!(
                "{TYPE_NAME}: empty command"
            ))),
        }
    }

    fn equals(&self, other: &dyn RegionImpl) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| {
                self.output_file == other.output_file && self.table_prefix == other.table_prefix
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegionType for DatabaseOutRegion {
    const TYPE_NAME: &'static str = TYPE_NAME;

    fn create_spec() -> &'static Spec {
        &SPEC
    }

    fn from_params(params: &ValueMap) -> RegionResult<Self> {
        let spec = Self::create_spec();
        let output_file: String = resolve_param(spec, params, PARAM_OUTPUT_FILE)?;
        let table_prefix: String = resolve_param(spec, params, PARAM_TABLE_PREFIX)?;
        Self::new(&output_file, &table_prefix)
    }

    fn from_persisted(reader: &mut dyn Read) -> RegionResult<Self> {
        let mut region = Self::new("", DEFAULT_TABLE_PREFIX)?;
        region.load(reader)?;
        Ok(region)
    }
}

impl Drop for DatabaseOutRegion {
    fn drop(&mut self) {
        if let Some(conn) = self.store.take() {
            if let Err(err) = close_store(conn) {
                warn!(
                    "event=database_out_drop module=regions status=error path={} error={}",
                    self.output_file, err
                );
            }
        }
    }
}

fn validate_prefix(prefix: &str) -> RegionResult<()> {
    match stream_table_name(prefix, "dataIn0") {
        Ok(_) if !prefix.is_empty() => Ok(()),
        Ok(_) | Err(StoreError::InvalidTableName(_)) => Err(RegionError::Configuration(format!(
            "{TYPE_NAME}: `{PARAM_TABLE_PREFIX}` must be an SQL identifier, got `{prefix}`"
        ))),
        Err(err) => Err(err.into()),
    }
}

fn check_scalar(input: &str, width: usize) -> RegionResult<()> {
    if width != 1 {
        return Err(RegionError::Configuration(format!(
            "{TYPE_NAME}: input `{input}` carries {width} elements; only scalar streams are recorded"
        )));
    }
    Ok(())
}
