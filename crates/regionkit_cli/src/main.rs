//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `regionkit_core` linkage and print the registered region Specs.
//! - `demo <db-path> [iterations]` wires a source into a database sink and
//!   prints the rows it recorded.

use regionkit_core::regions::{OUTPUT_DATA, PARAM_INCREMENT, PARAM_OUTPUT_FILE};
use regionkit_core::store::{open_existing_store, read_stream_rows};
use regionkit_core::{RegionRegistry, ValueMap};
use std::error::Error;
use std::process::ExitCode;

const DEFAULT_ITERATIONS: u32 = 3;

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("REGIONKIT_LOG_DIR") {
        if let Err(err) = regionkit_core::init_logging(regionkit_core::default_log_level(), log_dir)
        {
            eprintln!("logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("specs") => print_specs(),
        Some("demo") => run_demo(&args[1..]),
        Some(other) => Err(format!("unknown command `{other}`; expected specs|demo").into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_exit module=cli status=error error={}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_specs() -> Result<(), Box<dyn Error>> {
    let registry = RegionRegistry::with_builtin_regions()?;
    println!("regionkit_core version={}", regionkit_core::core_version());

    let mut specs = serde_json::Map::new();
    for type_name in registry.type_names() {
        if let Some(spec) = registry.spec(type_name) {
            specs.insert(type_name.to_string(), serde_json::to_value(spec)?);
        }
    }
    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(())
}

fn run_demo(args: &[String]) -> Result<(), Box<dyn Error>> {
    let db_path = args
        .first()
        .ok_or("usage: regionkit_cli demo <db-path> [iterations]")?;
    let iterations = match args.get(1) {
        Some(raw) => raw.parse::<u32>()?,
        None => DEFAULT_ITERATIONS,
    };

    let registry = RegionRegistry::with_builtin_regions()?;
    let mut source = registry.create(
        "ScalarSourceRegion",
        "source",
        &ValueMap::new().with(PARAM_INCREMENT, 1.0f64),
    )?;
    let mut sink = registry.create(
        "DatabaseOutRegion",
        "sink",
        &ValueMap::new().with(PARAM_OUTPUT_FILE, db_path.as_str()),
    )?;

    let upstream = source
        .output(OUTPUT_DATA)
        .ok_or("source has no dataOut output")?;
    sink.link_input("dataIn0", upstream)?;

    source.initialize()?;
    sink.initialize()?;
    for _ in 0..iterations {
        source.compute()?;
        sink.compute()?;
    }
    sink.execute_command(&["closeFile"])?;

    let conn = open_existing_store(db_path)?;
    for row in read_stream_rows(&conn, "dataStream_dataIn0")? {
        println!("iteration={} value={}", row.iteration, row.value);
    }
    Ok(())
}
