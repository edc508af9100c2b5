use regionkit_core::regions::{COMMAND_CLOSE_FILE, PARAM_OUTPUT_FILE, PARAM_TABLE_PREFIX};
use regionkit_core::store::{insert_stream_row, list_stream_tables};
use regionkit_core::{
    Array, BasicType, DatabaseOutRegion, Output, PortError, Region, RegionError, RegionRegistry,
    RegionState, StreamRow, Value, ValueMap,
};
use rusqlite::Connection;
use std::path::Path;

#[test]
fn two_of_three_connected_inputs_get_tables_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);
    let mut first = scalar_output("first");
    let mut second = scalar_output("second");
    sink.link_input("dataIn0", &first).unwrap();
    sink.link_input("dataIn1", &second).unwrap();

    sink.initialize().unwrap();
    for (a, b) in [(1.5f32, 2.5f32), (3.5, 4.5)] {
        first.set_data(Array::from(vec![a])).unwrap();
        second.set_data(Array::from(vec![b])).unwrap();
        sink.compute().unwrap();
    }

    assert_eq!(
        table_names(&path, "dataStream"),
        vec!["dataStream_dataIn0", "dataStream_dataIn1"]
    );
    assert_eq!(rows(&path, "dataStream_dataIn0"), vec![(0, 1.5), (1, 3.5)]);
    assert_eq!(rows(&path, "dataStream_dataIn1"), vec![(0, 2.5), (1, 4.5)]);
    assert_eq!(sink.iteration(), 2);
    assert_eq!(sink.state(), RegionState::Computing);
}

#[test]
fn each_compute_appends_one_gapless_row_per_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);
    let mut upstream = scalar_output("upstream");
    sink.link_input("dataIn4", &upstream).unwrap();
    sink.initialize().unwrap();

    for k in 0..5 {
        upstream.set_data(Array::from(vec![k as f32])).unwrap();
        sink.compute().unwrap();
    }

    let iterations: Vec<i64> = rows(&path, "dataStream_dataIn4")
        .into_iter()
        .map(|(iteration, _)| iteration)
        .collect();
    assert_eq!(iterations, vec![0, 1, 2, 3, 4]);
}

#[test]
fn initialize_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let stale = Connection::open(&path).unwrap();
    stale
        .execute_batch("CREATE TABLE leftover (x); INSERT INTO leftover VALUES (1);")
        .unwrap();
    drop(stale);

    let mut sink = sink_at(&path);
    let upstream = scalar_output("upstream");
    sink.link_input("dataIn0", &upstream).unwrap();
    sink.initialize().unwrap();

    assert_eq!(table_names(&path, "dataStream"), vec!["dataStream_dataIn0"]);
    let conn = Connection::open(&path).unwrap();
    let leftovers: i64 = conn
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE name = 'leftover';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(leftovers, 0);
}

#[test]
fn setting_the_same_path_keeps_the_open_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);
    let mut upstream = scalar_output("upstream");
    sink.link_input("dataIn0", &upstream).unwrap();
    sink.initialize().unwrap();
    upstream.set_data(Array::from(vec![1.0f32])).unwrap();
    sink.compute().unwrap();

    sink.set_parameter_string(PARAM_OUTPUT_FILE, path.to_str().unwrap())
        .unwrap();
    upstream.set_data(Array::from(vec![2.0f32])).unwrap();
    sink.compute().unwrap();

    let sink_impl = sink.implementation::<DatabaseOutRegion>().unwrap();
    assert!(sink_impl.is_store_open());
    assert_eq!(sink_impl.next_iteration(), 2);
    assert_eq!(rows(&path, "dataStream_dataIn0"), vec![(0, 1.0), (1, 2.0)]);
}

#[test]
fn changing_the_path_starts_a_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let first_path = dir.path().join("first.db");
    let second_path = dir.path().join("second.db");
    std::fs::write(&second_path, b"stale bytes").unwrap();

    let mut sink = sink_at(&first_path);
    let mut upstream = scalar_output("upstream");
    sink.link_input("dataIn0", &upstream).unwrap();
    sink.initialize().unwrap();
    for value in [1.0f32, 2.0] {
        upstream.set_data(Array::from(vec![value])).unwrap();
        sink.compute().unwrap();
    }

    sink.set_parameter_string(PARAM_OUTPUT_FILE, second_path.to_str().unwrap())
        .unwrap();
    assert!(rows(&second_path, "dataStream_dataIn0").is_empty());

    upstream.set_data(Array::from(vec![7.0f32])).unwrap();
    sink.compute().unwrap();

    assert_eq!(rows(&first_path, "dataStream_dataIn0"), vec![(0, 1.0), (1, 2.0)]);
    assert_eq!(rows(&second_path, "dataStream_dataIn0"), vec![(0, 7.0)]);
    assert_eq!(
        sink.get_parameter_string(PARAM_OUTPUT_FILE).unwrap(),
        second_path.to_str().unwrap()
    );
}

#[test]
fn initialize_without_links_fails_and_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);

    let err = sink.initialize().unwrap_err();
    assert!(matches!(err, RegionError::Configuration(_)));
    assert!(!path.exists());
    assert_eq!(sink.state(), RegionState::Constructed);
    assert!(!sink
        .implementation::<DatabaseOutRegion>()
        .unwrap()
        .is_store_open());
}

#[test]
fn initialize_without_output_file_fails() {
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let mut sink = registry
        .create("DatabaseOutRegion", "sink", &ValueMap::new())
        .unwrap();
    let upstream = scalar_output("upstream");
    sink.link_input("dataIn0", &upstream).unwrap();

    assert!(matches!(
        sink.initialize().unwrap_err(),
        RegionError::Configuration(_)
    ));
    assert!(matches!(
        sink.compute().unwrap_err(),
        RegionError::NotInitialized(_)
    ));
}

#[test]
fn close_file_releases_the_store_and_clears_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);
    let upstream = scalar_output("upstream");
    sink.link_input("dataIn0", &upstream).unwrap();
    sink.initialize().unwrap();
    sink.compute().unwrap();

    assert_eq!(sink.execute_command(&[COMMAND_CLOSE_FILE]).unwrap(), None);
    assert!(!sink
        .implementation::<DatabaseOutRegion>()
        .unwrap()
        .is_store_open());
    assert_eq!(sink.get_parameter_string(PARAM_OUTPUT_FILE).unwrap(), "");
    assert!(matches!(
        sink.compute().unwrap_err(),
        RegionError::Configuration(_)
    ));
    assert_eq!(rows(&path, "dataStream_dataIn0"), vec![(0, 0.0)]);
}

#[test]
fn unknown_protocol_members_fail_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);

    assert!(matches!(
        sink.get_parameter("bogus", 0).unwrap_err(),
        RegionError::UnknownParameter { .. }
    ));
    assert!(matches!(
        sink.set_parameter("bogus", 0, 1i64).unwrap_err(),
        RegionError::UnknownParameter { .. }
    ));
    assert!(matches!(
        sink.execute_command(&["flushFile"]).unwrap_err(),
        RegionError::UnknownCommand { .. }
    ));
    assert!(matches!(
        sink.execute_command::<&str>(&[]).unwrap_err(),
        RegionError::Configuration(_)
    ));
    assert_eq!(
        sink.get_parameter_string(PARAM_OUTPUT_FILE).unwrap(),
        path.to_str().unwrap()
    );
    assert!(!path.exists());
}

#[test]
fn create_only_prefix_is_rejected_at_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = sink_at(&dir.path().join("streams.db"));

    let err = sink
        .set_parameter_string(PARAM_TABLE_PREFIX, "other")
        .unwrap_err();
    assert!(matches!(err, RegionError::AccessViolation { .. }));
    assert!(matches!(
        sink.set_parameter(PARAM_OUTPUT_FILE, 0, 3i64).unwrap_err(),
        RegionError::ParameterType { .. }
    ));
    assert!(matches!(
        sink.get_parameter(PARAM_OUTPUT_FILE, 1).unwrap_err(),
        RegionError::IndexOutOfRange { .. }
    ));
}

#[test]
fn custom_prefix_names_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let mut sink = registry
        .create(
            "DatabaseOutRegion",
            "sink",
            &ValueMap::new()
                .with(PARAM_OUTPUT_FILE, path.to_str().unwrap())
                .with(PARAM_TABLE_PREFIX, "run7"),
        )
        .unwrap();
    let upstream = scalar_output("upstream");
    sink.link_input("dataIn2", &upstream).unwrap();
    sink.initialize().unwrap();

    assert_eq!(table_names(&path, "run7"), vec!["run7_dataIn2"]);
    assert_eq!(
        sink.get_parameter(PARAM_TABLE_PREFIX, 0).unwrap(),
        Value::Str("run7".to_string())
    );
}

#[test]
fn vector_inputs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = sink_at(&dir.path().join("streams.db"));
    let upstream = Output::new("wide", BasicType::Real32, 3);
    sink.link_input("dataIn0", &upstream).unwrap();

    assert!(matches!(
        sink.initialize().unwrap_err(),
        RegionError::Configuration(_)
    ));
}

#[test]
fn wiring_is_fixed_after_first_compute() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = sink_at(&dir.path().join("streams.db"));
    let upstream = scalar_output("upstream");
    let late = scalar_output("late");
    let wrong_type = Output::new("ints", BasicType::Int32, 1);

    assert!(matches!(
        sink.link_input("dataIn1", &wrong_type).unwrap_err(),
        RegionError::Configuration(_)
    ));
    sink.link_input("dataIn0", &upstream).unwrap();
    assert!(sink.link_input("dataIn0", &late).is_err());
    sink.initialize().unwrap();
    sink.compute().unwrap();

    assert!(matches!(
        sink.link_input("dataIn1", &late).unwrap_err(),
        RegionError::Configuration(_)
    ));
    assert!(sink.unlink_input("dataIn0").is_err());
}

#[test]
fn resized_upstream_buffers_never_reach_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);
    let mut upstream = scalar_output("upstream");
    sink.link_input("dataIn0", &upstream).unwrap();
    sink.initialize().unwrap();
    upstream.set_data(Array::from(vec![1.0f32])).unwrap();
    sink.compute().unwrap();

    for resized in [Vec::new(), vec![1.0f32, 2.0]] {
        assert!(matches!(
            upstream.set_data(Array::from(resized)).unwrap_err(),
            PortError::WidthChanged { frozen: 1, .. }
        ));
    }
    assert_eq!(sink.input("dataIn0").unwrap().element_count(), 1);

    upstream.set_data(Array::from(vec![3.0f32])).unwrap();
    sink.compute().unwrap();
    assert_eq!(rows(&path, "dataStream_dataIn0"), vec![(0, 1.0), (1, 3.0)]);
    assert_eq!(sink.iteration(), 2);
}

#[test]
fn failed_insert_rolls_back_the_whole_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);
    let mut first = scalar_output("first");
    let mut second = scalar_output("second");
    sink.link_input("dataIn0", &first).unwrap();
    sink.link_input("dataIn1", &second).unwrap();
    sink.initialize().unwrap();
    first.set_data(Array::from(vec![1.0f32])).unwrap();
    second.set_data(Array::from(vec![2.0f32])).unwrap();
    sink.compute().unwrap();

    let conn = Connection::open(&path).unwrap();
    insert_stream_row(
        &conn,
        "dataStream_dataIn1",
        StreamRow {
            iteration: 1,
            value: 9.0,
        },
    )
    .unwrap();

    assert!(matches!(
        sink.compute().unwrap_err(),
        RegionError::Resource(_)
    ));
    assert_eq!(rows(&path, "dataStream_dataIn0"), vec![(0, 1.0)]);
    assert_eq!(rows(&path, "dataStream_dataIn1"), vec![(0, 2.0), (1, 9.0)]);
    assert_eq!(sink.iteration(), 1);
    assert_eq!(
        sink.implementation::<DatabaseOutRegion>()
            .unwrap()
            .next_iteration(),
        1
    );

    conn.execute("DELETE FROM dataStream_dataIn1 WHERE iteration = 1;", [])
        .unwrap();
    sink.compute().unwrap();
    assert_eq!(rows(&path, "dataStream_dataIn0"), vec![(0, 1.0), (1, 1.0)]);
    assert_eq!(rows(&path, "dataStream_dataIn1"), vec![(0, 2.0), (1, 2.0)]);
}

#[test]
fn failed_reinitialize_closes_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streams.db");
    let mut sink = sink_at(&path);
    let upstream = scalar_output("upstream");
    sink.link_input("dataIn0", &upstream).unwrap();
    sink.initialize().unwrap();
    assert!(sink
        .implementation::<DatabaseOutRegion>()
        .unwrap()
        .is_store_open());

    sink.unlink_input("dataIn0").unwrap();
    assert!(matches!(
        sink.initialize().unwrap_err(),
        RegionError::Configuration(_)
    ));
    assert_eq!(sink.state(), RegionState::Constructed);
    assert!(!sink
        .implementation::<DatabaseOutRegion>()
        .unwrap()
        .is_store_open());
    assert!(matches!(
        sink.compute().unwrap_err(),
        RegionError::NotInitialized(_)
    ));
}

fn sink_at(path: &Path) -> Region {
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    registry
        .create(
            "DatabaseOutRegion",
            "sink",
            &ValueMap::new().with(PARAM_OUTPUT_FILE, path.to_str().unwrap()),
        )
        .unwrap()
}

fn scalar_output(name: &str) -> Output {
    Output::new(name, BasicType::Real32, 1)
}

fn table_names(path: &Path, prefix: &str) -> Vec<String> {
    let conn = Connection::open(path).unwrap();
    list_stream_tables(&conn, prefix).unwrap()
}

fn rows(path: &Path, table: &str) -> Vec<(i64, f64)> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare(&format!(
            "SELECT iteration, value FROM {table} ORDER BY iteration;"
        ))
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}
