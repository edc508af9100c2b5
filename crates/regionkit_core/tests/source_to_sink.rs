use regionkit_core::regions::{
    COMMAND_RESET, OUTPUT_DATA, PARAM_EMITTED, PARAM_INCREMENT, PARAM_OUTPUT_FILE, PARAM_VALUE,
    PARAM_WIDTH,
};
use regionkit_core::store::{open_existing_store, read_stream_rows};
use regionkit_core::{Array, Region, RegionError, RegionRegistry, StreamRow, Value, ValueMap};

#[test]
fn source_stream_is_recorded_by_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.db");
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let params = ValueMap::from_json_str(r#"{"value": 1, "increment": 0.5}"#).unwrap();
    let mut source = source(&registry, params);
    let mut sink = registry
        .create(
            "DatabaseOutRegion",
            "sink",
            &ValueMap::new().with(PARAM_OUTPUT_FILE, path.to_str().unwrap()),
        )
        .unwrap();
    sink.link_input("dataIn3", source.output(OUTPUT_DATA).unwrap())
        .unwrap();
    assert_eq!(sink.input("dataIn3").unwrap().source(), Some(OUTPUT_DATA));

    source.initialize().unwrap();
    sink.initialize().unwrap();
    for _ in 0..3 {
        source.compute().unwrap();
        sink.compute().unwrap();
    }
    sink.execute_command(&["closeFile"]).unwrap();

    let conn = open_existing_store(&path).unwrap();
    let rows = read_stream_rows(&conn, "dataStream_dataIn3").unwrap();
    assert_eq!(
        rows,
        vec![
            StreamRow { iteration: 0, value: 1.0 },
            StreamRow { iteration: 1, value: 1.5 },
            StreamRow { iteration: 2, value: 2.0 },
        ]
    );
}

#[test]
fn source_width_sizes_its_output() {
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let params = ValueMap::new()
        .with(PARAM_WIDTH, 3u32)
        .with(PARAM_VALUE, 2.0f64);
    let mut source = source(&registry, params);
    let mut sink = registry
        .create("DatabaseOutRegion", "sink", &ValueMap::new())
        .unwrap();
    sink.link_input("dataIn0", source.output(OUTPUT_DATA).unwrap())
        .unwrap();

    source.initialize().unwrap();
    source.compute().unwrap();

    assert_eq!(
        source.output(OUTPUT_DATA).unwrap().snapshot(),
        Array::Real32(vec![2.0, 2.0, 2.0])
    );
    assert_eq!(sink.input("dataIn0").unwrap().element_count(), 3);
}

#[test]
fn runtime_parameters_follow_access_modes() {
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let mut source = source(&registry, ValueMap::new());

    source.set_parameter(PARAM_VALUE, 0, 5i64).unwrap();
    assert_eq!(source.get_parameter(PARAM_VALUE, 0).unwrap(), Value::Real64(5.0));

    assert!(matches!(
        source.set_parameter(PARAM_EMITTED, 0, 1u64).unwrap_err(),
        RegionError::AccessViolation { .. }
    ));
    assert!(matches!(
        source.set_parameter(PARAM_WIDTH, 0, 4u32).unwrap_err(),
        RegionError::AccessViolation { .. }
    ));
    assert!(matches!(
        source.set_parameter(PARAM_INCREMENT, 0, "fast").unwrap_err(),
        RegionError::ParameterType { .. }
    ));
}

#[test]
fn reset_command_rewinds_the_stream() {
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let mut source = source(&registry, ValueMap::new().with(PARAM_INCREMENT, 1.0f64));
    let mut sink = registry
        .create("DatabaseOutRegion", "sink", &ValueMap::new())
        .unwrap();
    sink.link_input("dataIn0", source.output(OUTPUT_DATA).unwrap())
        .unwrap();

    source.initialize().unwrap();
    source.compute().unwrap();
    source.compute().unwrap();
    assert_eq!(source.get_parameter(PARAM_VALUE, 0).unwrap(), Value::Real64(2.0));
    assert_eq!(source.get_parameter(PARAM_EMITTED, 0).unwrap(), Value::UInt64(2));

    assert_eq!(source.execute_command(&[COMMAND_RESET]).unwrap(), None);
    assert_eq!(source.get_parameter(PARAM_VALUE, 0).unwrap(), Value::Real64(0.0));
    assert_eq!(source.get_parameter(PARAM_EMITTED, 0).unwrap(), Value::UInt64(0));
    assert_eq!(source.iteration(), 2);
}

#[test]
fn unconnected_source_cannot_initialize() {
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let mut source = source(&registry, ValueMap::new());
    assert!(matches!(
        source.initialize().unwrap_err(),
        RegionError::Configuration(_)
    ));
}

#[test]
fn dropping_the_source_disconnects_the_sink() {
    let registry = RegionRegistry::with_builtin_regions().unwrap();
    let source_region = source(&registry, ValueMap::new());
    let mut sink = registry
        .create("DatabaseOutRegion", "sink", &ValueMap::new())
        .unwrap();
    sink.link_input("dataIn0", source_region.output(OUTPUT_DATA).unwrap())
        .unwrap();
    assert!(sink.input("dataIn0").unwrap().is_connected());

    drop(source_region);
    assert!(!sink.input("dataIn0").unwrap().is_connected());
    assert!(matches!(
        sink.initialize().unwrap_err(),
        RegionError::Configuration(_)
    ));
}

fn source(registry: &RegionRegistry, params: ValueMap) -> Region {
    registry
        .create("ScalarSourceRegion", "source", &params)
        .unwrap()
}
