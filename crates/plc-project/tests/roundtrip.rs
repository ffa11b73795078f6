use std::path::PathBuf;

use plc_core::ParamValue;
use plc_project::*;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("plc_project_{}_{name}", std::process::id()))
}

#[test]
fn demo_tank_loop_loads() {
    let config = load(&demo("tank_loop.yaml")).unwrap();
    assert_eq!(config.cycle_period, 0.5);
    assert_eq!(
        config.instances.names().collect::<Vec<_>>(),
        ["pid1", "valve1", "tank1"]
    );
    assert_eq!(config.execution_order().unwrap(), ["pid1", "valve1", "tank1"]);
    assert_eq!(config.circuits().len(), 1);
}

#[test]
fn legacy_demo_matches_canonical_layout() {
    let config = load(&demo("legacy_two_tanks.yaml")).unwrap();
    assert_eq!(
        config.instances.names().collect::<Vec<_>>(),
        ["tank1", "valve1", "tank2", "valve2", "pid1", "pid2"]
    );
    assert!(config.connections.contains(&ConnectionDef::new("pid1.mv", "valve1.target_opening")));

    let circuits = config.circuits();
    assert_eq!(circuits.len(), 2);
    assert_eq!(circuits[0].name, "tank1");
    assert_eq!(circuits[1].name, "tank2");

    assert_eq!(
        config.instances.get("pid1").unwrap().params["name"],
        ParamValue::Text("PID1".to_string())
    );
}

#[test]
fn roundtrip_yaml_and_json() {
    let config = load(&demo("legacy_two_tanks.yaml")).unwrap();

    let yaml = temp_path("roundtrip.yaml");
    save(&yaml, &config).unwrap();
    assert_eq!(load(&yaml).unwrap(), config);

    let json = temp_path("roundtrip.json");
    save(&json, &config).unwrap();
    assert_eq!(load(&json).unwrap(), config);

    let _ = std::fs::remove_file(yaml);
    let _ = std::fs::remove_file(json);
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load(&temp_path("config.toml")).unwrap_err();
    assert!(matches!(err, ProjectError::UnsupportedFormat { .. }));
}

#[test]
fn save_rejects_invalid_config() {
    let config = PlcConfig::new(-1.0);
    let err = save(&temp_path("invalid.yaml"), &config).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
}

#[test]
fn local_directory_roundtrip() {
    let dir = temp_path("local");
    let _ = std::fs::remove_dir_all(&dir);
    assert!(load_from_local(&dir).unwrap().is_none());

    let config = PlcConfig::new(0.5)
        .with_instance("pid1", InstanceDef::new("PID"))
        .with_instance("valve1", InstanceDef::new("valve"))
        .with_connection("pid1.mv", "valve1.target_opening");
    let path = save_to_local(&dir, &config).unwrap();
    assert!(path.ends_with(LOCAL_CONFIG_FILE));
    assert_eq!(load_from_local(&dir).unwrap(), Some(config));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn full_replace_normalizes_to_diff() {
    let old = load(&demo("tank_loop.yaml")).unwrap();
    let new = load(&demo("legacy_two_tanks.yaml")).unwrap();

    let diff = ConfigDiff::between(&old, &new);
    let mut applied = old.clone();
    let summary = diff.apply(&mut applied);
    assert!(summary.requires_rebuild());

    assert_eq!(applied.cycle_period, new.cycle_period);
    assert_eq!(applied.execution_order, new.execution_order);
    for (name, def) in new.instances.iter() {
        assert_eq!(applied.instances.get(name), Some(def), "{name}");
    }
    assert_eq!(applied.instances.len(), new.instances.len());
    let mut got = applied.connections.clone();
    let mut want = new.connections.clone();
    got.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    want.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    assert_eq!(got, want);
}
