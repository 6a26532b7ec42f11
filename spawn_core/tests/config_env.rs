use std::fs;
use std::path::PathBuf;

use spawn_core::{
    build_headless_app, load_spawn_config_from_env, run_cycle, CycleTick, Facility,
    SpawnConfigHandle, SpawnConfigMetadata,
};
use tracing_subscriber::EnvFilter;

const OVERRIDE: &str = r#"{
    "colony": "E3S9",
    "starting_energy": 500,
    "facilities": [{ "id": 4, "position": { "x": 10, "y": 10 } }],
    "producers": [{
        "name": "scouts",
        "specs": [{
            "priority": 2,
            "extra_parts": ["move"],
            "parts_multiplier": 2,
            "min_count": 1,
            "payload": { "role": "scout" }
        }]
    }]
}"#;

fn write_fixture(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}_{}", std::process::id(), name));
    fs::write(&path, contents).expect("fixture written");
    path
}

// Both cases live in one test: they share the process environment.
#[test]
fn env_override_and_fallback() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let path = write_fixture("spawn_config.json", OVERRIDE);
    std::env::set_var("SPAWN_CONFIG_PATH", &path);

    let (config, metadata) = load_spawn_config_from_env();
    assert_eq!(config.colony, "E3S9");
    assert_eq!(metadata.path(), Some(path.as_path()));

    let mut app = build_headless_app();
    run_cycle(&mut app);
    assert_eq!(app.world.resource::<SpawnConfigHandle>().get().colony, "E3S9");
    assert!(app.world.resource::<SpawnConfigMetadata>().path().is_some());
    assert_eq!(app.world.resource::<CycleTick>().0, 1);
    let mut facilities = app.world.query::<&Facility>();
    assert_eq!(facilities.iter(&app.world).count(), 1);

    let broken = write_fixture("broken_spawn_config.json", "{ not json");
    std::env::set_var("SPAWN_CONFIG_PATH", &broken);
    let (config, metadata) = load_spawn_config_from_env();
    assert_eq!(config.colony, "W1N1");
    assert!(metadata.path().is_none());

    std::env::remove_var("SPAWN_CONFIG_PATH");
    let _ = fs::remove_file(path);
    let _ = fs::remove_file(broken);
}
