#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Once};

use bevy::prelude::*;
use spawn_core::{build_headless_app_with_config, run_cycle, SpawnConfig, Unit};

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_spawn_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test spawn config at {}",
            config_path.display()
        );

        std::env::set_var("SPAWN_CONFIG_PATH", &config_path);
    });
}

/// Builds an app from an inline JSON config.
pub fn app_from_json(json: &str) -> App {
    let config = SpawnConfig::from_json_str(json).expect("test config parses");
    build_headless_app_with_config(Arc::new(config))
}

pub fn run_cycles(app: &mut App, cycles: usize) {
    for _ in 0..cycles {
        run_cycle(app);
    }
}

/// Units sorted by name.
pub fn units(app: &mut App) -> Vec<Unit> {
    let mut query = app.world.query::<&Unit>();
    let mut units: Vec<_> = query.iter(&app.world).cloned().collect();
    units.sort_by(|a, b| a.name.cmp(&b.name));
    units
}
