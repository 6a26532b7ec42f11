use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use spawn_runtime::{CompositionSpec, CostCatalog, Position, RoleTag};
use thiserror::Error;

use crate::components::FacilityId;

pub const BUILTIN_SPAWN_CONFIG: &str = include_str!("data/spawn_config.json");

/// Colony and spawning parameters for the headless runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub colony: String,
    /// Centre of the colony layout; new units leave facilities away from it.
    pub anchor: Position,
    pub part_costs: CostCatalog,
    /// Busy facilities this many cycles from completion reserve their exit tile.
    pub reservation_lookahead: u32,
    pub spawn_time_per_part: u32,
    pub energy_capacity: u32,
    pub starting_energy: u32,
    pub energy_regen_per_cycle: u32,
    /// Energy stores drawn from when spawning, in preferred order.
    pub energy_sources: Vec<u32>,
    /// Roles the economy cannot run without; while any is missing the colony
    /// is bootstrapping.
    pub core_roles: Vec<RoleTag>,
    pub facilities: Vec<FacilityConfig>,
    pub producers: Vec<ProducerTemplate>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            colony: "W1N1".to_string(),
            anchor: Position::new(25, 25),
            part_costs: CostCatalog::default(),
            reservation_lookahead: 2,
            spawn_time_per_part: 3,
            energy_capacity: 800,
            starting_energy: 300,
            energy_regen_per_cycle: 40,
            energy_sources: Vec::new(),
            core_roles: Vec::new(),
            facilities: Vec::new(),
            producers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityConfig {
    pub id: FacilityId,
    pub position: Position,
}

/// Standing orders replayed every cycle by one template producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerTemplate {
    pub name: String,
    #[serde(default)]
    pub specs: Vec<CompositionSpec>,
}

impl SpawnConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_SPAWN_CONFIG)
                .expect("builtin spawn config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, SpawnConfigError> {
        let config = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, SpawnConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| SpawnConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        SpawnConfig::from_json_str(&contents)
    }
}

#[derive(Debug, Error)]
pub enum SpawnConfigError {
    #[error("failed to parse spawn config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read spawn config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Resource, Debug, Clone)]
pub struct SpawnConfigHandle(Arc<SpawnConfig>);

impl SpawnConfigHandle {
    pub fn new(config: Arc<SpawnConfig>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<SpawnConfig> {
        self.0.clone()
    }
}

#[derive(Resource, Debug, Clone)]
pub struct SpawnConfigMetadata {
    path: Option<PathBuf>,
}

impl SpawnConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Load the spawn config named by `SPAWN_CONFIG_PATH`, falling back to the
/// builtin config when the variable is unset or the file is unusable.
pub fn load_spawn_config_from_env() -> (Arc<SpawnConfig>, SpawnConfigMetadata) {
    if let Some(path) = env::var("SPAWN_CONFIG_PATH").ok().map(PathBuf::from) {
        match SpawnConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "colony::config",
                    path = %path.display(),
                    facilities = config.facilities.len(),
                    producers = config.producers.len(),
                    "spawn_config.loaded=file"
                );
                return (Arc::new(config), SpawnConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "colony::config",
                    path = %path.display(),
                    error = %err,
                    "spawn_config.load_failed"
                );
            }
        }
    }

    let config = SpawnConfig::builtin();
    tracing::info!(target: "colony::config", "spawn_config.loaded=builtin");
    (config, SpawnConfigMetadata::new(None))
}
