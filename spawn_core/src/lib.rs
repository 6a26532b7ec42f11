//! Spawning core for the headless colony runtime.
//!
//! Each call to [`run_cycle`] advances the simulated world by one cycle and
//! runs a single admission pass: producer requests are composed into bodies
//! and admitted, most urgent first, against the colony's energy and idle
//! creation facilities.

pub mod allocator;
mod components;
pub mod registry;
mod resources;
pub mod spawn_api;
pub mod spawn_config;
mod systems;
pub mod telemetry;
pub mod world;

use std::sync::Arc;

use bevy::prelude::*;
use spawn_runtime::Position;

pub use allocator::{
    run_admission, AdmissionContext, AdmissionDecision, AdmissionReport, Budget, FacilitySlot,
    PassHalt, RequestOutcome,
};
pub use components::{Facility, FacilityId, FacilityState, Spawning, SpawningUnit, Unit};
pub use registry::{InFlightSpawn, SpawnRecord, SpawnRegistry, TileReservation};
pub use resources::{unit_name, AdmissionLog, ColonySnapshot, CycleTick, UnitIdAllocator};
pub use spawn_api::{validate_body, SpawnApi, SpawnError, SpawnOptions, SpawnOrder};
pub use spawn_config::{
    load_spawn_config_from_env, FacilityConfig, ProducerTemplate, SpawnConfig, SpawnConfigError,
    SpawnConfigHandle, SpawnConfigMetadata,
};
pub use systems::{advance_cycle, run_spawn_cycle, SpawnCycleParams};
pub use telemetry::{RejectReason, SpawnStats, SpawnTelemetry, SpawnTelemetryEvent, TelemetrySink};
pub use world::{ProducerSet, SimulatedColony, TemplateProducer};

/// Construct a Bevy [`App`] with the spawn cycle, using the config named by
/// `SPAWN_CONFIG_PATH` or the builtin one.
pub fn build_headless_app() -> App {
    let (config, metadata) = load_spawn_config_from_env();
    let mut app = build_headless_app_with_config(config);
    app.insert_resource(metadata);
    app
}

pub fn build_headless_app_with_config(config: Arc<SpawnConfig>) -> App {
    let mut app = App::new();

    let colony = SimulatedColony::from_config(&config);
    let producers = ProducerSet::from_config(&config);

    app.insert_resource(SpawnConfigHandle::new(config))
        .insert_resource(SpawnConfigMetadata::new(None))
        .insert_resource(CycleTick::default())
        .insert_resource(ColonySnapshot::default())
        .insert_resource(UnitIdAllocator::default())
        .insert_resource(SpawnRegistry::default())
        .insert_resource(SpawnTelemetry::default())
        .insert_resource(AdmissionLog::default())
        .insert_resource(colony)
        .insert_resource(producers)
        .add_plugins(MinimalPlugins)
        .add_systems(Startup, world::spawn_configured_facilities)
        .add_systems(
            Update,
            (
                world::regenerate_energy,
                world::progress_facilities,
                world::capture_colony_snapshot,
                systems::run_spawn_cycle,
                systems::advance_cycle,
            )
                .chain(),
        );

    app
}

/// Execute a single colony cycle.
///
/// Runs the chained systems configured in [`build_headless_app`]
/// (energy regen, facility progress, snapshot, spawn cycle, tick increment).
pub fn run_cycle(app: &mut App) {
    app.update();
}

/// Adds a creation facility outside the configured layout.
pub fn spawn_facility(world: &mut World, id: FacilityId, position: Position) -> Entity {
    if let Some(mut colony) = world.get_resource_mut::<SimulatedColony>() {
        colony.register_facility(id);
    }
    world.spawn(Facility::new(id, position)).id()
}
