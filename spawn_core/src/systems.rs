use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use spawn_runtime::{compose_queue, composition_ceiling, RequestCollector};
use tracing::{debug, info};

use crate::allocator::{run_admission, AdmissionContext, Budget, FacilitySlot};
use crate::components::{Facility, FacilityState, Spawning, SpawningUnit, Unit};
use crate::registry::{InFlightSpawn, SpawnRegistry};
use crate::resources::{AdmissionLog, ColonySnapshot, CycleTick, UnitIdAllocator};
use crate::spawn_config::SpawnConfigHandle;
use crate::telemetry::SpawnTelemetry;
use crate::world::{ProducerSet, SimulatedColony};

#[derive(SystemParam)]
pub struct SpawnCycleParams<'w, 's> {
    pub commands: Commands<'w, 's>,
    pub config: Res<'w, SpawnConfigHandle>,
    pub snapshot: Res<'w, ColonySnapshot>,
    pub producers: Res<'w, ProducerSet>,
    pub colony: ResMut<'w, SimulatedColony>,
    pub ids: ResMut<'w, UnitIdAllocator>,
    pub registry: ResMut<'w, SpawnRegistry>,
    pub telemetry: ResMut<'w, SpawnTelemetry>,
    pub log: ResMut<'w, AdmissionLog>,
    pub facilities: Query<'w, 's, (Entity, &'static mut Facility)>,
}

/// One spawn cycle: gather requests, compose bodies, admit them against the
/// snapshot's budget and idle facilities, then write the results back into
/// the world.
pub fn run_spawn_cycle(mut params: SpawnCycleParams) {
    let config = params.config.get();
    let snapshot = params.snapshot.clone();
    params.registry.begin_cycle(snapshot.cycle);
    params.telemetry.begin_cycle();

    let mut slots = Vec::new();
    for (entity, facility) in params.facilities.iter() {
        if facility.state == FacilityState::Busy {
            if let Some(spawning) = &facility.spawning {
                params.registry.track_in_progress(
                    InFlightSpawn {
                        facility: facility.id,
                        name: spawning.name.clone(),
                        remaining: spawning.remaining,
                        first_step: spawning.first_step,
                    },
                    config.reservation_lookahead,
                );
            }
        }
        slots.push(FacilitySlot::from_facility(entity, &facility));
    }
    // Query order is not stable across runs; the pool is ordered by id.
    slots.sort_by_key(|slot| slot.id);

    let producer_ctx = snapshot.producer_context();
    let collector = RequestCollector::run(params.producers.iter(), &producer_ctx);
    let ceiling = composition_ceiling(&producer_ctx);
    let queue = compose_queue(collector.into_sorted(), ceiling, &config.part_costs);
    debug!(
        target: "colony::spawning",
        cycle = snapshot.cycle,
        ceiling,
        requests = queue.len(),
        bootstrapping = snapshot.bootstrapping,
        "spawn_cycle.queue_ready"
    );

    let mut ctx = AdmissionContext::new(
        config.colony.clone(),
        Budget::new(snapshot.energy_available),
        snapshot.energy_capacity,
        config.anchor,
    )
    .with_facilities(slots)
    .with_energy_sources(snapshot.energy_sources.clone());

    let report = run_admission(
        &mut ctx,
        queue,
        &mut *params.colony,
        &mut *params.ids,
        &mut *params.registry,
        &mut *params.telemetry,
    );

    // Commits land in the registry and the context in the same order.
    for (slot, record) in ctx.committed().iter().zip(params.registry.committed()) {
        let unit = params
            .commands
            .spawn((
                Unit {
                    name: record.name.clone(),
                    role: record.role.clone(),
                    body: record.body.clone(),
                    cost: record.cost,
                    memory: record.payload.memory.clone(),
                    created_cycle: snapshot.cycle,
                },
                Spawning {
                    facility: record.facility,
                },
            ))
            .id();
        if let Ok((_, mut facility)) = params.facilities.get_mut(slot.entity) {
            facility.state = FacilityState::Committed;
            facility.spawning = Some(SpawningUnit {
                unit,
                name: record.name.clone(),
                remaining: record.body.len() as u32 * config.spawn_time_per_part,
                first_step: record.first_step,
            });
        }
    }

    info!(
        target: "colony::spawning",
        cycle = snapshot.cycle,
        halt = report.halt.as_str(),
        accepted = report.accepted_count(),
        rejected = report.rejected_count(),
        unserved = report.unserved,
        remaining_budget = ctx.budget.available,
        "spawn_cycle.completed"
    );
    params.log.cycle = snapshot.cycle;
    params.log.last = Some(report);
}

pub fn advance_cycle(mut tick: ResMut<CycleTick>) {
    tick.0 += 1;
}
