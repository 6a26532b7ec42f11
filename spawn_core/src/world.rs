//! Stand-in for the game world: energy, facility occupancy, and the template
//! producers that replay configured standing orders.

use std::collections::{BTreeMap, HashSet};

use bevy::prelude::*;
use spawn_runtime::{body_cost, CompositionSpec, CostCatalog, ProducerContext, RequestProducer};
use tracing::{debug, info};

use crate::components::{Facility, FacilityId, FacilityState, Spawning, Unit};
use crate::resources::{ColonySnapshot, CycleTick};
use crate::spawn_api::{validate_body, SpawnApi, SpawnError, SpawnOrder};
use crate::spawn_config::{ProducerTemplate, SpawnConfig, SpawnConfigHandle};

/// World-side view of the colony's spawning resources.
#[derive(Resource, Debug, Clone)]
pub struct SimulatedColony {
    pub energy: u32,
    pub capacity: u32,
    pub regen_per_cycle: u32,
    catalog: CostCatalog,
    /// Known facilities and whether each one is producing a unit.
    occupied: BTreeMap<FacilityId, bool>,
    names: HashSet<String>,
}

impl SimulatedColony {
    pub fn new(capacity: u32, energy: u32, regen_per_cycle: u32, catalog: CostCatalog) -> Self {
        Self {
            energy: energy.min(capacity),
            capacity,
            regen_per_cycle,
            catalog,
            occupied: BTreeMap::new(),
            names: HashSet::new(),
        }
    }

    pub fn from_config(config: &SpawnConfig) -> Self {
        Self::new(
            config.energy_capacity,
            config.starting_energy,
            config.energy_regen_per_cycle,
            config.part_costs.clone(),
        )
    }

    pub fn register_facility(&mut self, id: FacilityId) {
        self.occupied.entry(id).or_insert(false);
    }

    pub fn release_facility(&mut self, id: FacilityId) {
        if let Some(occupied) = self.occupied.get_mut(&id) {
            *occupied = false;
        }
    }

    pub fn is_occupied(&self, id: FacilityId) -> bool {
        self.occupied.get(&id).copied().unwrap_or(false)
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn regenerate(&mut self) {
        self.energy = self
            .energy
            .saturating_add(self.regen_per_cycle)
            .min(self.capacity);
    }
}

impl SpawnApi for SimulatedColony {
    fn probe(&self, order: &SpawnOrder<'_>) -> Result<(), SpawnError> {
        validate_body(order.body)?;
        match self.occupied.get(&order.facility) {
            None => return Err(SpawnError::UnknownFacility(order.facility)),
            Some(true) => return Err(SpawnError::FacilityBusy(order.facility)),
            Some(false) => {}
        }
        if self.name_taken(order.name) {
            return Err(SpawnError::NameTaken(order.name.to_string()));
        }
        // Price the body ourselves rather than trusting the order.
        let required = body_cost(order.body, &self.catalog);
        if required > self.energy {
            return Err(SpawnError::NotEnoughEnergy {
                required,
                available: self.energy,
            });
        }
        Ok(())
    }

    fn commit(&mut self, order: &SpawnOrder<'_>) -> Result<(), SpawnError> {
        self.probe(order)?;
        self.energy -= body_cost(order.body, &self.catalog);
        self.names.insert(order.name.to_string());
        self.occupied.insert(order.facility, true);
        Ok(())
    }
}

/// Producer that asks for the same specs every cycle.
#[derive(Debug, Clone)]
pub struct TemplateProducer {
    name: String,
    specs: Vec<CompositionSpec>,
}

impl TemplateProducer {
    pub fn new(name: impl Into<String>, specs: Vec<CompositionSpec>) -> Self {
        Self {
            name: name.into(),
            specs,
        }
    }
}

impl From<&ProducerTemplate> for TemplateProducer {
    fn from(template: &ProducerTemplate) -> Self {
        Self::new(template.name.clone(), template.specs.clone())
    }
}

impl RequestProducer for TemplateProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn produce(&self, _ctx: &ProducerContext) -> Vec<CompositionSpec> {
        self.specs.clone()
    }
}

/// Producers consulted every cycle, in registration order.
#[derive(Resource, Default)]
pub struct ProducerSet {
    producers: Vec<Box<dyn RequestProducer + Send + Sync>>,
}

impl ProducerSet {
    pub fn from_config(config: &SpawnConfig) -> Self {
        let mut set = Self::default();
        for template in &config.producers {
            set.push(TemplateProducer::from(template));
        }
        set
    }

    pub fn push(&mut self, producer: impl RequestProducer + Send + Sync + 'static) {
        self.producers.push(Box::new(producer));
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RequestProducer> {
        self.producers
            .iter()
            .map(|producer| producer.as_ref() as &dyn RequestProducer)
    }
}

pub fn spawn_configured_facilities(
    mut commands: Commands,
    config: Res<SpawnConfigHandle>,
    mut colony: ResMut<SimulatedColony>,
) {
    let config = config.get();
    for facility in &config.facilities {
        colony.register_facility(facility.id);
        commands.spawn(Facility::new(facility.id, facility.position));
    }
    info!(
        target: "colony::world",
        colony = %config.colony,
        facilities = config.facilities.len(),
        "world.facilities_spawned"
    );
}

pub fn regenerate_energy(mut colony: ResMut<SimulatedColony>) {
    colony.regenerate();
}

/// Advances facilities started in earlier cycles. A committed facility turns
/// busy, a busy one counts down, and at zero it goes idle and its unit is
/// released.
pub fn progress_facilities(
    mut commands: Commands,
    tick: Res<CycleTick>,
    mut colony: ResMut<SimulatedColony>,
    mut facilities: Query<&mut Facility>,
) {
    for mut facility in facilities.iter_mut() {
        match facility.state {
            FacilityState::Idle => {}
            FacilityState::Committed => facility.state = FacilityState::Busy,
            FacilityState::Busy => {
                let finished = match facility.spawning.as_mut() {
                    Some(spawning) => {
                        spawning.remaining = spawning.remaining.saturating_sub(1);
                        spawning.remaining == 0
                    }
                    None => true,
                };
                if !finished {
                    continue;
                }
                facility.state = FacilityState::Idle;
                colony.release_facility(facility.id);
                if let Some(done) = facility.spawning.take() {
                    if let Some(mut unit) = commands.get_entity(done.unit) {
                        unit.remove::<Spawning>();
                    }
                    debug!(
                        target: "colony::world",
                        cycle = tick.0,
                        facility = %facility.id,
                        unit = %done.name,
                        "spawn.completed"
                    );
                }
            }
        }
    }
}

pub fn capture_colony_snapshot(
    config: Res<SpawnConfigHandle>,
    tick: Res<CycleTick>,
    colony: Res<SimulatedColony>,
    units: Query<&Unit>,
    mut snapshot: ResMut<ColonySnapshot>,
) {
    let config = config.get();
    let bootstrapping = config
        .core_roles
        .iter()
        .any(|role| !units.iter().any(|unit| &unit.role == role));

    *snapshot = ColonySnapshot {
        cycle: tick.0,
        energy_available: colony.energy,
        energy_capacity: colony.capacity,
        energy_sources: config.energy_sources.clone(),
        bootstrapping,
    };
}
