use bevy::prelude::*;
use spawn_runtime::{Direction, PartType, Position, Priority, RequestPayload, RoleTag};

use crate::components::FacilityId;

/// A unit committed during the current cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRecord {
    pub facility: FacilityId,
    pub name: String,
    pub role: RoleTag,
    pub priority: Priority,
    pub tier: u32,
    pub body: Vec<PartType>,
    pub cost: u32,
    pub payload: RequestPayload,
    pub directions: Vec<Direction>,
    pub first_step: Option<Position>,
}

/// A facility still working on a unit committed in an earlier cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightSpawn {
    pub facility: FacilityId,
    pub name: String,
    pub remaining: u32,
    pub first_step: Option<Position>,
}

/// Advisory claim on the tile a unit will occupy once it leaves its facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileReservation {
    pub position: Position,
    pub facility: FacilityId,
    pub unit: String,
}

/// Per-cycle spawning state read by movement and statistics collaborators.
#[derive(Resource, Debug, Default, Clone)]
pub struct SpawnRegistry {
    cycle: u64,
    committed: Vec<SpawnRecord>,
    in_progress: Vec<InFlightSpawn>,
    reservations: Vec<TileReservation>,
}

impl SpawnRegistry {
    pub fn begin_cycle(&mut self, cycle: u64) {
        self.cycle = cycle;
        self.committed.clear();
        self.in_progress.clear();
        self.reservations.clear();
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn record_commit(&mut self, record: SpawnRecord) {
        self.committed.push(record);
    }

    /// Tracks a busy facility; once it is within `lookahead` cycles of
    /// finishing, its exit tile is reserved.
    pub fn track_in_progress(&mut self, spawn: InFlightSpawn, lookahead: u32) {
        if spawn.remaining <= lookahead {
            if let Some(position) = spawn.first_step {
                self.reservations.push(TileReservation {
                    position,
                    facility: spawn.facility,
                    unit: spawn.name.clone(),
                });
            }
        }
        self.in_progress.push(spawn);
    }

    pub fn committed(&self) -> &[SpawnRecord] {
        &self.committed
    }

    pub fn in_progress(&self) -> &[InFlightSpawn] {
        &self.in_progress
    }

    pub fn reservations(&self) -> &[TileReservation] {
        &self.reservations
    }

    pub fn reservation_at(&self, position: Position) -> Option<&TileReservation> {
        self.reservations
            .iter()
            .find(|reservation| reservation.position == position)
    }

    pub fn is_reserved(&self, position: Position) -> bool {
        self.reservation_at(position).is_some()
    }

    pub fn energy_committed(&self) -> u64 {
        self.committed
            .iter()
            .map(|record| u64::from(record.cost))
            .sum()
    }
}
