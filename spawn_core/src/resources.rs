use bevy::prelude::*;
use spawn_runtime::{ProducerContext, RoleTag};

use crate::allocator::AdmissionReport;

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTick(pub u64);

/// World facts captured at the start of a spawn cycle.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct ColonySnapshot {
    pub cycle: u64,
    pub energy_available: u32,
    /// Most energy the colony could ever put into one unit.
    pub energy_capacity: u32,
    pub energy_sources: Vec<u32>,
    pub bootstrapping: bool,
}

impl ColonySnapshot {
    pub fn producer_context(&self) -> ProducerContext {
        ProducerContext {
            cycle: self.cycle,
            energy_available: self.energy_available,
            energy_capacity: self.energy_capacity,
            bootstrapping: self.bootstrapping,
        }
    }
}

/// Hands out unit ids. Ids are never reused, even when the unit they were
/// drawn for is rejected.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitIdAllocator {
    next: u64,
}

impl UnitIdAllocator {
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

pub fn unit_name(role: &RoleTag, colony: &str, id: u64) -> String {
    format!("{role}_{colony}_{id}")
}

/// Outcome of the most recent admission pass.
#[derive(Resource, Debug, Clone, Default)]
pub struct AdmissionLog {
    pub cycle: u64,
    pub last: Option<AdmissionReport>,
}
