use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use spawn_runtime::{PartType, Position, RoleTag};

/// Identifier of a creation facility, stable across cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(pub u32);

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Facility lifecycle. The spawning core only moves `Idle -> Committed`;
/// the world advances `Committed -> Busy -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacilityState {
    Idle,
    Committed,
    Busy,
}

/// Unit currently being produced by a facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawningUnit {
    pub unit: Entity,
    pub name: String,
    pub remaining: u32,
    /// Tile the unit steps onto when it leaves the facility.
    pub first_step: Option<Position>,
}

#[derive(Component, Debug, Clone)]
pub struct Facility {
    pub id: FacilityId,
    pub position: Position,
    pub state: FacilityState,
    pub spawning: Option<SpawningUnit>,
}

impl Facility {
    pub fn new(id: FacilityId, position: Position) -> Self {
        Self {
            id,
            position,
            state: FacilityState::Idle,
            spawning: None,
        }
    }
}

/// A worker unit created by the colony.
#[derive(Component, Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub role: RoleTag,
    pub body: Vec<PartType>,
    pub cost: u32,
    pub memory: serde_json::Map<String, serde_json::Value>,
    pub created_cycle: u64,
}

/// Marks a unit whose creation is still in progress at `facility`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawning {
    pub facility: FacilityId,
}
