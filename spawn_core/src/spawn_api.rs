use spawn_runtime::{Direction, PartType, Position, RequestPayload, MAX_BODY_PARTS};
use thiserror::Error;

use crate::components::FacilityId;

/// Hints passed alongside a creation call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOptions {
    pub affinity: Option<Position>,
    /// Energy stores to draw from, in preferred order.
    pub energy_sources: Vec<u32>,
    /// Exit directions the new unit should try, first preferred.
    pub directions: Vec<Direction>,
    pub payload: RequestPayload,
}

/// Everything the world needs to create one unit.
#[derive(Debug, Clone, Copy)]
pub struct SpawnOrder<'a> {
    pub facility: FacilityId,
    pub name: &'a str,
    pub body: &'a [PartType],
    pub cost: u32,
    pub options: &'a SpawnOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("not enough energy: {required} required, {available} available")]
    NotEnoughEnergy { required: u32, available: u32 },
    #[error("body has no parts")]
    EmptyBody,
    #[error("body has {0} parts, limit is {}", MAX_BODY_PARTS)]
    BodyTooLong(usize),
    #[error("facility {0} is already spawning")]
    FacilityBusy(FacilityId),
    #[error("facility {0} is not known to the world")]
    UnknownFacility(FacilityId),
    #[error("unit name `{0}` is already taken")]
    NameTaken(String),
}

impl SpawnError {
    /// Failures that waiting for more energy would resolve.
    pub fn is_scarcity(&self) -> bool {
        matches!(self, SpawnError::NotEnoughEnergy { .. })
    }
}

/// Creation facility interface provided by the world.
pub trait SpawnApi {
    /// Validates `order` without changing any state. Repeated calls with the
    /// same order and no intervening commit return the same result.
    fn probe(&self, order: &SpawnOrder<'_>) -> Result<(), SpawnError>;

    fn commit(&mut self, order: &SpawnOrder<'_>) -> Result<(), SpawnError>;
}

/// Shape checks every implementation applies before looking at world state.
pub fn validate_body(body: &[PartType]) -> Result<(), SpawnError> {
    if body.is_empty() {
        return Err(SpawnError::EmptyBody);
    }
    if body.len() > MAX_BODY_PARTS {
        return Err(SpawnError::BodyTooLong(body.len()));
    }
    Ok(())
}
