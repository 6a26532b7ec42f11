//! Shared spawn-planning contracts for the colony agent.
//!
//! This crate holds the data types exchanged between role producers and the
//! spawning core, together with the body composition algorithms, without
//! depending on the Bevy runtime in `spawn_core`.

pub mod collector;
pub mod composer;
pub mod geometry;
pub mod parts;
pub mod request;

pub use collector::{
    compose_queue, composition_ceiling, ProducerContext, RequestCollector, RequestProducer,
};
pub use composer::{
    compose, composer_for, layout_by_priority, BodyComposer, PriorityFill, RatioInterleave,
};
pub use geometry::{exit_directions, range, Direction, Position, ROOM_SIZE};
pub use parts::{body_cost, CatalogError, CostCatalog, PartType, MAX_BODY_PARTS, MAX_PART_COST};
pub use request::{
    ComposedRequest, CompositionSpec, CompositionStrategy, InterleaveCounts, PartCount, Priority,
    RequestPayload, RequestQueue, RoleTag,
};
