//! Per-cycle admission pass.
//!
//! Composed requests are admitted in priority order against a cycle budget
//! and the pool of idle facilities. The pass never fails as a whole: every
//! request ends accepted, rejected or unserved, and the report says why the
//! pass stopped.

use bevy::prelude::*;
use serde_json::json;
use spawn_runtime::{
    exit_directions, range, ComposedRequest, Position, Priority, RequestPayload, RequestQueue,
    RoleTag,
};
use tracing::{debug, error, info, warn};

use crate::components::{Facility, FacilityId, FacilityState};
use crate::registry::{SpawnRecord, SpawnRegistry};
use crate::resources::{unit_name, UnitIdAllocator};
use crate::spawn_api::{SpawnApi, SpawnError, SpawnOptions, SpawnOrder};
use crate::telemetry::{RejectReason, SpawnTelemetryEvent, TelemetrySink};

/// Energy that may still be committed this cycle. Only ever shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub available: u32,
}

impl Budget {
    pub fn new(available: u32) -> Self {
        Self { available }
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        cost <= self.available
    }

    fn spend(&mut self, cost: u32) {
        self.available = self.available.saturating_sub(cost);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilitySlot {
    pub entity: Entity,
    pub id: FacilityId,
    pub position: Position,
    pub state: FacilityState,
}

impl FacilitySlot {
    pub fn from_facility(entity: Entity, facility: &Facility) -> Self {
        Self {
            entity,
            id: facility.id,
            position: facility.position,
            state: facility.state,
        }
    }
}

/// Scratch state for one admission pass. Built from the cycle snapshot and
/// dropped when the pass ends.
#[derive(Debug, Clone)]
pub struct AdmissionContext {
    pub colony: String,
    pub budget: Budget,
    pub absolute_max_capacity: u32,
    pub anchor: Position,
    pub energy_sources: Vec<u32>,
    idle: Vec<FacilitySlot>,
    committed: Vec<FacilitySlot>,
    withdrawn: Vec<FacilitySlot>,
}

impl AdmissionContext {
    pub fn new(
        colony: impl Into<String>,
        budget: Budget,
        absolute_max_capacity: u32,
        anchor: Position,
    ) -> Self {
        Self {
            colony: colony.into(),
            budget,
            absolute_max_capacity,
            anchor,
            energy_sources: Vec::new(),
            idle: Vec::new(),
            committed: Vec::new(),
            withdrawn: Vec::new(),
        }
    }

    /// Adds the idle members of `slots` to the pool, keeping their order.
    pub fn with_facilities(mut self, slots: impl IntoIterator<Item = FacilitySlot>) -> Self {
        self.idle.extend(
            slots
                .into_iter()
                .filter(|slot| slot.state == FacilityState::Idle),
        );
        self
    }

    pub fn with_energy_sources(mut self, sources: Vec<u32>) -> Self {
        self.energy_sources = sources;
        self
    }

    pub fn idle(&self) -> &[FacilitySlot] {
        &self.idle
    }

    pub fn committed(&self) -> &[FacilitySlot] {
        &self.committed
    }

    /// Facilities pulled from the pool after a failed commit.
    pub fn withdrawn(&self) -> &[FacilitySlot] {
        &self.withdrawn
    }

    /// Nearest idle facility to `affinity`, else the first one in pool order.
    fn select_facility(&self, affinity: Option<Position>) -> Option<usize> {
        if self.idle.is_empty() {
            return None;
        }
        match affinity {
            Some(target) => self
                .idle
                .iter()
                .enumerate()
                .min_by_key(|(_, slot)| range(slot.position, target))
                .map(|(index, _)| index),
            None => Some(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Accepted { facility: FacilityId, name: String },
    RejectedProducerBug,
    RejectedScarcity,
    RejectedProbeFailure(SpawnError),
    CommitFailure(SpawnError),
}

impl RequestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RequestOutcome::Accepted { .. })
    }

    fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            RequestOutcome::Accepted { .. } => None,
            RequestOutcome::RejectedProducerBug => Some(RejectReason::ProducerBug),
            RequestOutcome::RejectedScarcity => Some(RejectReason::Scarcity),
            RequestOutcome::RejectedProbeFailure(_) => Some(RejectReason::ProbeFailure),
            RequestOutcome::CommitFailure(_) => Some(RejectReason::CommitFailure),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub priority: Priority,
    pub role: RoleTag,
    pub cost: u32,
    pub outcome: RequestOutcome,
}

/// Why the pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassHalt {
    QueueExhausted,
    Scarcity,
    NoIdleFacility,
}

impl PassHalt {
    pub fn as_str(self) -> &'static str {
        match self {
            PassHalt::QueueExhausted => "queue_exhausted",
            PassHalt::Scarcity => "scarcity",
            PassHalt::NoIdleFacility => "no_idle_facility",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionReport {
    pub decisions: Vec<AdmissionDecision>,
    pub halt: PassHalt,
    /// Requests never considered because the pass stopped first.
    pub unserved: usize,
}

impl AdmissionReport {
    pub fn accepted(&self) -> impl Iterator<Item = &AdmissionDecision> {
        self.decisions
            .iter()
            .filter(|decision| decision.outcome.is_accepted())
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted().count()
    }

    pub fn rejected_count(&self) -> usize {
        self.decisions.len() - self.accepted_count()
    }
}

/// Runs one admission pass over `queue`.
///
/// Each committed unit is named, recorded in `registry` and reported to
/// `telemetry`; its facility moves from the idle pool to `ctx.committed()`.
pub fn run_admission(
    ctx: &mut AdmissionContext,
    queue: RequestQueue,
    api: &mut dyn SpawnApi,
    ids: &mut UnitIdAllocator,
    registry: &mut SpawnRegistry,
    telemetry: &mut dyn TelemetrySink,
) -> AdmissionReport {
    let mut decisions = Vec::with_capacity(queue.len());
    let mut halt = PassHalt::QueueExhausted;
    let mut stalled = 0;
    let mut pending = queue.into_iter();

    for request in pending.by_ref() {
        if request.cost > ctx.absolute_max_capacity {
            error!(
                target: "colony::spawning",
                role = %request.role(),
                cost = request.cost,
                capacity = ctx.absolute_max_capacity,
                "spawn.rejected.producer_bug"
            );
            decisions.push(reject(
                &request,
                RequestOutcome::RejectedProducerBug,
                ctx.budget,
                telemetry,
            ));
            continue;
        }

        if !ctx.budget.can_afford(request.cost) {
            warn!(
                target: "colony::spawning",
                role = %request.role(),
                cost = request.cost,
                available = ctx.budget.available,
                "spawn.rejected.scarcity"
            );
            decisions.push(reject(
                &request,
                RequestOutcome::RejectedScarcity,
                ctx.budget,
                telemetry,
            ));
            halt = PassHalt::Scarcity;
            break;
        }

        let Some(index) = ctx.select_facility(request.affinity) else {
            stalled = 1;
            halt = PassHalt::NoIdleFacility;
            break;
        };
        let slot = ctx.idle[index].clone();

        let name = unit_name(request.role(), &ctx.colony, ids.next_id());
        let directions = exit_directions(slot.position, ctx.anchor);
        let first_step = directions
            .first()
            .and_then(|dir| slot.position.step(*dir));
        let options = SpawnOptions {
            affinity: request.affinity,
            energy_sources: ctx.energy_sources.clone(),
            directions,
            payload: unit_payload(&request),
        };
        let order = SpawnOrder {
            facility: slot.id,
            name: &name,
            body: &request.body,
            cost: request.cost,
            options: &options,
        };

        if let Err(err) = api.probe(&order) {
            if err.is_scarcity() {
                warn!(
                    target: "colony::spawning",
                    role = %request.role(),
                    cost = request.cost,
                    facility = %slot.id,
                    error = %err,
                    "spawn.rejected.scarcity"
                );
                decisions.push(reject(
                    &request,
                    RequestOutcome::RejectedScarcity,
                    ctx.budget,
                    telemetry,
                ));
                halt = PassHalt::Scarcity;
                break;
            }
            error!(
                target: "colony::spawning",
                role = %request.role(),
                cost = request.cost,
                facility = %slot.id,
                error = %err,
                "spawn.rejected.probe_failure"
            );
            decisions.push(reject(
                &request,
                RequestOutcome::RejectedProbeFailure(err),
                ctx.budget,
                telemetry,
            ));
            continue;
        }

        if let Err(err) = api.commit(&order) {
            error!(
                target: "colony::spawning",
                severity = "consistency",
                role = %request.role(),
                cost = request.cost,
                facility = %slot.id,
                error = %err,
                "spawn.commit_failed"
            );
            decisions.push(reject(
                &request,
                RequestOutcome::CommitFailure(err),
                ctx.budget,
                telemetry,
            ));
            // The facility's real state is unknown now; keep it out of this pass.
            ctx.withdrawn.push(ctx.idle.remove(index));
            if ctx.idle.is_empty() {
                halt = PassHalt::NoIdleFacility;
                break;
            }
            continue;
        }

        ctx.budget.spend(request.cost);
        let mut slot = ctx.idle.remove(index);
        slot.state = FacilityState::Committed;
        ctx.committed.push(slot.clone());

        info!(
            target: "colony::spawning",
            role = %request.role(),
            name = %name,
            cost = request.cost,
            tier = request.tier,
            facility = %slot.id,
            remaining_budget = ctx.budget.available,
            "spawn.committed"
        );
        telemetry.record(SpawnTelemetryEvent::Committed {
            role: request.role().clone(),
            cost: request.cost,
        });
        decisions.push(AdmissionDecision {
            priority: request.priority,
            role: request.role().clone(),
            cost: request.cost,
            outcome: RequestOutcome::Accepted {
                facility: slot.id,
                name: name.clone(),
            },
        });
        let SpawnOptions {
            directions,
            payload,
            ..
        } = options;
        registry.record_commit(SpawnRecord {
            facility: slot.id,
            name,
            role: request.role().clone(),
            priority: request.priority,
            tier: request.tier,
            body: request.body,
            cost: request.cost,
            payload,
            directions,
            first_step,
        });

        if ctx.idle.is_empty() {
            halt = PassHalt::NoIdleFacility;
            break;
        }
    }

    let unserved = stalled + pending.count();
    if halt == PassHalt::NoIdleFacility && unserved == 0 {
        halt = PassHalt::QueueExhausted;
    }

    let report = AdmissionReport {
        decisions,
        halt,
        unserved,
    };
    debug!(
        target: "colony::spawning",
        halt = halt.as_str(),
        accepted = report.accepted_count(),
        rejected = report.rejected_count(),
        unserved,
        remaining_budget = ctx.budget.available,
        "admission.finished"
    );
    report
}

fn reject(
    request: &ComposedRequest,
    outcome: RequestOutcome,
    budget: Budget,
    telemetry: &mut dyn TelemetrySink,
) -> AdmissionDecision {
    if let Some(reason) = outcome.reject_reason() {
        telemetry.record(SpawnTelemetryEvent::Rejected {
            role: request.role().clone(),
            reason,
            attempted_cost: request.cost,
            available_budget: budget.available,
        });
    }
    AdmissionDecision {
        priority: request.priority,
        role: request.role().clone(),
        cost: request.cost,
        outcome,
    }
}

/// Payload stamped with the body's cost and fixed prefix for the unit's memory.
fn unit_payload(request: &ComposedRequest) -> RequestPayload {
    let mut payload = request.payload.clone();
    payload.memory.insert("cost".to_string(), json!(request.cost));
    payload
        .memory
        .insert("default_parts".to_string(), json!(request.default_parts));
    payload
}
