use bevy::prelude::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use spawn_runtime::RoleTag;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    ProducerBug,
    Scarcity,
    ProbeFailure,
    CommitFailure,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::ProducerBug => "producer_bug",
            RejectReason::Scarcity => "scarcity",
            RejectReason::ProbeFailure => "probe_failure",
            RejectReason::CommitFailure => "commit_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SpawnTelemetryEvent {
    Committed {
        role: RoleTag,
        cost: u32,
    },
    Rejected {
        role: RoleTag,
        reason: RejectReason,
        attempted_cost: u32,
        available_budget: u32,
    },
}

pub trait TelemetrySink {
    fn record(&mut self, event: SpawnTelemetryEvent);
}

impl TelemetrySink for Vec<SpawnTelemetryEvent> {
    fn record(&mut self, event: SpawnTelemetryEvent) {
        self.push(event);
    }
}

/// Running totals since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnStats {
    /// Energy spent on committed units.
    pub energy_spent: u64,
    pub commits: u64,
    pub producer_bugs: u64,
    pub scarcity: u64,
    pub probe_failures: u64,
    pub commit_failures: u64,
}

impl SpawnStats {
    pub fn rejections(&self) -> u64 {
        self.producer_bugs + self.scarcity + self.probe_failures + self.commit_failures
    }

    fn count(&mut self, event: &SpawnTelemetryEvent) {
        match event {
            SpawnTelemetryEvent::Committed { cost, .. } => {
                self.commits += 1;
                self.energy_spent += u64::from(*cost);
            }
            SpawnTelemetryEvent::Rejected { reason, .. } => match reason {
                RejectReason::ProducerBug => self.producer_bugs += 1,
                RejectReason::Scarcity => self.scarcity += 1,
                RejectReason::ProbeFailure => self.probe_failures += 1,
                RejectReason::CommitFailure => self.commit_failures += 1,
            },
        }
    }
}

/// Telemetry resource: the current cycle's events plus running stats, with an
/// optional channel to an external consumer.
#[derive(Resource, Default)]
pub struct SpawnTelemetry {
    events: Vec<SpawnTelemetryEvent>,
    stats: SpawnStats,
    forward: Option<Sender<SpawnTelemetryEvent>>,
}

impl SpawnTelemetry {
    pub fn forward_to(&mut self, sender: Sender<SpawnTelemetryEvent>) {
        self.forward = Some(sender);
    }

    /// Opens an unbounded forwarding channel and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<SpawnTelemetryEvent> {
        let (sender, receiver) = unbounded();
        self.forward_to(sender);
        receiver
    }

    pub fn is_forwarding(&self) -> bool {
        self.forward.is_some()
    }

    pub fn begin_cycle(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[SpawnTelemetryEvent] {
        &self.events
    }

    pub fn stats(&self) -> &SpawnStats {
        &self.stats
    }
}

impl TelemetrySink for SpawnTelemetry {
    fn record(&mut self, event: SpawnTelemetryEvent) {
        self.stats.count(&event);
        if let Some(sender) = &self.forward {
            if sender.send(event.clone()).is_err() {
                warn!(
                    target: "colony::spawning",
                    "telemetry.forward.disconnected"
                );
                self.forward = None;
            }
        }
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(reason: RejectReason) -> SpawnTelemetryEvent {
        SpawnTelemetryEvent::Rejected {
            role: RoleTag::new("builder"),
            reason,
            attempted_cost: 400,
            available_budget: 120,
        }
    }

    #[test]
    fn stats_accumulate_across_cycles() {
        let mut telemetry = SpawnTelemetry::default();
        telemetry.record(SpawnTelemetryEvent::Committed {
            role: RoleTag::new("harvester"),
            cost: 250,
        });
        telemetry.record(rejected(RejectReason::Scarcity));
        telemetry.begin_cycle();
        telemetry.record(SpawnTelemetryEvent::Committed {
            role: RoleTag::new("hauler"),
            cost: 300,
        });
        telemetry.record(rejected(RejectReason::ProducerBug));

        assert_eq!(telemetry.events().len(), 2);
        let stats = telemetry.stats();
        assert_eq!(stats.commits, 2);
        assert_eq!(stats.energy_spent, 550);
        assert_eq!(stats.scarcity, 1);
        assert_eq!(stats.producer_bugs, 1);
        assert_eq!(stats.rejections(), 2);
    }

    #[test]
    fn forwards_events_to_subscriber() {
        let mut telemetry = SpawnTelemetry::default();
        let receiver = telemetry.subscribe();
        telemetry.record(rejected(RejectReason::ProbeFailure));
        let forwarded = receiver.try_recv().expect("event forwarded");
        assert_eq!(forwarded, rejected(RejectReason::ProbeFailure));
    }

    #[test]
    fn dropped_subscriber_disables_forwarding() {
        let mut telemetry = SpawnTelemetry::default();
        drop(telemetry.subscribe());
        telemetry.record(rejected(RejectReason::Scarcity));
        assert!(!telemetry.is_forwarding());
        assert_eq!(telemetry.events().len(), 1);
    }

    #[test]
    fn events_serialize_with_event_tag() {
        let json = serde_json::to_value(rejected(RejectReason::CommitFailure))
            .expect("event serializes");
        assert_eq!(json["event"], "rejected");
        assert_eq!(json["reason"], "commit_failure");
        assert_eq!(json["available_budget"], 120);
    }
}
