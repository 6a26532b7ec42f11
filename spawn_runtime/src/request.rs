use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::parts::PartType;

/// Spawn urgency. Lower values are more urgent and are admitted first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role label carried through telemetry and unit naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleTag(pub String);

impl RoleTag {
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque data a producer wants attached to the unit it asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub role: RoleTag,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub memory: serde_json::Map<String, serde_json::Value>,
}

impl RequestPayload {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: RoleTag::new(role),
            memory: serde_json::Map::new(),
        }
    }

    pub fn with_memory(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.memory.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartCount {
    pub part: PartType,
    pub count: u32,
}

impl PartCount {
    pub const fn new(part: PartType, count: u32) -> Self {
        Self { part, count }
    }
}

/// Unit counts for the two-category interleaved layout.
///
/// `support` parts are spread evenly through the `primary` and `secondary`
/// runs, e.g. one move part per two carry parts on a hauler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleaveCounts {
    pub primary: PartCount,
    pub secondary: PartCount,
    pub support: PartCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompositionStrategy {
    #[default]
    PriorityFill,
    RatioInterleave(InterleaveCounts),
}

impl CompositionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionStrategy::PriorityFill => "priority_fill",
            CompositionStrategy::RatioInterleave(_) => "ratio_interleave",
        }
    }
}

/// Declarative request from a role producer for one or more unit bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSpec {
    pub priority: Priority,
    #[serde(default)]
    pub default_parts: Vec<PartType>,
    #[serde(default)]
    pub extra_parts: Vec<PartType>,
    #[serde(default = "default_parts_multiplier")]
    pub parts_multiplier: u32,
    /// Exact number of bodies to produce. `None` shares the extra-part quota
    /// across as many bodies as it takes to place all of it.
    #[serde(default)]
    pub min_count: Option<u32>,
    #[serde(default)]
    pub min_cost: u32,
    #[serde(default)]
    pub strategy: CompositionStrategy,
    /// Preferred creation site; the nearest idle facility is chosen.
    #[serde(default)]
    pub affinity: Option<Position>,
    pub payload: RequestPayload,
}

fn default_parts_multiplier() -> u32 {
    1
}

impl CompositionSpec {
    pub fn new(priority: Priority, payload: RequestPayload) -> Self {
        Self {
            priority,
            default_parts: Vec::new(),
            extra_parts: Vec::new(),
            parts_multiplier: default_parts_multiplier(),
            min_count: None,
            min_cost: 0,
            strategy: CompositionStrategy::PriorityFill,
            affinity: None,
            payload,
        }
    }

    pub fn role(&self) -> &RoleTag {
        &self.payload.role
    }
}

/// A concrete, cost-bounded body ready for admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedRequest {
    pub priority: Priority,
    pub body: Vec<PartType>,
    pub tier: u32,
    pub cost: u32,
    /// Parts of the body that came from the fixed `default_parts` prefix.
    pub default_parts: Vec<PartType>,
    pub affinity: Option<Position>,
    pub payload: RequestPayload,
}

impl ComposedRequest {
    pub fn role(&self) -> &RoleTag {
        &self.payload.role
    }
}

/// Composed requests for one cycle, most urgent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestQueue {
    requests: Vec<ComposedRequest>,
}

impl RequestQueue {
    /// Orders `requests` by ascending priority; equal priorities keep their
    /// arrival order.
    pub fn from_requests(mut requests: Vec<ComposedRequest>) -> Self {
        requests.sort_by_key(|request| request.priority);
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComposedRequest> {
        self.requests.iter()
    }
}

impl IntoIterator for RequestQueue {
    type Item = ComposedRequest;
    type IntoIter = std::vec::IntoIter<ComposedRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(priority: i32, role: &str) -> ComposedRequest {
        ComposedRequest {
            priority: Priority(priority),
            body: vec![PartType::Work],
            tier: 1,
            cost: 100,
            default_parts: Vec::new(),
            affinity: None,
            payload: RequestPayload::new(role),
        }
    }

    #[test]
    fn lower_priority_value_is_more_urgent() {
        assert!(Priority(0) < Priority(3));
        assert!(Priority(i32::MIN) < Priority(-100));
    }

    #[test]
    fn queue_is_stable_for_equal_priorities() {
        let queue = RequestQueue::from_requests(vec![
            request(2, "hauler"),
            request(1, "harvester_a"),
            request(2, "builder"),
            request(1, "harvester_b"),
        ]);
        let roles: Vec<_> = queue.iter().map(|r| r.role().as_str().to_string()).collect();
        assert_eq!(roles, ["harvester_a", "harvester_b", "hauler", "builder"]);
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let json = r#"{
            "priority": 3,
            "extra_parts": ["work", "move"],
            "payload": { "role": "upgrader" }
        }"#;
        let spec: CompositionSpec = serde_json::from_str(json).expect("spec parses");
        assert_eq!(spec.priority, Priority(3));
        assert_eq!(spec.parts_multiplier, 1);
        assert_eq!(spec.strategy, CompositionStrategy::PriorityFill);
        assert!(spec.min_count.is_none());
        assert_eq!(spec.role().as_str(), "upgrader");
    }

    #[test]
    fn interleave_strategy_deserializes_from_tagged_form() {
        let json = r#"{
            "kind": "ratio_interleave",
            "primary": { "part": "carry", "count": 4 },
            "secondary": { "part": "work", "count": 0 },
            "support": { "part": "move", "count": 2 }
        }"#;
        let strategy: CompositionStrategy = serde_json::from_str(json).expect("strategy parses");
        match strategy {
            CompositionStrategy::RatioInterleave(counts) => {
                assert_eq!(counts.primary, PartCount::new(PartType::Carry, 4));
                assert_eq!(counts.support.count, 2);
            }
            other => panic!("unexpected strategy {other:?}"),
        }
    }
}
