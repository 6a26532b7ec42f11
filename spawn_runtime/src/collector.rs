use tracing::debug;

use crate::composer::{compose, layout_by_priority};
use crate::parts::CostCatalog;
use crate::request::{CompositionSpec, CompositionStrategy, RequestQueue};

/// Colony facts a producer may consult when deciding what to ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerContext {
    pub cycle: u64,
    pub energy_available: u32,
    pub energy_capacity: u32,
    /// The colony has lost its core economy roles and must rebuild them from
    /// whatever energy is currently on hand.
    pub bootstrapping: bool,
}

/// Source of composition specs, typically one per worker role.
pub trait RequestProducer {
    fn name(&self) -> &str;

    fn produce(&self, ctx: &ProducerContext) -> Vec<CompositionSpec>;
}

/// Gathers one cycle's specs from every producer.
///
/// The collector only merges: each spec keeps its declared priority, and specs
/// with equal priority stay in the order they were pushed.
#[derive(Debug, Default)]
pub struct RequestCollector {
    specs: Vec<CompositionSpec>,
}

impl RequestCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<'a, I>(producers: I, ctx: &ProducerContext) -> Self
    where
        I: IntoIterator<Item = &'a dyn RequestProducer>,
    {
        let mut collector = Self::new();
        for producer in producers {
            collector.collect_from(producer, ctx);
        }
        collector
    }

    pub fn collect_from(
        &mut self,
        producer: &dyn RequestProducer,
        ctx: &ProducerContext,
    ) -> usize {
        let produced = producer.produce(ctx);
        let count = produced.len();
        debug!(
            target: "colony::spawning",
            producer = producer.name(),
            cycle = ctx.cycle,
            specs = count,
            "collector.produced"
        );
        self.specs.extend(produced);
        count
    }

    pub fn push(&mut self, spec: CompositionSpec) {
        self.specs.push(spec);
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn into_sorted(mut self) -> Vec<CompositionSpec> {
        self.specs.sort_by_key(|spec| spec.priority);
        self.specs
    }
}

/// Cost ceiling bodies are composed against this cycle.
///
/// A bootstrapping colony composes against the energy it has right now, so the
/// first replacement workers are affordable immediately; otherwise bodies are
/// sized for the full creation capacity.
pub fn composition_ceiling(ctx: &ProducerContext) -> u32 {
    if ctx.bootstrapping {
        ctx.energy_available.min(ctx.energy_capacity)
    } else {
        ctx.energy_capacity
    }
}

/// Composes every spec and queues the results. Fill bodies are reordered with
/// [`layout_by_priority`]; interleaved bodies keep the order they were built in.
pub fn compose_queue<I>(specs: I, ceiling: u32, catalog: &CostCatalog) -> RequestQueue
where
    I: IntoIterator<Item = CompositionSpec>,
{
    let mut requests = Vec::new();
    for spec in specs {
        let fill = spec.strategy == CompositionStrategy::PriorityFill;
        for mut request in compose(&spec, ceiling, catalog) {
            if fill {
                request.body = layout_by_priority(&request.body);
            }
            requests.push(request);
        }
    }
    RequestQueue::from_requests(requests)
}
