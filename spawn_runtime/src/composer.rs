//! Body composition: turning a [`CompositionSpec`] into concrete, cost-bounded
//! bodies.
//!
//! Two layouts are supported and selected by [`CompositionStrategy`]:
//!
//! * [`PriorityFill`] lays down the composition's fixed prefix and then cycles through
//!   the extra-part pattern until the quota, the cost ceiling or the body length
//!   cap stops it. Bodies clipped by the ceiling or the length cap are trimmed
//!   back towards `min_cost`, returning the removed parts to the quota.
//!   [`layout_by_priority`] reorders these bodies before they are queued.
//! * [`RatioInterleave`] lays down two part categories and spreads a support
//!   category evenly through them.
//!
//! Both layouts share one boundary rule: a part is only appended while
//! `cost + part < ceiling`, and trimming only removes a part while the
//! remaining cost stays strictly above `min_cost`.

use tracing::debug;

use crate::parts::{CostCatalog, PartType, MAX_BODY_PARTS, PART_KINDS};
use crate::request::{ComposedRequest, CompositionSpec, CompositionStrategy, InterleaveCounts};

/// A body layout algorithm.
pub trait BodyComposer: Sync {
    fn compose(
        &self,
        spec: &CompositionSpec,
        ceiling: u32,
        catalog: &CostCatalog,
    ) -> Vec<ComposedRequest>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityFill;

#[derive(Debug, Clone, Copy, Default)]
pub struct RatioInterleave;

static PRIORITY_FILL: PriorityFill = PriorityFill;
static RATIO_INTERLEAVE: RatioInterleave = RatioInterleave;

pub fn composer_for(strategy: &CompositionStrategy) -> &'static dyn BodyComposer {
    match strategy {
        CompositionStrategy::PriorityFill => &PRIORITY_FILL,
        CompositionStrategy::RatioInterleave(_) => &RATIO_INTERLEAVE,
    }
}

/// Compose every body `spec` asks for under `ceiling`.
///
/// A spec whose `min_cost` exceeds the ceiling yields nothing.
pub fn compose(
    spec: &CompositionSpec,
    ceiling: u32,
    catalog: &CostCatalog,
) -> Vec<ComposedRequest> {
    if ceiling < spec.min_cost {
        debug!(
            target: "colony::spawning",
            role = %spec.role(),
            ceiling,
            min_cost = spec.min_cost,
            "compose.skipped=below_min_cost"
        );
        return Vec::new();
    }
    composer_for(&spec.strategy).compose(spec, ceiling, catalog)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillStop {
    Quota,
    Ceiling,
    Length,
}

#[derive(Debug, Default)]
struct BodyDraft {
    body: Vec<PartType>,
    cost: u32,
    default_len: usize,
    extras: usize,
}

impl BodyDraft {
    fn fits(&self, part_cost: u32, ceiling: u32) -> bool {
        self.body.len() < MAX_BODY_PARTS
            && self
                .cost
                .checked_add(part_cost)
                .is_some_and(|total| total < ceiling)
    }

    fn push(&mut self, part: PartType, part_cost: u32) {
        self.body.push(part);
        self.cost += part_cost;
    }

    fn into_request(self, spec: &CompositionSpec, tier: u32) -> Option<ComposedRequest> {
        if self.body.is_empty() || self.cost < spec.min_cost {
            return None;
        }
        debug!(
            target: "colony::spawning",
            role = %spec.role(),
            parts = self.body.len(),
            cost = self.cost,
            tier,
            strategy = spec.strategy.as_str(),
            "compose.body"
        );
        let default_parts = self.body[..self.default_len].to_vec();
        Some(ComposedRequest {
            priority: spec.priority,
            body: self.body,
            tier,
            cost: self.cost,
            default_parts,
            affinity: spec.affinity,
            payload: spec.payload.clone(),
        })
    }
}

impl PriorityFill {
    /// Build one body, drawing extra parts from `quota`.
    fn fill_body(
        spec: &CompositionSpec,
        ceiling: u32,
        catalog: &CostCatalog,
        quota: &mut u32,
    ) -> BodyDraft {
        let mut draft = BodyDraft::default();

        for part in &spec.default_parts {
            let part_cost = catalog.cost(*part);
            if !draft.fits(part_cost, ceiling) {
                break;
            }
            draft.push(*part, part_cost);
        }
        draft.default_len = draft.body.len();

        if spec.extra_parts.is_empty() {
            return draft;
        }

        let mut index = 0;
        let stop = loop {
            if *quota == 0 {
                break FillStop::Quota;
            }
            if draft.body.len() >= MAX_BODY_PARTS {
                break FillStop::Length;
            }
            let part = spec.extra_parts[index];
            let part_cost = catalog.cost(part);
            if !draft.fits(part_cost, ceiling) {
                break FillStop::Ceiling;
            }
            draft.push(part, part_cost);
            draft.extras += 1;
            *quota -= 1;
            index = (index + 1) % spec.extra_parts.len();
        };

        if stop != FillStop::Quota {
            Self::trim(&mut draft, spec.min_cost, catalog, quota);
        }
        draft
    }

    fn trim(draft: &mut BodyDraft, min_cost: u32, catalog: &CostCatalog, quota: &mut u32) {
        while draft.extras > 0 {
            let Some(last) = draft.body.last().copied() else {
                break;
            };
            let last_cost = catalog.cost(last);
            if draft.cost - last_cost <= min_cost {
                break;
            }
            draft.body.pop();
            draft.cost -= last_cost;
            draft.extras -= 1;
            *quota += 1;
        }
    }

    /// Counts what survived trimming, so a trimmed pass no longer adds a tier.
    fn tier(spec: &CompositionSpec, draft: &BodyDraft) -> u32 {
        let prefix = u32::from(draft.default_len > 0);
        let passes = if spec.extra_parts.is_empty() {
            0
        } else {
            (draft.extras / spec.extra_parts.len()) as u32
        };
        prefix + passes
    }

    fn finish(spec: &CompositionSpec, draft: BodyDraft) -> Option<ComposedRequest> {
        let tier = Self::tier(spec, &draft);
        draft.into_request(spec, tier)
    }

    fn fill_quota(spec: &CompositionSpec) -> u32 {
        let wanted = spec.default_parts.len() as u64
            + spec.extra_parts.len() as u64 * u64::from(spec.parts_multiplier);
        wanted.min(MAX_BODY_PARTS as u64) as u32
    }
}

impl BodyComposer for PriorityFill {
    fn compose(
        &self,
        spec: &CompositionSpec,
        ceiling: u32,
        catalog: &CostCatalog,
    ) -> Vec<ComposedRequest> {
        let mut composed = Vec::new();

        if let Some(count) = spec.min_count {
            for _ in 0..count {
                let mut quota = Self::fill_quota(spec);
                let draft = Self::fill_body(spec, ceiling, catalog, &mut quota);
                match Self::finish(spec, draft) {
                    Some(request) => composed.push(request),
                    // Every instance is built from identical inputs.
                    None => break,
                }
            }
            return composed;
        }

        let wanted = spec.extra_parts.len() as u64 * u64::from(spec.parts_multiplier);
        let mut shared_quota = wanted.min(u64::from(u32::MAX)) as u32;
        while shared_quota > 0 {
            let draft = Self::fill_body(spec, ceiling, catalog, &mut shared_quota);
            let stalled = draft.extras == 0;
            match Self::finish(spec, draft) {
                Some(request) => composed.push(request),
                None => break,
            }
            // Nothing was drawn from the quota, so another body would be identical.
            if stalled {
                debug!(
                    target: "colony::spawning",
                    role = %spec.role(),
                    remaining = shared_quota,
                    "compose.stalled"
                );
                break;
            }
        }
        composed
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    All,
    FirstHalf,
    SecondHalf,
    /// Every instance but one up front, the last one in the trailing block.
    LastAtEnd,
}

/// Part types in front-to-back order. Tough and attack parts appear twice,
/// split around the utility parts.
const LAYOUT: [(PartType, Placement); 10] = [
    (PartType::Tough, Placement::FirstHalf),
    (PartType::Claim, Placement::LastAtEnd),
    (PartType::Attack, Placement::FirstHalf),
    (PartType::RangedAttack, Placement::All),
    (PartType::Tough, Placement::SecondHalf),
    (PartType::Work, Placement::LastAtEnd),
    (PartType::Carry, Placement::LastAtEnd),
    (PartType::Move, Placement::LastAtEnd),
    (PartType::Attack, Placement::SecondHalf),
    (PartType::Heal, Placement::LastAtEnd),
];

/// Reorders a body so protective and combat parts lead and one instance of
/// each utility part sits at the back.
pub fn layout_by_priority(body: &[PartType]) -> Vec<PartType> {
    let mut counts = [0usize; PART_KINDS];
    for part in body {
        counts[part.index()] += 1;
    }

    let mut laid = Vec::with_capacity(body.len());
    let mut trailing = Vec::new();
    for (part, placement) in LAYOUT {
        let count = counts[part.index()];
        if count == 0 {
            continue;
        }
        let leading = match placement {
            Placement::All => count,
            Placement::FirstHalf => count.div_ceil(2),
            Placement::SecondHalf => count / 2,
            Placement::LastAtEnd => {
                trailing.push(part);
                count - 1
            }
        };
        laid.extend(std::iter::repeat(part).take(leading));
    }
    laid.extend(trailing);
    laid
}

impl RatioInterleave {
    fn ratio(counts: &InterleaveCounts) -> Option<u32> {
        if counts.support.count == 0 {
            return None;
        }
        let primaries = counts.primary.count + counts.secondary.count;
        Some((primaries / counts.support.count).max(1))
    }
}

impl BodyComposer for RatioInterleave {
    fn compose(
        &self,
        spec: &CompositionSpec,
        ceiling: u32,
        catalog: &CostCatalog,
    ) -> Vec<ComposedRequest> {
        let CompositionStrategy::RatioInterleave(counts) = &spec.strategy else {
            return Vec::new();
        };

        let ratio = Self::ratio(counts);
        let support_cost = catalog.cost(counts.support.part);
        let mut draft = BodyDraft::default();
        let mut placed = 0u32;
        let mut support_placed = 0u32;

        'layout: for category in [counts.primary, counts.secondary] {
            let part_cost = catalog.cost(category.part);
            for _ in 0..category.count {
                if !draft.fits(part_cost, ceiling) {
                    break 'layout;
                }
                draft.push(category.part, part_cost);
                placed += 1;

                let Some(ratio) = ratio else {
                    continue;
                };
                if support_placed < counts.support.count && placed % ratio == 0 {
                    if !draft.fits(support_cost, ceiling) {
                        break 'layout;
                    }
                    draft.push(counts.support.part, support_cost);
                    support_placed += 1;
                }
            }
        }

        let tier = match ratio {
            Some(_) => support_placed,
            None => u32::from(placed > 0),
        };
        draft.into_request(spec, tier).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::{body_cost, MAX_PART_COST};
    use crate::request::{PartCount, Priority, RequestPayload};

    use PartType::{Carry, Move, Work};

    fn spec(default_parts: Vec<PartType>, extra_parts: Vec<PartType>) -> CompositionSpec {
        let mut spec = CompositionSpec::new(Priority(1), RequestPayload::new("worker"));
        spec.default_parts = default_parts;
        spec.extra_parts = extra_parts;
        spec
    }

    /// Catalog where `move` costs 50 and `work` 100, used as parts A and B.
    fn catalog() -> CostCatalog {
        CostCatalog::default()
    }

    #[test]
    fn fill_stops_before_reaching_ceiling() {
        let mut spec = spec(vec![Move], vec![Work, Work]);
        spec.min_count = Some(1);
        spec.min_cost = 100;

        let composed = compose(&spec, 250, &catalog());
        assert_eq!(composed.len(), 1);
        let body = &composed[0];
        assert_eq!(body.body, vec![Move, Work]);
        assert_eq!(body.cost, 150);
        assert_eq!(body.tier, 1);
        assert_eq!(body.default_parts, vec![Move]);
    }

    #[test]
    fn ceiling_below_min_cost_yields_nothing() {
        let mut spec = spec(vec![Move], vec![Work]);
        spec.min_cost = 300;
        spec.min_count = Some(2);
        assert!(compose(&spec, 250, &catalog()).is_empty());
    }

    #[test]
    fn trimming_stops_above_min_cost() {
        let mut spec = spec(vec![], vec![Work]);
        spec.parts_multiplier = 10;
        spec.min_count = Some(1);
        spec.min_cost = 250;

        // Work parts land at 100..=500, the sixth would reach 600.
        let composed = compose(&spec, 600, &catalog());
        assert_eq!(composed.len(), 1);
        // Trimming removes down to 300; removing another would reach 200 <= 250.
        assert_eq!(composed[0].cost, 300);
        assert_eq!(composed[0].body.len(), 3);
        // The two trimmed passes no longer count towards the tier.
        assert_eq!(composed[0].tier, 3);
    }

    #[test]
    fn quota_exhaustion_skips_trimming() {
        let mut spec = spec(vec![Carry], vec![Work, Move]);
        spec.parts_multiplier = 2;
        spec.min_count = Some(1);
        spec.min_cost = 100;

        let composed = compose(&spec, 10_000, &catalog());
        assert_eq!(composed.len(), 1);
        let body = &composed[0];
        // Quota is min(50, 1 + 2 * 2) = 5 extra parts.
        assert_eq!(body.body, vec![Carry, Work, Move, Work, Move, Work]);
        assert_eq!(body.default_parts, vec![Carry]);
        assert_eq!(body.cost, 50 + 100 * 3 + 50 * 2);
        assert_eq!(body.tier, 3);
    }

    #[test]
    fn min_count_produces_exact_instances() {
        let mut spec = spec(vec![Carry], vec![Work, Move, Work, Work]);
        spec.parts_multiplier = 2;
        spec.min_count = Some(3);
        spec.min_cost = 200;

        let composed = compose(&spec, 2_000, &catalog());
        assert_eq!(composed.len(), 3);
        for request in &composed {
            assert!(request.cost < 2_000);
            assert!(request.cost >= 200);
            // Quota is 1 + 4 * 2, so nine extra parts follow the prefix.
            assert_eq!(request.body.len(), 10);
        }
    }

    #[test]
    fn shared_quota_spreads_across_bodies() {
        let mut spec = spec(vec![], vec![Work]);
        spec.parts_multiplier = 12;
        spec.min_cost = 200;

        // Each body is clipped at 500 and trimmed back to 300.
        let composed = compose(&spec, 550, &catalog());
        let total: usize = composed.iter().map(|r| r.body.len()).sum();
        assert_eq!(total, 12);
        assert_eq!(composed.len(), 4);
        assert!(composed.iter().all(|r| r.cost == 300));
    }

    #[test]
    fn shared_quota_allows_short_final_body() {
        let mut spec = spec(vec![], vec![Work]);
        spec.parts_multiplier = 7;
        spec.min_cost = 100;

        let composed = compose(&spec, 10_000, &catalog());
        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].body.len(), 7);
    }

    #[test]
    fn shared_quota_emits_prefix_when_no_extra_fits() {
        let mut spec = spec(vec![Carry, Carry], vec![Work]);
        spec.parts_multiplier = 3;

        // Defaults cost 100, a work part would reach the ceiling.
        let composed = compose(&spec, 150, &catalog());
        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].body, vec![Carry, Carry]);
        assert_eq!(composed[0].cost, 100);
        assert_eq!(composed[0].tier, 1);
    }

    #[test]
    fn shared_quota_keeps_body_trimmed_back_to_prefix() {
        let mut shared = spec(vec![Carry, Carry], vec![Work]);
        shared.parts_multiplier = 3;
        let mut counted = shared.clone();
        counted.min_count = Some(1);

        // Two work parts fit under 350 and are both trimmed away again.
        let from_shared = compose(&shared, 350, &catalog());
        let from_counted = compose(&counted, 350, &catalog());
        assert_eq!(from_shared.len(), 1);
        assert_eq!(from_shared[0].body, vec![Carry, Carry]);
        assert_eq!(from_shared[0].cost, 100);
        assert_eq!(from_shared[0].tier, 1);
        assert_eq!(from_shared, from_counted);
    }

    #[test]
    fn expensive_catalog_does_not_overflow() {
        let catalog =
            CostCatalog::from_entries(PartType::ALL.map(|part| (part, MAX_PART_COST))).unwrap();
        let mut spec = spec(vec![], vec![Work]);
        spec.parts_multiplier = 80;
        spec.min_count = Some(1);

        let composed = compose(&spec, u32::MAX, &catalog);
        assert_eq!(composed.len(), 1);
        assert!(composed[0].cost < u32::MAX);
        assert!(composed[0].body.len() <= MAX_BODY_PARTS);

        let mut draft = BodyDraft::default();
        draft.push(Work, u32::MAX - 10);
        assert!(!draft.fits(MAX_PART_COST, u32::MAX));
    }

    #[test]
    fn layout_leads_with_combat_parts_and_trails_utility_parts() {
        use PartType::{Attack, Heal, RangedAttack, Tough};

        let body = [
            Move, Work, Carry, Tough, Tough, Tough, Attack, Attack, Heal, RangedAttack, Work, Move,
        ];
        assert_eq!(
            layout_by_priority(&body),
            vec![
                Tough, Tough, Attack, RangedAttack, Tough, Work, Move, Attack, Work, Carry, Move,
                Heal,
            ]
        );
        assert!(layout_by_priority(&[]).is_empty());
    }


    #[test]
    fn bodies_never_exceed_length_cap() {
        let mut spec = spec(vec![], vec![Move]);
        spec.parts_multiplier = 80;
        spec.min_cost = 50;

        let composed = compose(&spec, 1_000_000, &catalog());
        assert!(!composed.is_empty());
        for request in &composed {
            assert!(request.body.len() <= MAX_BODY_PARTS);
            assert_eq!(request.cost, body_cost(&request.body, &catalog()));
        }
        let total: usize = composed.iter().map(|r| r.body.len()).sum();
        assert_eq!(total, 80);
    }

    #[test]
    fn bodies_stay_under_ceiling_across_ceilings() {
        let mut spec = spec(vec![Carry, Move], vec![Work, Work, Move]);
        spec.parts_multiplier = 5;
        spec.min_cost = 150;
        for ceiling in (150..2_000).step_by(37) {
            for request in compose(&spec, ceiling, &catalog()) {
                assert!(request.cost < ceiling, "ceiling {ceiling}");
                assert!(request.cost >= spec.min_cost);
                assert!(request.body.len() <= MAX_BODY_PARTS);
            }
        }
    }

    fn hauler(carry: u32, work: u32, moves: u32) -> CompositionSpec {
        let mut spec = CompositionSpec::new(Priority(2), RequestPayload::new("hauler"));
        spec.strategy = CompositionStrategy::RatioInterleave(InterleaveCounts {
            primary: PartCount::new(Carry, carry),
            secondary: PartCount::new(Work, work),
            support: PartCount::new(Move, moves),
        });
        spec
    }

    #[test]
    fn interleave_spreads_support_parts() {
        let composed = compose(&hauler(4, 0, 2), 10_000, &catalog());
        assert_eq!(composed.len(), 1);
        assert_eq!(
            composed[0].body,
            vec![Carry, Carry, Move, Carry, Carry, Move]
        );
        assert_eq!(composed[0].cost, 300);
        assert_eq!(composed[0].tier, 2);
    }

    #[test]
    fn interleave_continues_counter_into_second_category() {
        let composed = compose(&hauler(3, 3, 3), 10_000, &catalog());
        assert_eq!(
            composed[0].body,
            vec![Carry, Carry, Move, Carry, Work, Move, Work, Work, Move]
        );
    }

    #[test]
    fn interleave_ignores_multiplier_and_count() {
        let mut spec = hauler(2, 0, 1);
        spec.min_count = Some(5);
        spec.parts_multiplier = 9;
        let composed = compose(&spec, 10_000, &catalog());
        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].body, vec![Carry, Carry, Move]);
    }

    #[test]
    fn interleave_stops_at_ceiling() {
        let composed = compose(&hauler(10, 0, 5), 260, &catalog());
        assert_eq!(composed.len(), 1);
        // C C M C C would cost 250, the next move would reach 300.
        assert_eq!(composed[0].body, vec![Carry, Carry, Move, Carry, Carry]);
        assert!(composed[0].cost < 260);
    }

    #[test]
    fn interleave_without_support_lays_primaries_only() {
        let composed = compose(&hauler(2, 1, 0), 10_000, &catalog());
        assert_eq!(composed[0].body, vec![Carry, Carry, Work]);
        assert_eq!(composed[0].tier, 1);
    }

    #[test]
    fn dispatch_follows_strategy_tag() {
        let mut fill = spec(vec![], vec![Carry]);
        fill.parts_multiplier = 2;
        let via_table = composer_for(&fill.strategy).compose(&fill, 10_000, &catalog());
        assert_eq!(via_table, PriorityFill.compose(&fill, 10_000, &catalog()));

        // An interleave composer handed a fill spec has no counts to lay out.
        assert!(RatioInterleave.compose(&fill, 10_000, &catalog()).is_empty());

        let interleave = hauler(1, 0, 1);
        let via_table =
            composer_for(&interleave.strategy).compose(&interleave, 10_000, &catalog());
        assert_eq!(via_table[0].body, vec![Carry, Move]);
    }
}
