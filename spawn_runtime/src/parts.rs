use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on the number of parts a single unit body may carry.
pub const MAX_BODY_PARTS: usize = 50;

/// Highest price a catalog accepts for one part. A full-length body of the
/// most expensive part still fits in a `u32`.
pub const MAX_PART_COST: u32 = u32::MAX / 64;

pub(crate) const PART_KINDS: usize = 8;

/// Discrete body part a unit can be composed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    Move,
    Work,
    Carry,
    Attack,
    RangedAttack,
    Tough,
    Heal,
    Claim,
}

impl PartType {
    pub const ALL: [PartType; PART_KINDS] = [
        PartType::Move,
        PartType::Work,
        PartType::Carry,
        PartType::Attack,
        PartType::RangedAttack,
        PartType::Tough,
        PartType::Heal,
        PartType::Claim,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PartType::Move => "move",
            PartType::Work => "work",
            PartType::Carry => "carry",
            PartType::Attack => "attack",
            PartType::RangedAttack => "ranged_attack",
            PartType::Tough => "tough",
            PartType::Heal => "heal",
            PartType::Claim => "claim",
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("cost catalog has no entry for part `{0}`")]
    MissingPart(PartType),
    #[error("cost catalog entry for part `{0}` must be non-zero")]
    ZeroCost(PartType),
    #[error("cost catalog entry for part `{part}` is {cost}, above the limit of {max}")]
    CostTooHigh { part: PartType, cost: u32, max: u32 },
}

/// Read-only price list for body parts.
///
/// A catalog always covers every [`PartType`]; incomplete tables are rejected
/// when the catalog is built, so lookups never fail afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<PartType, u32>",
    into = "BTreeMap<PartType, u32>"
)]
pub struct CostCatalog {
    costs: [u32; PART_KINDS],
}

impl CostCatalog {
    pub fn from_entries<I>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (PartType, u32)>,
    {
        let mut costs = [None; PART_KINDS];
        for (part, cost) in entries {
            if cost == 0 {
                return Err(CatalogError::ZeroCost(part));
            }
            if cost > MAX_PART_COST {
                return Err(CatalogError::CostTooHigh {
                    part,
                    cost,
                    max: MAX_PART_COST,
                });
            }
            costs[part.index()] = Some(cost);
        }

        let mut resolved = [0; PART_KINDS];
        for part in PartType::ALL {
            resolved[part.index()] = costs[part.index()].ok_or(CatalogError::MissingPart(part))?;
        }
        Ok(Self { costs: resolved })
    }

    #[inline]
    pub fn cost(&self, part: PartType) -> u32 {
        self.costs[part.index()]
    }
}

impl Default for CostCatalog {
    fn default() -> Self {
        Self {
            costs: [50, 100, 50, 80, 150, 10, 250, 600],
        }
    }
}

impl TryFrom<BTreeMap<PartType, u32>> for CostCatalog {
    type Error = CatalogError;

    fn try_from(value: BTreeMap<PartType, u32>) -> Result<Self, Self::Error> {
        CostCatalog::from_entries(value)
    }
}

impl From<CostCatalog> for BTreeMap<PartType, u32> {
    fn from(value: CostCatalog) -> Self {
        PartType::ALL
            .iter()
            .map(|part| (*part, value.cost(*part)))
            .collect()
    }
}

/// Total price of `body`, saturating at `u32::MAX` for oversized bodies.
pub fn body_cost(body: &[PartType], catalog: &CostCatalog) -> u32 {
    body.iter()
        .fold(0u32, |total, part| total.saturating_add(catalog.cost(*part)))
}
