//! Jets and the per-event jet pool
//!
//! The pool is filled by an upstream jet-selection stage (already sorted,
//! deduplicated and passing kinematic cuts). It only attaches the b-tag
//! decision for the configured working point and exposes read-only views.

use crate::error::ReconError;
use crate::kinematics::FourMomentum;
use crate::ReconResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════════
// B-TAG WORKING POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Discriminator threshold above which a jet counts as b-tagged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BTagWorkingPoint {
    Loose,
    Medium,
    Tight,
    Custom(f64),
}

impl BTagWorkingPoint {
    /// Discriminator threshold for this working point
    pub fn threshold(&self) -> f64 {
        match self {
            BTagWorkingPoint::Loose => 0.0521,
            BTagWorkingPoint::Medium => 0.3033,
            BTagWorkingPoint::Tight => 0.7489,
            BTagWorkingPoint::Custom(t) => *t,
        }
    }

    /// A jet is tagged when its discriminator is strictly above the threshold
    pub fn is_tagged(&self, discriminant: f64) -> bool {
        discriminant > self.threshold()
    }

    /// Validate a custom threshold
    pub fn validate(&self) -> ReconResult<()> {
        let t = self.threshold();
        if !t.is_finite() {
            return Err(ReconError::InvalidWorkingPoint(format!(
                "non-finite threshold {}",
                t
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> String {
        match self {
            BTagWorkingPoint::Loose => "loose".to_string(),
            BTagWorkingPoint::Medium => "medium".to_string(),
            BTagWorkingPoint::Tight => "tight".to_string(),
            BTagWorkingPoint::Custom(t) => format!("custom({})", t),
        }
    }
}

impl Default for BTagWorkingPoint {
    fn default() -> Self {
        BTagWorkingPoint::Medium
    }
}

impl fmt::Display for BTagWorkingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BTagWorkingPoint {
    type Err = ReconError;

    /// Accepts `loose`, `medium`, `tight` (any case) or a bare number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loose" => Ok(BTagWorkingPoint::Loose),
            "medium" => Ok(BTagWorkingPoint::Medium),
            "tight" => Ok(BTagWorkingPoint::Tight),
            other => {
                let wp = other
                    .parse::<f64>()
                    .map(BTagWorkingPoint::Custom)
                    .map_err(|_| ReconError::InvalidWorkingPoint(s.to_string()))?;
                wp.validate()?;
                Ok(wp)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JET
// ═══════════════════════════════════════════════════════════════════════════════

/// Jet as delivered by the jet-selection stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JetInput {
    pub momentum: FourMomentum,
    pub btag_discriminant: f64,
}

/// Reconstructed jet with its b-tag decision
///
/// Immutable once placed in a [`JetPool`]. `index` is the position in the pool
/// and serves as the jet's identity for overlap checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    pub index: usize,
    pub momentum: FourMomentum,
    pub btag_discriminant: f64,
    pub is_btagged: bool,
}

impl Jet {
    pub fn new(
        index: usize,
        momentum: FourMomentum,
        btag_discriminant: f64,
        working_point: BTagWorkingPoint,
    ) -> Self {
        Self {
            index,
            momentum,
            btag_discriminant,
            is_btagged: working_point.is_tagged(btag_discriminant),
        }
    }

    pub fn pt(&self) -> f64 {
        self.momentum.pt()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JET POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// The event's candidate jets
#[derive(Debug, Clone, Default)]
pub struct JetPool {
    jets: Vec<Jet>,
    working_point: BTagWorkingPoint,
}

impl JetPool {
    /// Build a pool, tagging every jet at the given working point
    pub fn new(inputs: &[JetInput], working_point: BTagWorkingPoint) -> Self {
        let jets = inputs
            .iter()
            .enumerate()
            .map(|(i, j)| Jet::new(i, j.momentum, j.btag_discriminant, working_point))
            .collect();
        Self {
            jets,
            working_point,
        }
    }

    pub fn working_point(&self) -> BTagWorkingPoint {
        self.working_point
    }

    /// All jets in input order
    pub fn jets(&self) -> &[Jet] {
        &self.jets
    }

    pub fn get(&self, index: usize) -> Option<&Jet> {
        self.jets.get(index)
    }

    pub fn len(&self) -> usize {
        self.jets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jets.is_empty()
    }

    /// b-tagged jets in input order
    pub fn bjets(&self) -> impl Iterator<Item = &Jet> {
        self.jets.iter().filter(|j| j.is_btagged)
    }

    /// Untagged jets in input order
    pub fn light_jets(&self) -> impl Iterator<Item = &Jet> {
        self.jets.iter().filter(|j| !j.is_btagged)
    }

    pub fn n_btagged(&self) -> usize {
        self.bjets().count()
    }

    /// Jets ordered by descending p_T (stable for equal p_T)
    pub fn sorted_by_pt(&self) -> Vec<&Jet> {
        let mut sorted: Vec<&Jet> = self.jets.iter().collect();
        sorted.sort_by(|a, b| b.pt().total_cmp(&a.pt()));
        sorted
    }

    /// Highest-p_T b-tagged jet
    pub fn leading_bjet(&self) -> Option<&Jet> {
        self.bjets().fold(None, |best: Option<&Jet>, j| match best {
            Some(b) if b.pt() >= j.pt() => Some(b),
            _ => Some(j),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
