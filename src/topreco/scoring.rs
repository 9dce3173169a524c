//! Trijet scoring
//!
//! A scorer turns a [`Trijet`] into a [`TopCandidate`]: it decides which of the
//! three jets plays the b-jet, and attaches a discriminant. Two scorers exist:
//!
//! | Scorer | Discriminant | Better |
//! |--------|--------------|--------|
//! | [`ChiSquareScorer`] | `((m_jj − m_W)/σ_W)² + ((m_jjb − m_t)/σ_t)²` | lower |
//! | [`ClassifierScorer`] | network output | higher |
//!
//! The selector never looks at the raw discriminant. It ranks by
//! [`TopCandidate::cost`], which is the discriminant mapped through
//! [`ScoreOrdering::cost`] so that lower is always better.

use crate::config::ScorerConfig;
use crate::jets::Jet;
use crate::kinematics::FourMomentum;
use crate::topreco::classifier::ClassifierScorer;
use crate::topreco::trijet::Trijet;
use crate::ReconResult;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// TOP CANDIDATE
// ═══════════════════════════════════════════════════════════════════════════════

/// A scored trijet with its b-jet assignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopCandidate {
    /// The underlying triple
    pub trijet: Trijet,
    /// Light-quark jets, descending p_T
    pub light: [Jet; 2],
    /// Jet assigned to the b quark
    pub b: Jet,
    /// Raw scorer output
    pub discriminant: f64,
    /// Ranking key, lower is better regardless of scorer
    pub cost: f64,
    /// Invariant mass of the light pair
    pub dijet_mass: f64,
    /// Invariant mass of all three jets
    pub trijet_mass: f64,
    /// Sum of the three four-momenta
    pub momentum: FourMomentum,
}

impl TopCandidate {
    fn assemble(trijet: &Trijet, b_position: usize, discriminant: f64, cost: f64) -> Self {
        let light = trijet.light_pair(b_position);
        let momentum = trijet.momentum();
        Self {
            trijet: *trijet,
            light,
            b: trijet.jets[b_position],
            discriminant,
            cost,
            dijet_mass: (light[0].momentum + light[1].momentum).mass(),
            trijet_mass: momentum.mass(),
            momentum,
        }
    }

    pub fn indices(&self) -> [usize; 3] {
        self.trijet.indices()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.trijet.contains(index)
    }

    pub fn overlaps(&self, other: &TopCandidate) -> bool {
        self.trijet.overlaps(&other.trijet)
    }

    pub fn has_btag(&self) -> bool {
        self.trijet.has_btag()
    }

    /// Four-momentum of the light-quark pair (the W hypothesis)
    pub fn dijet_momentum(&self) -> FourMomentum {
        self.light[0].momentum + self.light[1].momentum
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCORER INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Which direction of the raw discriminant is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreOrdering {
    LowerIsBetter,
    HigherIsBetter,
}

impl ScoreOrdering {
    /// Map a discriminant onto a lower-is-better ranking key
    ///
    /// Non-finite discriminants rank last in either direction.
    pub fn cost(&self, discriminant: f64) -> f64 {
        if !discriminant.is_finite() {
            return f64::INFINITY;
        }
        match self {
            ScoreOrdering::LowerIsBetter => discriminant,
            ScoreOrdering::HigherIsBetter => -discriminant,
        }
    }
}

/// Pure scoring of a single b-jet assignment inside a triple
pub trait TrijetDiscriminant {
    /// Direction of the raw discriminant
    fn ordering(&self) -> ScoreOrdering;

    /// Discriminant for `trijet` with jet `b_position` as the b-jet
    fn assignment_score(&self, trijet: &Trijet, b_position: usize) -> ReconResult<f64>;

    /// Short name for logs and summaries
    fn name(&self) -> &'static str;

    /// Best assignment over [`Trijet::b_positions`]
    ///
    /// Earlier positions win ties.
    fn score(&self, trijet: &Trijet) -> ReconResult<TopCandidate> {
        let ordering = self.ordering();
        let mut best: Option<(usize, f64, f64)> = None;
        for b_position in trijet.b_positions() {
            let discriminant = self.assignment_score(trijet, b_position)?;
            let cost = ordering.cost(discriminant);
            let better = match best {
                None => true,
                Some((_, _, best_cost)) => cost.total_cmp(&best_cost).is_lt(),
            };
            if better {
                best = Some((b_position, discriminant, cost));
            }
        }
        let (b_position, discriminant, cost) = best.unwrap_or((0, f64::NAN, f64::INFINITY));
        Ok(TopCandidate::assemble(trijet, b_position, discriminant, cost))
    }

    /// Score every triple, keeping enumeration order
    fn score_all(&self, trijets: &[Trijet]) -> ReconResult<Vec<TopCandidate>> {
        trijets.iter().map(|t| self.score(t)).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHI-SQUARE SCORER
// ═══════════════════════════════════════════════════════════════════════════════

/// Mass-constrained χ² against W and top mass hypotheses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareScorer {
    pub w_mass: f64,
    pub w_width: f64,
    pub top_mass: f64,
    pub top_width: f64,
}

impl ChiSquareScorer {
    pub fn new(w_mass: f64, w_width: f64, top_mass: f64, top_width: f64) -> Self {
        Self {
            w_mass,
            w_width,
            top_mass,
            top_width,
        }
    }

    /// χ² of a (dijet, trijet) mass pair
    pub fn chi_square(&self, dijet_mass: f64, trijet_mass: f64) -> f64 {
        ((dijet_mass - self.w_mass) / self.w_width).powi(2)
            + ((trijet_mass - self.top_mass) / self.top_width).powi(2)
    }
}

impl Default for ChiSquareScorer {
    fn default() -> Self {
        Self::new(80.4, 10.0, 172.5, 15.0)
    }
}

impl TrijetDiscriminant for ChiSquareScorer {
    fn ordering(&self) -> ScoreOrdering {
        ScoreOrdering::LowerIsBetter
    }

    fn assignment_score(&self, trijet: &Trijet, b_position: usize) -> ReconResult<f64> {
        trijet.check_b_position(b_position)?;
        let light = trijet.light_pair(b_position);
        let dijet_mass = (light[0].momentum + light[1].momentum).mass();
        Ok(self.chi_square(dijet_mass, trijet.momentum().mass()))
    }

    fn name(&self) -> &'static str {
        "chi_square"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURED SCORER
// ═══════════════════════════════════════════════════════════════════════════════

/// Scorer chosen once from the run configuration
#[derive(Debug, Clone)]
pub enum TrijetScorer {
    ChiSquare(ChiSquareScorer),
    Classifier(ClassifierScorer),
}

impl TrijetScorer {
    /// Build from configuration; loads and validates the classifier model
    pub fn from_config(config: &ScorerConfig) -> ReconResult<Self> {
        config.validate()?;
        match config {
            ScorerConfig::ChiSquare {
                w_mass,
                w_width,
                top_mass,
                top_width,
            } => Ok(TrijetScorer::ChiSquare(ChiSquareScorer::new(
                *w_mass, *w_width, *top_mass, *top_width,
            ))),
            ScorerConfig::Classifier { model_path } => Ok(TrijetScorer::Classifier(
                ClassifierScorer::from_json_file(model_path)?,
            )),
        }
    }
}

impl TrijetDiscriminant for TrijetScorer {
    fn ordering(&self) -> ScoreOrdering {
        match self {
            TrijetScorer::ChiSquare(s) => s.ordering(),
            TrijetScorer::Classifier(s) => s.ordering(),
        }
    }

    fn assignment_score(&self, trijet: &Trijet, b_position: usize) -> ReconResult<f64> {
        match self {
            TrijetScorer::ChiSquare(s) => s.assignment_score(trijet, b_position),
            TrijetScorer::Classifier(s) => s.assignment_score(trijet, b_position),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TrijetScorer::ChiSquare(s) => s.name(),
            TrijetScorer::Classifier(s) => s.name(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
