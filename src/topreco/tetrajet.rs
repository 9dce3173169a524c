//! Tetrajet system: both top candidates plus the free b-jet

use crate::error::ReconError;
use crate::jets::Jet;
use crate::kinematics::{AngularSeparation, FourMomentum};
use crate::topreco::scoring::TopCandidate;
use crate::topreco::selection::SelectionResult;
use crate::ReconResult;
use serde::{Deserialize, Serialize};

/// Angular layout of one top candidate relative to the free jet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrijetGeometry {
    /// Trijet system vs. free jet
    pub trijet_to_free: AngularSeparation,
    /// Between the two light-quark jets
    pub within_dijet: AngularSeparation,
    /// Light-quark dijet vs. the candidate's b-jet
    pub dijet_to_b: AngularSeparation,
}

impl TrijetGeometry {
    fn new(top: &TopCandidate, free: &Jet) -> Self {
        let [l1, l2] = top.light;
        Self {
            trijet_to_free: top.momentum.separation(&free.momentum),
            within_dijet: l1.momentum.separation(&l2.momentum),
            dijet_to_b: top.dijet_momentum().separation(&top.b.momentum),
        }
    }
}

/// Derived quantities of the four-object system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TetrajetSystem {
    pub momentum: FourMomentum,
    pub mass: f64,
    pub pt: f64,
    pub leading: TrijetGeometry,
    pub subleading: TrijetGeometry,
    /// Leading vs. subleading trijet
    pub trijet_to_trijet: AngularSeparation,
    pub free_jet_pt: f64,
}

/// Builds the tetrajet from a passed selection
#[derive(Debug, Clone, Copy, Default)]
pub struct TetrajetBuilder;

impl TetrajetBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Sum both tops with the free jet
    ///
    /// Calling this on a failed selection is a caller bug and returns
    /// [`ReconError::Precondition`].
    pub fn build(&self, selection: &SelectionResult) -> ReconResult<TetrajetSystem> {
        let (leading, subleading, free) = selection.selected().ok_or_else(|| {
            ReconError::Precondition(format!(
                "tetrajet requested for a failed selection ({})",
                selection
                    .failure
                    .map(|f| f.name())
                    .unwrap_or("incomplete result")
            ))
        })?;
        if !free.is_btagged {
            return Err(ReconError::Precondition(
                "free jet is not b-tagged".to_string(),
            ));
        }

        let momentum = leading.momentum + subleading.momentum + free.momentum;
        Ok(TetrajetSystem {
            momentum,
            mass: momentum.mass(),
            pt: momentum.pt(),
            leading: TrijetGeometry::new(leading, free),
            subleading: TrijetGeometry::new(subleading, free),
            trijet_to_trijet: leading.momentum.separation(&subleading.momentum),
            free_jet_pt: free.pt(),
        })
    }
}
