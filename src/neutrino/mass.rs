//! Resonance mass from tau, b-jet and reconstructed neutrino
//!
//! The diagnostic truth classification sits next to the mass calculation but
//! never feeds back into it: the numbers in [`MassEstimate`] are the same with
//! or without a [`TruthReference`].

use crate::config::TruthMatchConfig;
use crate::kinematics::{delta_phi, FourMomentum, MissingEt};
use crate::neutrino::solver::{NeutrinoPzSolver, NeutrinoSolution};
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// TRUTH CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Generator-level partners of the reconstructed inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TruthReference {
    pub tau: Option<FourMomentum>,
    pub bjet: Option<FourMomentum>,
    pub neutrino: Option<FourMomentum>,
}

/// 3-bit record of which inputs failed to match truth
///
/// | bit | input |
/// |-----|-------|
/// | 0   | b-jet |
/// | 1   | MET   |
/// | 2   | tau   |
///
/// Code 0 means every input matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MismatchCode(u8);

impl MismatchCode {
    pub const BJET: u8 = 0b001;
    pub const MET: u8 = 0b010;
    pub const TAU: u8 = 0b100;

    pub fn from_matches(bjet_matched: bool, met_matched: bool, tau_matched: bool) -> Self {
        let mut bits = 0;
        if !bjet_matched {
            bits |= Self::BJET;
        }
        if !met_matched {
            bits |= Self::MET;
        }
        if !tau_matched {
            bits |= Self::TAU;
        }
        Self(bits)
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits < 8 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// All eight codes in ascending order
    pub fn all() -> [Self; 8] {
        [0, 1, 2, 3, 4, 5, 6, 7].map(Self)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn bjet_matched(&self) -> bool {
        self.0 & Self::BJET == 0
    }

    pub fn met_matched(&self) -> bool {
        self.0 & Self::MET == 0
    }

    pub fn tau_matched(&self) -> bool {
        self.0 & Self::TAU == 0
    }

    pub fn all_matched(&self) -> bool {
        self.0 == 0
    }

    pub fn label(&self) -> String {
        if self.all_matched() {
            return "all_matched".to_string();
        }
        let mut parts = Vec::new();
        if !self.bjet_matched() {
            parts.push("bjet");
        }
        if !self.met_matched() {
            parts.push("met");
        }
        if !self.tau_matched() {
            parts.push("tau");
        }
        format!("wrong_{}", parts.join("_"))
    }
}

impl fmt::Display for MismatchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MASS ESTIMATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Reconstructed resonance mass and intermediate quantities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassEstimate {
    /// m(τ + b + ν)
    pub mass: f64,
    /// m(τ + ν)
    pub tau_neutrino_mass: f64,
    /// Neutrino p_z that fixed the τ + ν + b system
    pub chosen_pz: f64,
    /// m_T(τ, MET)
    pub transverse_mass: f64,
    /// Copied from the neutrino solution
    pub approximated: bool,
    /// Truth classification, diagnostic runs only
    pub code: Option<MismatchCode>,
}

/// Combines the visible inputs with the solved neutrino
#[derive(Debug, Clone)]
pub struct FullMassCalculator {
    solver: NeutrinoPzSolver,
    matching: TruthMatchConfig,
}

impl FullMassCalculator {
    pub fn new(solver: NeutrinoPzSolver, matching: TruthMatchConfig) -> Self {
        Self { solver, matching }
    }

    pub fn solver(&self) -> &NeutrinoPzSolver {
        &self.solver
    }

    /// Assemble the mass estimate for an already-solved neutrino
    pub fn combine(
        tau: &FourMomentum,
        bjet: &FourMomentum,
        met: &MissingEt,
        solution: &NeutrinoSolution,
    ) -> MassEstimate {
        let neutrino = solution.neutrino;
        let tau_nu = *tau + neutrino;
        MassEstimate {
            mass: (tau_nu + *bjet).mass(),
            tau_neutrino_mass: tau_nu.mass(),
            chosen_pz: solution.pz,
            transverse_mass: met.transverse_mass(tau),
            approximated: solution.approximated,
            code: None,
        }
    }

    /// Solve for the neutrino and build the mass estimate
    pub fn estimate(
        &self,
        tau: &FourMomentum,
        bjet: &FourMomentum,
        met: &MissingEt,
    ) -> (NeutrinoSolution, MassEstimate) {
        let solution = self.solver.solve(tau, bjet, met);
        let estimate = Self::combine(tau, bjet, met, &solution);
        (solution, estimate)
    }

    /// As [`estimate`](Self::estimate), attaching the truth classification
    pub fn estimate_with_truth(
        &self,
        tau: &FourMomentum,
        bjet: &FourMomentum,
        met: &MissingEt,
        truth: &TruthReference,
    ) -> (NeutrinoSolution, MassEstimate) {
        let (solution, mut estimate) = self.estimate(tau, bjet, met);
        estimate.code = Some(self.classify(tau, bjet, met, truth));
        (solution, estimate)
    }

    /// Compare each reconstructed input with its truth partner
    ///
    /// A missing truth partner counts as a mismatch.
    pub fn classify(
        &self,
        tau: &FourMomentum,
        bjet: &FourMomentum,
        met: &MissingEt,
        truth: &TruthReference,
    ) -> MismatchCode {
        let cone = |reco: &FourMomentum, gen: Option<FourMomentum>| {
            gen.is_some_and(|g| reco.delta_r(&g) < self.matching.max_delta_r)
        };
        let met_matched = truth.neutrino.is_some_and(|nu| {
            let pt = nu.pt();
            pt > 0.0
                && delta_phi(met.phi(), nu.phi()).abs() < self.matching.met_max_delta_phi
                && (met.met() - pt).abs() / pt < self.matching.met_max_relative_pt
        });
        MismatchCode::from_matches(cone(bjet, truth.bjet), met_matched, cone(tau, truth.tau))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neutrino::solver::RootPolicy;

    fn calculator() -> FullMassCalculator {
        FullMassCalculator::new(
            NeutrinoPzSolver::new(200.0, RootPolicy::MinAngle).unwrap(),
            TruthMatchConfig::default(),
        )
    }

    fn inputs() -> (FourMomentum, FourMomentum, MissingEt) {
        (
            FourMomentum::from_pt_eta_phi_m(50.0, 0.0, 0.0, 0.0),
            FourMomentum::from_pt_eta_phi_m(60.0, 0.2, 0.1, 0.0),
            MissingEt::new(40.0, 0.0),
        )
    }

    #[test]
    fn test_mass_matches_hypothesis_for_real_roots() {
        let (tau, b, met) = inputs();
        let (solution, estimate) = calculator().estimate(&tau, &b, &met);
        assert!(!solution.approximated);
        assert!((estimate.mass - 200.0).abs() < 1e-6);
        assert!(estimate.tau_neutrino_mass > 0.0);
        assert!(estimate.tau_neutrino_mass < estimate.mass);
        assert_eq!(estimate.chosen_pz, solution.pz);
        assert!(estimate.code.is_none());
    }

    #[test]
    fn test_truth_does_not_change_numbers() {
        let (tau, b, met) = inputs();
        let calc = calculator();
        let (_, plain) = calc.estimate(&tau, &b, &met);
        let truth = TruthReference {
            tau: Some(tau),
            bjet: None,
            neutrino: Some(met.with_pz(10.0)),
        };
        let (_, diagnosed) = calc.estimate_with_truth(&tau, &b, &met, &truth);
        assert_eq!(plain.mass.to_bits(), diagnosed.mass.to_bits());
        assert_eq!(plain.chosen_pz.to_bits(), diagnosed.chosen_pz.to_bits());
        assert_eq!(diagnosed.code, MismatchCode::from_bits(MismatchCode::BJET));
    }

    #[test]
    fn test_classification_bits() {
        let (tau, b, met) = inputs();
        let calc = calculator();

        let perfect = TruthReference {
            tau: Some(tau),
            bjet: Some(b),
            neutrino: Some(met.with_pz(-30.0)),
        };
        assert!(calc.classify(&tau, &b, &met, &perfect).all_matched());

        let elsewhere = FourMomentum::from_pt_eta_phi_m(50.0, 2.0, 3.0, 0.0);
        let swapped = TruthReference {
            tau: Some(elsewhere),
            bjet: Some(elsewhere),
            neutrino: Some(FourMomentum::massless(-40.0, 0.0, 0.0)),
        };
        let code = calc.classify(&tau, &b, &met, &swapped);
        assert_eq!(code.bits(), 0b111);
        assert_eq!(code.label(), "wrong_bjet_met_tau");

        let soft_met = TruthReference {
            neutrino: Some(FourMomentum::massless(10.0, 0.0, 0.0)),
            ..perfect
        };
        let code = calc.classify(&tau, &b, &met, &soft_met);
        assert!(!code.met_matched());
        assert!(code.tau_matched() && code.bjet_matched());
    }

    #[test]
    fn test_code_round_trip() {
        for code in MismatchCode::all() {
            let rebuilt = MismatchCode::from_matches(
                code.bjet_matched(),
                code.met_matched(),
                code.tau_matched(),
            );
            assert_eq!(rebuilt, code);
        }
        assert!(MismatchCode::from_bits(8).is_none());
    }
}
