//! Neutrino longitudinal momentum from a resonance mass constraint
//!
//! With the visible system `V = τ + b`, a massless neutrino whose transverse
//! momentum is the MET, and the requirement `(V + ν)² = M²`:
//!
//! ```text
//!   μ  = (M² − m_V²)/2 + p⃗_T(V)·p⃗_T(ν)
//!   a  = E_V² − p_z(V)²
//!   b  = −2 μ p_z(V)
//!   c  = E_V² p_T(ν)² − μ²
//!   Δ  = b² − 4ac
//! ```
//!
//! For `Δ ≥ 0` the roots are `(−b ± √Δ) / 2a` and a [`RootPolicy`] picks one.
//! For `Δ < 0` both reported roots are the real part `−b / 2a` and the solution
//! is flagged as approximated. That fallback is kept exactly as is so mass
//! distributions stay comparable with earlier results.

use crate::error::ReconError;
use crate::kinematics::{FourMomentum, MissingEt};
use crate::ReconResult;
use serde::{Deserialize, Serialize};

/// |a| below which the quadratic is treated as linear
const LINEAR_EPSILON: f64 = 1e-9;

/// How to choose between two real roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPolicy {
    /// Larger |p_z|
    PreferLarger,
    /// Smaller |p_z|
    PreferSmaller,
    /// Smallest opening angle between neutrino and tau
    MinAngle,
    /// Largest opening angle between neutrino and tau
    MaxAngle,
}

impl RootPolicy {
    pub fn all() -> [Self; 4] {
        [
            RootPolicy::PreferLarger,
            RootPolicy::PreferSmaller,
            RootPolicy::MinAngle,
            RootPolicy::MaxAngle,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RootPolicy::PreferLarger => "prefer_larger",
            RootPolicy::PreferSmaller => "prefer_smaller",
            RootPolicy::MinAngle => "min_angle",
            RootPolicy::MaxAngle => "max_angle",
        }
    }

    /// Index (0 or 1) of the chosen root; the first root wins ties
    fn choose(&self, roots: [f64; 2], tau: &FourMomentum, met: &MissingEt) -> usize {
        let second_wins = match self {
            RootPolicy::PreferLarger => roots[1].abs() > roots[0].abs(),
            RootPolicy::PreferSmaller => roots[1].abs() < roots[0].abs(),
            RootPolicy::MinAngle | RootPolicy::MaxAngle => {
                let cos0 = met.with_pz(roots[0]).cos_angle(tau);
                let cos1 = met.with_pz(roots[1]).cos_angle(tau);
                match self {
                    RootPolicy::MinAngle => cos1 > cos0,
                    _ => cos1 < cos0,
                }
            }
        };
        usize::from(second_wins)
    }
}

/// Quadratic coefficients `a·p_z² + b·p_z + c`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    pub fn discriminant(&self) -> f64 {
        self.b * self.b - 4.0 * self.a * self.c
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }

    /// Scale of the individual terms at `x`, for relative residuals
    pub fn magnitude(&self, x: f64) -> f64 {
        (self.a * x * x).abs() + (self.b * x).abs() + self.c.abs()
    }
}

/// Result of the p_z solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeutrinoSolution {
    pub quadratic: Quadratic,
    /// `b² − 4ac`
    pub discriminant: f64,
    /// `(−b + √Δ)/2a, (−b − √Δ)/2a`, or `−b/2a` twice when Δ < 0
    pub roots: [f64; 2],
    pub policy: RootPolicy,
    /// Index into `roots` of the reported value
    pub chosen_index: usize,
    pub pz: f64,
    /// No real solution existed; `pz` is the real part of the complex pair
    pub approximated: bool,
    /// Reconstructed neutrino four-momentum
    pub neutrino: FourMomentum,
}

impl NeutrinoSolution {
    /// True when the mass constraint was met exactly
    pub fn is_physical(&self) -> bool {
        !self.approximated
    }
}

/// Solves for the neutrino p_z under a fixed resonance mass hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutrinoPzSolver {
    resonance_mass: f64,
    policy: RootPolicy,
}

impl NeutrinoPzSolver {
    /// Fails when the mass hypothesis is not a positive finite number
    pub fn new(resonance_mass: f64, policy: RootPolicy) -> ReconResult<Self> {
        if !resonance_mass.is_finite() || resonance_mass <= 0.0 {
            return Err(ReconError::InvalidParameter(format!(
                "resonance mass must be positive and finite, got {}",
                resonance_mass
            )));
        }
        Ok(Self {
            resonance_mass,
            policy,
        })
    }

    pub fn resonance_mass(&self) -> f64 {
        self.resonance_mass
    }

    pub fn policy(&self) -> RootPolicy {
        self.policy
    }

    /// Coefficients of the constraint equation
    pub fn quadratic(
        &self,
        tau: &FourMomentum,
        bjet: &FourMomentum,
        met: &MissingEt,
    ) -> Quadratic {
        let visible = *tau + *bjet;
        let mu = 0.5 * (self.resonance_mass.powi(2) - visible.mass_squared())
            + visible.px * met.px
            + visible.py * met.py;
        let e2 = visible.e * visible.e;
        Quadratic {
            a: e2 - visible.pz * visible.pz,
            b: -2.0 * mu * visible.pz,
            c: e2 * (met.px * met.px + met.py * met.py) - mu * mu,
        }
    }

    pub fn solve(
        &self,
        tau: &FourMomentum,
        bjet: &FourMomentum,
        met: &MissingEt,
    ) -> NeutrinoSolution {
        let quadratic = self.quadratic(tau, bjet, met);
        let Quadratic { a, b, c } = quadratic;
        let discriminant = quadratic.discriminant();

        let (roots, approximated) = if a.abs() < LINEAR_EPSILON {
            // Visible system moving along the beam at the speed of light
            if b.abs() < LINEAR_EPSILON {
                ([0.0, 0.0], true)
            } else {
                let root = -c / b;
                ([root, root], false)
            }
        } else if discriminant >= 0.0 {
            let sqrt_d = discriminant.sqrt();
            ([(-b + sqrt_d) / (2.0 * a), (-b - sqrt_d) / (2.0 * a)], false)
        } else {
            let real = -b / (2.0 * a);
            ([real, real], true)
        };

        let chosen_index = if approximated {
            0
        } else {
            self.policy.choose(roots, tau, met)
        };
        let pz = roots[chosen_index];

        if approximated {
            log::debug!(
                "neutrino p_z forced to real part {:.3} (discriminant {:.3e})",
                pz,
                discriminant
            );
        }

        NeutrinoSolution {
            quadratic,
            discriminant,
            roots,
            policy: self.policy,
            chosen_index,
            pz,
            approximated,
            neutrino: met.with_pz(pz),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_inputs() -> (FourMomentum, FourMomentum, MissingEt) {
        (
            FourMomentum::from_pt_eta_phi_m(50.0, 0.0, 0.0, 0.0),
            FourMomentum::from_pt_eta_phi_m(60.0, 0.2, 0.1, 0.0),
            MissingEt::new(40.0, 0.0),
        )
    }

    #[test]
    fn test_invalid_mass_rejected() {
        for mass in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            assert!(matches!(
                NeutrinoPzSolver::new(mass, RootPolicy::MinAngle),
                Err(ReconError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_reference_event_has_real_roots() {
        let (tau, b, met) = reference_inputs();
        let solver = NeutrinoPzSolver::new(200.0, RootPolicy::MinAngle).unwrap();
        let solution = solver.solve(&tau, &b, &met);

        assert!(solution.discriminant >= 0.0);
        assert!(!solution.approximated);
        assert!(solution.roots[0] != solution.roots[1]);
        for root in solution.roots {
            let residual = solution.quadratic.evaluate(root);
            assert!(residual.abs() <= 1e-9 * solution.quadratic.magnitude(root));
        }
    }

    #[test]
    fn test_min_angle_is_reproducible() {
        let (tau, b, met) = reference_inputs();
        let solver = NeutrinoPzSolver::new(200.0, RootPolicy::MinAngle).unwrap();
        let first = solver.solve(&tau, &b, &met);
        for _ in 0..10 {
            let again = solver.solve(&tau, &b, &met);
            assert_eq!(again.pz.to_bits(), first.pz.to_bits());
        }
        // tau points along +x, so the smaller |p_z| is the closer direction
        let other = first.roots[1 - first.chosen_index];
        assert!(first.pz.abs() < other.abs());
    }

    #[test]
    fn test_policies_partition_the_roots() {
        let (tau, b, met) = reference_inputs();
        let pick = |policy| {
            NeutrinoPzSolver::new(200.0, policy)
                .unwrap()
                .solve(&tau, &b, &met)
        };
        let larger = pick(RootPolicy::PreferLarger);
        let smaller = pick(RootPolicy::PreferSmaller);
        assert!(larger.pz.abs() > smaller.pz.abs());
        assert_ne!(larger.chosen_index, smaller.chosen_index);

        let min_angle = pick(RootPolicy::MinAngle);
        let max_angle = pick(RootPolicy::MaxAngle);
        assert_ne!(min_angle.chosen_index, max_angle.chosen_index);
        assert!(min_angle.neutrino.angle(&tau) <= max_angle.neutrino.angle(&tau));
    }

    #[test]
    fn test_solution_restores_resonance_mass() {
        let (tau, b, met) = reference_inputs();
        for policy in RootPolicy::all() {
            let solution = NeutrinoPzSolver::new(200.0, policy)
                .unwrap()
                .solve(&tau, &b, &met);
            let total = tau + b + solution.neutrino;
            assert!((total.mass() - 200.0).abs() < 1e-6, "{:?}", policy);
        }
    }

    #[test]
    fn test_negative_discriminant_uses_real_part() {
        // Light hypothesis with MET perpendicular to the visible system:
        // |μ| is far below p_T(ν)·E_T(V), so no real root exists
        let (tau, b, _) = reference_inputs();
        let met = MissingEt::new(0.0, 100.0);
        let solver = NeutrinoPzSolver::new(20.0, RootPolicy::MinAngle).unwrap();
        let solution = solver.solve(&tau, &b, &met);

        assert!(solution.discriminant < 0.0);
        assert!(solution.approximated);
        assert!(!solution.is_physical());
        let q = solution.quadratic;
        let expected = -q.b / (2.0 * q.a);
        assert_eq!(solution.roots[0].to_bits(), expected.to_bits());
        assert_eq!(solution.roots[1].to_bits(), expected.to_bits());
        assert_eq!(solution.pz.to_bits(), expected.to_bits());
    }

    #[test]
    fn test_coefficients_match_definition() {
        let (tau, b, met) = reference_inputs();
        let solver = NeutrinoPzSolver::new(200.0, RootPolicy::PreferSmaller).unwrap();
        let q = solver.quadratic(&tau, &b, &met);
        let v = tau + b;
        let mu = (200.0f64.powi(2) - v.mass_squared()) / 2.0 + v.px * 40.0;
        assert!((q.a - (v.e.powi(2) - v.pz.powi(2))).abs() < 1e-9);
        assert!((q.b + 2.0 * mu * v.pz).abs() < 1e-6);
        assert!((q.c - (v.e.powi(2) * 1600.0 - mu * mu)).abs() < 1e-3);
    }
}
