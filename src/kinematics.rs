//! Relativistic kinematics for reconstructed objects
//!
//! Four-momenta are stored in Cartesian form `(E, p_x, p_y, p_z)` in GeV with
//! the beam along `z`. Collider coordinates (p_T, η, φ) are derived on demand.
//!
//! # Conventions
//!
//! | Quantity | Definition |
//! |----------|------------|
//! | p_T      | √(p_x² + p_y²) |
//! | η        | asinh(p_z / p_T) |
//! | φ        | atan2(p_y, p_x) ∈ (−π, π] |
//! | ΔR       | √(Δη² + Δφ²) with Δφ wrapped into (−π, π] |

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ═══════════════════════════════════════════════════════════════════════════════
// FOUR-MOMENTUM
// ═══════════════════════════════════════════════════════════════════════════════

/// Four-momentum vector in natural units (c = 1)
///
/// p^μ = (E, p_x, p_y, p_z)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FourMomentum {
    /// Energy component
    pub e: f64,
    /// Momentum x-component
    pub px: f64,
    /// Momentum y-component
    pub py: f64,
    /// Momentum z-component (beam axis)
    pub pz: f64,
}

impl FourMomentum {
    /// Create a new four-momentum
    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Create from collider coordinates and a rest mass
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
        Self::new(e, px, py, pz)
    }

    /// Massless momentum along a transverse vector with a given p_z
    pub fn massless(px: f64, py: f64, pz: f64) -> Self {
        Self::new((px * px + py * py + pz * pz).sqrt(), px, py, pz)
    }

    /// Invariant mass squared: m² = E² - |p|²
    pub fn mass_squared(&self) -> f64 {
        self.e.powi(2) - self.px.powi(2) - self.py.powi(2) - self.pz.powi(2)
    }

    /// Invariant mass: m = √(E² - |p|²)
    /// Returns 0 for spacelike momenta
    pub fn mass(&self) -> f64 {
        let m2 = self.mass_squared();
        if m2 >= 0.0 {
            m2.sqrt()
        } else {
            0.0
        }
    }

    /// 3-momentum magnitude: |p| = √(p_x² + p_y² + p_z²)
    pub fn p(&self) -> f64 {
        (self.px.powi(2) + self.py.powi(2) + self.pz.powi(2)).sqrt()
    }

    /// Transverse momentum: p_T = √(p_x² + p_y²)
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Pseudorapidity: η = asinh(p_z / p_T)
    ///
    /// Objects along the beam axis get ±∞ like any other collider framework
    /// would report them.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt > 0.0 {
            (self.pz / pt).asinh()
        } else if self.pz > 0.0 {
            f64::INFINITY
        } else if self.pz < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        }
    }

    /// Azimuthal angle: φ = atan2(p_y, p_x)
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Rapidity: y = 0.5 * ln((E + p_z) / (E - p_z))
    pub fn rapidity(&self) -> f64 {
        let denom = self.e - self.pz;
        if denom.abs() > 1e-10 {
            0.5 * ((self.e + self.pz) / denom).ln()
        } else {
            f64::INFINITY
        }
    }

    /// Transverse energy: E_T = √(m² + p_T²)
    pub fn et(&self) -> f64 {
        (self.mass_squared().max(0.0) + self.pt().powi(2)).sqrt()
    }

    /// Spatial part as an array
    pub fn three_vector(&self) -> [f64; 3] {
        [self.px, self.py, self.pz]
    }

    /// Minkowski inner product: p · q = E₁E₂ - p⃗₁·p⃗₂
    pub fn dot(&self, other: &Self) -> f64 {
        self.e * other.e - self.px * other.px - self.py * other.py - self.pz * other.pz
    }

    /// Cosine of the opening angle between the two 3-momenta
    ///
    /// Returns 1 when either momentum vanishes.
    pub fn cos_angle(&self, other: &Self) -> f64 {
        let denom = self.p() * other.p();
        if denom > 0.0 {
            let num = self.px * other.px + self.py * other.py + self.pz * other.pz;
            (num / denom).clamp(-1.0, 1.0)
        } else {
            1.0
        }
    }

    /// Opening angle between the two 3-momenta, in [0, π]
    pub fn angle(&self, other: &Self) -> f64 {
        self.cos_angle(other).acos()
    }

    /// Δφ wrapped into (−π, π]
    pub fn delta_phi(&self, other: &Self) -> f64 {
        delta_phi(self.phi(), other.phi())
    }

    /// Δη = η₁ − η₂
    pub fn delta_eta(&self, other: &Self) -> f64 {
        self.eta() - other.eta()
    }

    /// ΔR = √(Δη² + Δφ²)
    pub fn delta_r(&self, other: &Self) -> f64 {
        self.delta_eta(other).hypot(self.delta_phi(other))
    }

    /// Full angular separation record
    pub fn separation(&self, other: &Self) -> AngularSeparation {
        AngularSeparation::between(self, other)
    }
}

impl std::ops::Add for FourMomentum {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            e: self.e + other.e,
            px: self.px + other.px,
            py: self.py + other.py,
            pz: self.pz + other.pz,
        }
    }
}

impl std::ops::Sub for FourMomentum {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            e: self.e - other.e,
            px: self.px - other.px,
            py: self.py - other.py,
            pz: self.pz - other.pz,
        }
    }
}

impl std::ops::AddAssign for FourMomentum {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::iter::Sum for FourMomentum {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, p| acc + p)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MISSING TRANSVERSE MOMENTUM
// ═══════════════════════════════════════════════════════════════════════════════

/// Missing transverse momentum 2-vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingEt {
    pub px: f64,
    pub py: f64,
}

impl MissingEt {
    pub fn new(px: f64, py: f64) -> Self {
        Self { px, py }
    }

    /// Create from magnitude and azimuth
    pub fn from_polar(met: f64, phi: f64) -> Self {
        Self::new(met * phi.cos(), met * phi.sin())
    }

    /// Magnitude |MET|
    pub fn met(&self) -> f64 {
        self.px.hypot(self.py)
    }

    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Massless four-momentum with the given longitudinal component
    pub fn with_pz(&self, pz: f64) -> FourMomentum {
        FourMomentum::massless(self.px, self.py, pz)
    }

    /// Transverse mass of a visible object and the missing momentum:
    /// m_T = √(2 p_T MET (1 − cos Δφ))
    pub fn transverse_mass(&self, visible: &FourMomentum) -> f64 {
        let dphi = delta_phi(visible.phi(), self.phi());
        (2.0 * visible.pt() * self.met() * (1.0 - dphi.cos()))
            .max(0.0)
            .sqrt()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANGULAR SEPARATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Δη, Δφ and ΔR between two objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AngularSeparation {
    pub delta_eta: f64,
    pub delta_phi: f64,
    pub delta_r: f64,
}

impl AngularSeparation {
    pub fn between(a: &FourMomentum, b: &FourMomentum) -> Self {
        let delta_eta = a.delta_eta(b);
        let delta_phi = a.delta_phi(b);
        Self {
            delta_eta,
            delta_phi,
            delta_r: delta_eta.hypot(delta_phi),
        }
    }
}

/// Azimuthal difference accounting for wrap-around
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let mut diff = phi1 - phi2;
    while diff > PI {
        diff -= 2.0 * PI;
    }
    while diff <= -PI {
        diff += 2.0 * PI;
    }
    diff
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collider_coordinates_round_trip() {
        let p = FourMomentum::from_pt_eta_phi_m(45.0, 1.3, -2.1, 4.8);
        assert!((p.pt() - 45.0).abs() < 1e-10);
        assert!((p.eta() - 1.3).abs() < 1e-10);
        assert!((p.phi() + 2.1).abs() < 1e-10);
        assert!((p.mass() - 4.8).abs() < 1e-8);
    }

    #[test]
    fn test_spacelike_mass_is_zero() {
        let p = FourMomentum::new(1.0, 5.0, 0.0, 0.0);
        assert!(p.mass_squared() < 0.0);
        assert_eq!(p.mass(), 0.0);
    }

    #[test]
    fn test_delta_phi_wraps() {
        assert!((delta_phi(3.0, -3.0) - (6.0 - 2.0 * PI)).abs() < 1e-12);
        assert!((delta_phi(-3.0, 3.0) + (6.0 - 2.0 * PI)).abs() < 1e-12);
        assert!((delta_phi(PI, -PI)).abs() < 1e-12);
    }

    #[test]
    fn test_delta_r_symmetric() {
        let a = FourMomentum::from_pt_eta_phi_m(30.0, 0.5, 3.0, 0.0);
        let b = FourMomentum::from_pt_eta_phi_m(40.0, -0.2, -3.0, 0.0);
        assert!((a.delta_r(&b) - b.delta_r(&a)).abs() < 1e-12);
        let sep = a.separation(&b);
        assert!((sep.delta_r - a.delta_r(&b)).abs() < 1e-12);
    }

    #[test]
    fn test_sum_of_back_to_back_pair() {
        let a = FourMomentum::from_pt_eta_phi_m(50.0, 0.0, 0.0, 0.0);
        let b = FourMomentum::from_pt_eta_phi_m(50.0, 0.0, PI, 0.0);
        let total: FourMomentum = [a, b].into_iter().sum();
        assert!(total.pt() < 1e-10);
        assert!((total.mass() - 100.0).abs() < 1e-8);
    }

    #[test]
    fn test_transverse_mass() {
        let lepton = FourMomentum::from_pt_eta_phi_m(40.0, 0.3, 0.0, 0.0);
        let met = MissingEt::from_polar(40.0, PI);
        assert!((met.transverse_mass(&lepton) - 80.0).abs() < 1e-8);
    }
}
