//! # Event-Shape Variables
//!
//! Built from the momentum tensor of the event's jets:
//!
//! ```text
//!   S^{ab} = Σ_i p_i^a p_i^b / Σ_i |p_i|²          (quadratic)
//!   Θ^{ab} = Σ_i p_i^a p_i^b / |p_i| / Σ_i |p_i|   (linearised)
//! ```
//!
//! | Variable    | Definition |
//! |-------------|------------|
//! | sphericity  | 1.5 (λ2 + λ3) of S |
//! | aplanarity  | 1.5 λ3 of S |
//! | planarity   | λ2 − λ3 of S |
//! | C parameter | 3 (λ1λ2 + λ1λ3 + λ2λ3) of Θ |
//! | D parameter | 27 λ1λ2λ3 of Θ |
//! | circularity | 2 min(μ1, μ2) / (μ1 + μ2) of the transverse 2×2 block |
//!
//! Eigenvalues are ordered λ1 ≥ λ2 ≥ λ3 and come from the closed-form
//! trigonometric solution for a symmetric 3×3 matrix.

use crate::kinematics::FourMomentum;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Symmetric 3×3 matrix
pub type Tensor3 = [[f64; 3]; 3];

/// Event-shape summary of a set of momenta
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EventShape {
    /// Eigenvalues of the quadratic tensor, descending
    pub eigenvalues: [f64; 3],
    /// Eigenvalues of the linearised tensor, descending
    pub linear_eigenvalues: [f64; 3],
    pub sphericity: f64,
    pub aplanarity: f64,
    pub planarity: f64,
    pub c_parameter: f64,
    pub d_parameter: f64,
    pub transverse_circularity: f64,
}

impl EventShape {
    /// All-zero shape is returned when there is no momentum to normalise by
    pub fn from_momenta<'a>(momenta: impl IntoIterator<Item = &'a FourMomentum>) -> Self {
        let mut quad = [[0.0; 3]; 3];
        let mut lin = [[0.0; 3]; 3];
        let mut sum_p2 = 0.0;
        let mut sum_p = 0.0;

        for p in momenta {
            let v = p.three_vector();
            let mag = p.p();
            if mag <= 0.0 {
                continue;
            }
            for a in 0..3 {
                for b in 0..3 {
                    quad[a][b] += v[a] * v[b];
                    lin[a][b] += v[a] * v[b] / mag;
                }
            }
            sum_p2 += mag * mag;
            sum_p += mag;
        }

        if sum_p2 <= 0.0 {
            return Self::default();
        }

        let circularity = transverse_circularity(&quad);
        scale(&mut quad, 1.0 / sum_p2);
        scale(&mut lin, 1.0 / sum_p);

        let [l1, l2, l3] = symmetric_eigenvalues(&quad);
        let [t1, t2, t3] = symmetric_eigenvalues(&lin);

        Self {
            eigenvalues: [l1, l2, l3],
            linear_eigenvalues: [t1, t2, t3],
            sphericity: 1.5 * (l2 + l3),
            aplanarity: 1.5 * l3,
            planarity: l2 - l3,
            c_parameter: 3.0 * (t1 * t2 + t1 * t3 + t2 * t3),
            d_parameter: 27.0 * t1 * t2 * t3,
            transverse_circularity: circularity,
        }
    }

    pub fn from_jets(jets: &[crate::jets::Jet]) -> Self {
        Self::from_momenta(jets.iter().map(|j| &j.momentum))
    }
}

fn scale(m: &mut Tensor3, factor: f64) {
    for row in m.iter_mut() {
        for x in row.iter_mut() {
            *x *= factor;
        }
    }
}

fn transverse_circularity(m: &Tensor3) -> f64 {
    let (a, b, d) = (m[0][0], m[0][1], m[1][1]);
    let trace = a + d;
    if trace <= 0.0 {
        return 0.0;
    }
    let half_gap = (0.25 * (a - d).powi(2) + b * b).sqrt();
    let smaller = (0.5 * trace - half_gap).max(0.0);
    2.0 * smaller / trace
}

/// Eigenvalues of a symmetric 3×3 matrix, descending
pub fn symmetric_eigenvalues(m: &Tensor3) -> [f64; 3] {
    let off = m[0][1].powi(2) + m[0][2].powi(2) + m[1][2].powi(2);
    if off == 0.0 {
        let mut diag = [m[0][0], m[1][1], m[2][2]];
        diag.sort_by(|x, y| y.total_cmp(x));
        return diag;
    }

    let q = (m[0][0] + m[1][1] + m[2][2]) / 3.0;
    let p2 = (m[0][0] - q).powi(2) + (m[1][1] - q).powi(2) + (m[2][2] - q).powi(2) + 2.0 * off;
    let p = (p2 / 6.0).sqrt();

    let mut b = *m;
    for (i, row) in b.iter_mut().enumerate() {
        row[i] -= q;
        for x in row.iter_mut() {
            *x /= p;
        }
    }
    let r = (determinant(&b) / 2.0).clamp(-1.0, 1.0);
    let angle = r.acos() / 3.0;

    let largest = q + 2.0 * p * angle.cos();
    let smallest = q + 2.0 * p * (angle + 2.0 * PI / 3.0).cos();
    let middle = 3.0 * q - largest - smallest;
    [largest, middle, smallest]
}

fn determinant(m: &Tensor3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_event_is_zero() {
        let shape = EventShape::from_momenta(&[] as &[FourMomentum]);
        assert_eq!(shape, EventShape::default());
    }

    #[test]
    fn test_back_to_back_pair_is_linear() {
        let jets = [
            FourMomentum::massless(50.0, 0.0, 0.0),
            FourMomentum::massless(-50.0, 0.0, 0.0),
        ];
        let shape = EventShape::from_momenta(&jets);
        assert!((shape.eigenvalues[0] - 1.0).abs() < 1e-12);
        assert!(shape.sphericity.abs() < 1e-12);
        assert!(shape.c_parameter.abs() < 1e-12);
        assert!(shape.transverse_circularity.abs() < 1e-12);
    }

    #[test]
    fn test_isotropic_event_is_spherical() {
        let jets = [
            FourMomentum::massless(10.0, 0.0, 0.0),
            FourMomentum::massless(-10.0, 0.0, 0.0),
            FourMomentum::massless(0.0, 10.0, 0.0),
            FourMomentum::massless(0.0, -10.0, 0.0),
            FourMomentum::massless(0.0, 0.0, 10.0),
            FourMomentum::massless(0.0, 0.0, -10.0),
        ];
        let shape = EventShape::from_momenta(&jets);
        assert!((shape.sphericity - 1.0).abs() < 1e-12);
        assert!((shape.aplanarity - 0.5).abs() < 1e-12);
        assert!(shape.planarity.abs() < 1e-12);
        assert!((shape.c_parameter - 1.0).abs() < 1e-12);
        assert!((shape.d_parameter - 1.0).abs() < 1e-12);
        assert!((shape.transverse_circularity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_closed_form_eigenvalues() {
        // Eigenvalues 1, 2, 4 rotated out of the diagonal
        let m = [[2.0, 0.0, 0.0], [0.0, 2.5, 1.5], [0.0, 1.5, 2.5]];
        let ev = symmetric_eigenvalues(&m);
        assert!((ev[0] - 4.0).abs() < 1e-10);
        assert!((ev[1] - 2.0).abs() < 1e-10);
        assert!((ev[2] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_eigenvalues_sum_to_one() {
        let jets = [
            FourMomentum::from_pt_eta_phi_m(120.0, 0.4, 0.3, 10.0),
            FourMomentum::from_pt_eta_phi_m(80.0, -1.1, 2.6, 8.0),
            FourMomentum::from_pt_eta_phi_m(45.0, 1.9, -1.7, 5.0),
            FourMomentum::from_pt_eta_phi_m(30.0, -0.2, -2.9, 4.0),
        ];
        let shape = EventShape::from_momenta(&jets);
        let total: f64 = shape.eigenvalues.iter().sum();
        assert!((total - 1.0).abs() < 1e-10);
        assert!(shape.eigenvalues[0] >= shape.eigenvalues[1]);
        assert!(shape.eigenvalues[1] >= shape.eigenvalues[2]);
        assert!((0.0..=1.0).contains(&shape.sphericity));
        assert!((0.0..=0.5).contains(&shape.aplanarity));
    }
}
