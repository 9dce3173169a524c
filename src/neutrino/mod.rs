//! # Leptonic Side: Neutrino p_z and Full Mass
//!
//! ```text
//!   τ, b, MET ──► NeutrinoPzSolver ──► NeutrinoSolution ──► FullMassCalculator ──► MassEstimate
//!                  quadratic in p_z      roots + policy       m(τ + b + ν)           (+ truth code)
//! ```

pub mod mass;
pub mod solver;

pub use mass::{FullMassCalculator, MassEstimate, MismatchCode, TruthReference};
pub use solver::{NeutrinoPzSolver, NeutrinoSolution, Quadratic, RootPolicy};
