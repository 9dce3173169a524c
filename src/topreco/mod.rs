//! # Hadronic Top Reconstruction
//!
//! ```text
//!   JetPool ──► TrijetEnumerator ──► TrijetScorer ──► TopCandidateSelector ──► TetrajetBuilder
//!                 all C(M,3)          χ² or            leading / subleading     tops + free b
//!                 triples             classifier       / free b-jet
//! ```
//!
//! Everything in this module is a pure function of the jet pool and the
//! configuration, so events can be processed in any order or in parallel.

pub mod classifier;
pub mod scoring;
pub mod selection;
pub mod tetrajet;
pub mod trijet;

pub use classifier::{
    trijet_features, Activation, ClassifierModel, ClassifierScorer, DenseLayer, FEATURE_NAMES,
    N_FEATURES,
};
pub use scoring::{ChiSquareScorer, ScoreOrdering, TopCandidate, TrijetDiscriminant, TrijetScorer};
pub use selection::{SelectionFailure, SelectionResult, SelectionState, TopCandidateSelector};
pub use tetrajet::{TetrajetBuilder, TetrajetSystem, TrijetGeometry};
pub use trijet::{Trijet, TrijetEnumerator};
