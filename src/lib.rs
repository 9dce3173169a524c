//! # Tetrajet Reconstruction
//!
//! Per-event reconstruction of a heavy resonance decaying to two top quarks
//! and a b-jet, plus a leptonic tau + b + neutrino mass estimate.
//!
//! ## Features
//! - Exhaustive trijet enumeration with χ² or classifier scoring
//! - Two-top selection with cross-cleaning and a free b-jet requirement
//! - Tetrajet system with angular separations
//! - Neutrino p_z from a resonance mass constraint with configurable root choice
//! - Full mass estimate with optional truth-mismatch classification
//! - Event-shape variables and a histogramming sink
//! - Rayon fan-out over independent events
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────── hadronic ───────────────────────┐
//!   Event ──► JetPool ──► TrijetEnumerator ──► TrijetScorer ──► TopCandidateSelector ──► TetrajetBuilder
//!     │          │
//!     │          └── leading b-jet ──┐
//!     └── τ, MET ────────────────────┴──► NeutrinoPzSolver ──► FullMassCalculator
//!                 └──────────────────────── leptonic ───────────────────────┘
//!                                   │
//!                            RecordingSink (histograms, counters)
//! ```

pub mod config;
pub mod error;
pub mod event_shape;
pub mod jets;
pub mod kinematics;
pub mod metrics;
pub mod neutrino;
pub mod pipeline;
pub mod topreco;

// Cross-module scenario tests
#[cfg(test)]
mod tests;

pub use config::{NeutrinoConfig, ReconConfig, ScorerConfig, SelectionConfig, TruthMatchConfig};
pub use error::ReconError;
pub use event_shape::EventShape;
pub use jets::{BTagWorkingPoint, Jet, JetInput, JetPool};
pub use kinematics::{AngularSeparation, FourMomentum, MissingEt};
pub use metrics::{Histogram, HistogramSink, RecordingSink};
pub use neutrino::{
    FullMassCalculator, MassEstimate, MismatchCode, NeutrinoPzSolver, NeutrinoSolution,
    RootPolicy, TruthReference,
};
pub use pipeline::{record_all, Event, EventReconstructor, EventRecord, NeutrinoRecord};
pub use topreco::{
    ChiSquareScorer, ClassifierScorer, SelectionFailure, SelectionResult, TetrajetBuilder,
    TetrajetSystem, TopCandidate, TopCandidateSelector, Trijet, TrijetDiscriminant,
    TrijetEnumerator, TrijetScorer,
};

/// Result type for reconstruction operations
pub type ReconResult<T> = Result<T, ReconError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        // Inputs
        BTagWorkingPoint,
        Event,
        FourMomentum,
        JetInput,
        JetPool,
        MissingEt,

        // Hadronic path
        ChiSquareScorer,
        SelectionResult,
        TetrajetBuilder,
        TopCandidateSelector,
        TrijetDiscriminant,
        TrijetScorer,

        // Leptonic path
        FullMassCalculator,
        NeutrinoPzSolver,
        RootPolicy,

        // Run level
        EventReconstructor,
        HistogramSink,
        RecordingSink,
        ReconConfig,

        // Result type
        ReconError,
        ReconResult,
    };
}
