//! # Per-Event Driver
//!
//! Runs both reconstruction paths on one event:
//!
//! ```text
//!   Event ──► JetPool ──┬──► score + select ──► TetrajetBuilder      (hadronic)
//!                       └──► leading b-jet ─┐
//!             τ, MET ───────────────────────┴──► FullMassCalculator  (leptonic)
//! ```
//!
//! Events are independent, so [`EventReconstructor::process_events`] fans them
//! out over rayon and collects the records in input order.

use crate::config::ReconConfig;
use crate::event_shape::EventShape;
use crate::jets::{BTagWorkingPoint, JetInput, JetPool};
use crate::kinematics::{FourMomentum, MissingEt};
use crate::metrics::RecordingSink;
use crate::neutrino::{
    FullMassCalculator, MassEstimate, NeutrinoPzSolver, NeutrinoSolution, TruthReference,
};
use crate::topreco::{
    SelectionResult, TetrajetBuilder, TetrajetSystem, TopCandidateSelector, TrijetDiscriminant,
    TrijetScorer,
};
use crate::ReconResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One event as delivered by the upstream object selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: u64,
    pub jets: Vec<JetInput>,
    #[serde(default)]
    pub tau: Option<FourMomentum>,
    #[serde(default)]
    pub met: MissingEt,
    #[serde(default)]
    pub truth: Option<TruthReference>,
}

impl Event {
    /// Read a JSON array of events
    pub fn load_json(path: impl AsRef<Path>) -> ReconResult<Vec<Event>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let events: Vec<Event> = serde_json::from_str(&text)?;
        log::info!("Loaded {} events from {:?}", events.len(), path);
        Ok(events)
    }
}

/// Leptonic-side output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeutrinoRecord {
    /// Pool index of the b-jet paired with the tau
    pub bjet_index: usize,
    pub solution: NeutrinoSolution,
    pub estimate: MassEstimate,
}

/// Everything reconstructed for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    pub n_jets: usize,
    pub n_btagged: usize,
    pub selection: SelectionResult,
    /// Present only when the selection passed
    pub tetrajet: Option<TetrajetSystem>,
    /// Absent without a tau or a b-tagged jet
    pub neutrino: Option<NeutrinoRecord>,
    pub shape: EventShape,
}

/// Reconstruction setup built once per run
#[derive(Debug, Clone)]
pub struct EventReconstructor {
    working_point: BTagWorkingPoint,
    scorer: TrijetScorer,
    selector: TopCandidateSelector,
    builder: TetrajetBuilder,
    mass: FullMassCalculator,
    parallel: bool,
}

impl EventReconstructor {
    /// Validates the configuration and loads the classifier if one is configured
    pub fn new(config: &ReconConfig) -> ReconResult<Self> {
        config.validate()?;
        let solver =
            NeutrinoPzSolver::new(config.neutrino.resonance_mass, config.neutrino.root_policy)?;
        let reconstructor = Self {
            working_point: config.working_point()?,
            scorer: TrijetScorer::from_config(&config.scorer)?,
            selector: TopCandidateSelector::new(config.selection.subleading_requires_btag),
            builder: TetrajetBuilder::new(),
            mass: FullMassCalculator::new(solver, config.truth_matching.clone()),
            parallel: true,
        };
        log::info!(
            "Reconstructor ready: b-tag {} ({:.4}), scorer {}, M = {} GeV, policy {}",
            reconstructor.working_point,
            reconstructor.working_point.threshold(),
            reconstructor.scorer.name(),
            solver.resonance_mass(),
            solver.policy().name()
        );
        Ok(reconstructor)
    }

    /// Toggle rayon fan-out in [`process_events`](Self::process_events)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn working_point(&self) -> BTagWorkingPoint {
        self.working_point
    }

    pub fn scorer(&self) -> &TrijetScorer {
        &self.scorer
    }

    pub fn reconstruct(&self, event: &Event) -> ReconResult<EventRecord> {
        let pool = JetPool::new(&event.jets, self.working_point);

        let selection = self.selector.select(&pool, &self.scorer)?;
        let tetrajet = if selection.passed {
            Some(self.builder.build(&selection)?)
        } else {
            log::debug!(
                "event {}: selection failed ({})",
                event.id,
                selection.failure.map(|f| f.name()).unwrap_or("unknown")
            );
            None
        };

        let neutrino = match (event.tau, pool.leading_bjet()) {
            (Some(tau), Some(bjet)) => {
                let (solution, estimate) = match &event.truth {
                    Some(truth) => {
                        self.mass
                            .estimate_with_truth(&tau, &bjet.momentum, &event.met, truth)
                    }
                    None => self.mass.estimate(&tau, &bjet.momentum, &event.met),
                };
                Some(NeutrinoRecord {
                    bjet_index: bjet.index,
                    solution,
                    estimate,
                })
            }
            _ => None,
        };

        Ok(EventRecord {
            id: event.id,
            n_jets: pool.len(),
            n_btagged: pool.n_btagged(),
            selection,
            tetrajet,
            neutrino,
            shape: EventShape::from_jets(pool.jets()),
        })
    }

    /// Reconstruct a batch, keeping input order; the first error aborts the run
    pub fn process_events(&self, events: &[Event]) -> ReconResult<Vec<EventRecord>> {
        let records = if self.parallel {
            events
                .par_iter()
                .map(|event| self.reconstruct(event))
                .collect::<ReconResult<Vec<_>>>()?
        } else {
            events
                .iter()
                .map(|event| self.reconstruct(event))
                .collect::<ReconResult<Vec<_>>>()?
        };
        let passed = records.iter().filter(|r| r.selection.passed).count();
        log::info!("Reconstructed {} events, {} passed selection", records.len(), passed);
        Ok(records)
    }
}

/// Feed a batch of records to a sink in order
pub fn record_all<S: RecordingSink + ?Sized>(sink: &mut S, records: &[EventRecord]) {
    for record in records {
        sink.record_event(record);
    }
}
