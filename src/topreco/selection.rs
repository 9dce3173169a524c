//! Two-top selection with cross-cleaning
//!
//! ```text
//!   Init ──► LeadingChosen ──► SubleadingAttempted ──► Done(passed)
//!    │             │                    │
//!    └─────────────┴────────────────────┴──────────► Done(failed)
//! ```
//!
//! 1. **Leading**: lowest-cost candidate containing a b-tagged jet.
//! 2. **Subleading**: lowest-cost candidate sharing no jet with the leading
//!    one, and leaving at least one b-tagged jet outside both.
//! 3. **Free jet**: the highest-p_T b-tagged jet outside both candidates.
//!
//! Each rule is checked against the jets themselves at its own step. Taking the
//! two best global scores does not work, since the runner-up usually shares a
//! jet with the winner. Ties go to the earlier-enumerated triple.

use crate::jets::{Jet, JetPool};
use crate::topreco::scoring::{TopCandidate, TrijetDiscriminant};
use crate::topreco::trijet::TrijetEnumerator;
use crate::ReconResult;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// STATE AND OUTCOME
// ═══════════════════════════════════════════════════════════════════════════════

/// Selector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionState {
    Init,
    LeadingChosen,
    SubleadingAttempted,
    Done,
}

/// Why an event did not yield two tops and a free b-jet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionFailure {
    /// Fewer than three jets, so no triple exists
    TooFewJets,
    /// No triple contains a b-tagged jet
    NoBTaggedCandidate,
    /// Every triple overlaps the leading candidate
    NoDisjointCandidate,
    /// Disjoint triples exist but none leaves a free b-tagged jet
    NoCleanSubleading,
    /// No b-tagged jet outside both candidates
    NoFreeBJet,
}

impl SelectionFailure {
    pub fn all() -> [Self; 5] {
        [
            SelectionFailure::TooFewJets,
            SelectionFailure::NoBTaggedCandidate,
            SelectionFailure::NoDisjointCandidate,
            SelectionFailure::NoCleanSubleading,
            SelectionFailure::NoFreeBJet,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionFailure::TooFewJets => "too_few_jets",
            SelectionFailure::NoBTaggedCandidate => "no_btagged_candidate",
            SelectionFailure::NoDisjointCandidate => "no_disjoint_candidate",
            SelectionFailure::NoCleanSubleading => "no_clean_subleading",
            SelectionFailure::NoFreeBJet => "no_free_bjet",
        }
    }
}

impl fmt::Display for SelectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of the two-top selection
///
/// When `passed` is true the leading and subleading candidates share no jet,
/// and `free_jet` is b-tagged and belongs to neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub passed: bool,
    pub leading: Option<TopCandidate>,
    pub subleading: Option<TopCandidate>,
    pub free_jet: Option<Jet>,
    pub failure: Option<SelectionFailure>,
    /// Number of scored triples considered
    pub n_candidates: usize,
}

impl SelectionResult {
    /// Leading, subleading and free jet when the selection passed
    pub fn selected(&self) -> Option<(&TopCandidate, &TopCandidate, &Jet)> {
        if !self.passed {
            return None;
        }
        match (&self.leading, &self.subleading, &self.free_jet) {
            (Some(l), Some(s), Some(f)) => Some((l, s, f)),
            _ => None,
        }
    }

    /// Pool indices of the seven jets used, in (leading, subleading, free) order
    pub fn used_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(7);
        if let Some(l) = &self.leading {
            out.extend(l.indices());
        }
        if let Some(s) = &self.subleading {
            out.extend(s.indices());
        }
        if let Some(f) = &self.free_jet {
            out.push(f.index);
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Working state of a single selection
struct SelectionRun {
    state: SelectionState,
    leading: Option<TopCandidate>,
    subleading: Option<TopCandidate>,
    free_jet: Option<Jet>,
    failure: Option<SelectionFailure>,
}

impl SelectionRun {
    fn new() -> Self {
        Self {
            state: SelectionState::Init,
            leading: None,
            subleading: None,
            free_jet: None,
            failure: None,
        }
    }

    fn fail(&mut self, failure: SelectionFailure) -> SelectionState {
        self.failure = Some(failure);
        SelectionState::Done
    }
}

/// Chooses the leading and subleading top candidates and the free b-jet
#[derive(Debug, Clone, Default)]
pub struct TopCandidateSelector {
    enumerator: TrijetEnumerator,
    subleading_requires_btag: bool,
}

impl TopCandidateSelector {
    pub fn new(subleading_requires_btag: bool) -> Self {
        Self {
            enumerator: TrijetEnumerator::new(),
            subleading_requires_btag,
        }
    }

    /// Enumerate, score and select in one go
    pub fn select(
        &self,
        pool: &JetPool,
        scorer: &impl TrijetDiscriminant,
    ) -> ReconResult<SelectionResult> {
        let trijets = self.enumerator.enumerate(pool);
        let candidates = scorer.score_all(&trijets)?;
        Ok(self.select_scored(pool, &candidates))
    }

    /// Run the state machine over already-scored candidates
    ///
    /// `candidates` must be in enumeration order and built from `pool`.
    pub fn select_scored(&self, pool: &JetPool, candidates: &[TopCandidate]) -> SelectionResult {
        let mut run = SelectionRun::new();
        if pool.len() < 3 {
            let done = run.fail(SelectionFailure::TooFewJets);
            run.state = done;
        }

        while run.state != SelectionState::Done {
            let current = run.state;
            run.state = match current {
                SelectionState::Init => self.choose_leading(&mut run, candidates),
                SelectionState::LeadingChosen => {
                    self.choose_subleading(&mut run, pool, candidates)
                }
                SelectionState::SubleadingAttempted => self.choose_free_jet(&mut run, pool),
                SelectionState::Done => SelectionState::Done,
            };
        }

        if let Some(failure) = run.failure {
            log::debug!(
                "top selection failed: {} ({} jets, {} candidates)",
                failure,
                pool.len(),
                candidates.len()
            );
        }

        let result = SelectionResult {
            passed: run.failure.is_none(),
            leading: run.leading,
            subleading: run.subleading,
            free_jet: run.free_jet,
            failure: run.failure,
            n_candidates: candidates.len(),
        };
        debug_assert!(!result.passed || Self::invariant_holds(&result));
        result
    }

    fn choose_leading(
        &self,
        run: &mut SelectionRun,
        candidates: &[TopCandidate],
    ) -> SelectionState {
        match best_candidate(candidates.iter().filter(|c| c.has_btag())) {
            Some(leading) => {
                run.leading = Some(*leading);
                SelectionState::LeadingChosen
            }
            None => run.fail(SelectionFailure::NoBTaggedCandidate),
        }
    }

    fn choose_subleading(
        &self,
        run: &mut SelectionRun,
        pool: &JetPool,
        candidates: &[TopCandidate],
    ) -> SelectionState {
        let Some(leading) = run.leading else {
            return run.fail(SelectionFailure::NoBTaggedCandidate);
        };

        let disjoint: Vec<&TopCandidate> = candidates
            .iter()
            .filter(|c| !c.overlaps(&leading))
            .collect();
        if disjoint.is_empty() {
            return run.fail(SelectionFailure::NoDisjointCandidate);
        }

        let clean = disjoint.into_iter().filter(|c| {
            (!self.subleading_requires_btag || c.has_btag())
                && free_bjets(pool, &leading, c).next().is_some()
        });
        match best_candidate(clean) {
            Some(subleading) => {
                run.subleading = Some(*subleading);
                SelectionState::SubleadingAttempted
            }
            None => run.fail(SelectionFailure::NoCleanSubleading),
        }
    }

    fn choose_free_jet(&self, run: &mut SelectionRun, pool: &JetPool) -> SelectionState {
        let (Some(leading), Some(subleading)) = (run.leading, run.subleading) else {
            return run.fail(SelectionFailure::NoCleanSubleading);
        };
        if leading.overlaps(&subleading) {
            return run.fail(SelectionFailure::NoDisjointCandidate);
        }

        let free = free_bjets(pool, &leading, &subleading).fold(None, |best: Option<&Jet>, j| {
            match best {
                Some(b) if b.pt() >= j.pt() => Some(b),
                _ => Some(j),
            }
        });
        match free {
            Some(jet) => {
                run.free_jet = Some(*jet);
                SelectionState::Done
            }
            None => run.fail(SelectionFailure::NoFreeBJet),
        }
    }

    fn invariant_holds(result: &SelectionResult) -> bool {
        match result.selected() {
            Some((l, s, f)) => {
                !l.overlaps(s) && !l.contains(f.index) && !s.contains(f.index) && f.is_btagged
            }
            None => false,
        }
    }
}

/// Lowest-cost candidate; the first one wins ties
fn best_candidate<'a>(
    candidates: impl Iterator<Item = &'a TopCandidate>,
) -> Option<&'a TopCandidate> {
    candidates.fold(None, |best, c| match best {
        Some(b) if !c.cost.total_cmp(&b.cost).is_lt() => Some(b),
        _ => Some(c),
    })
}

/// b-tagged jets used by neither candidate
fn free_bjets<'a>(
    pool: &'a JetPool,
    first: &'a TopCandidate,
    second: &'a TopCandidate,
) -> impl Iterator<Item = &'a Jet> {
    pool.bjets()
        .filter(move |j| !first.contains(j.index) && !second.contains(j.index))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
