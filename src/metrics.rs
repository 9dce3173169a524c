//! # Run Statistics
//!
//! Reconstruction never records anything itself. The pipeline hands each
//! finished event to a [`RecordingSink`], and the bundled [`HistogramSink`]
//! accumulates the distributions and counters below.
//!
//! | Quantity | Source |
//! |----------|--------|
//! | tetrajet mass | [`TetrajetSystem::mass`] |
//! | full mass | [`MassEstimate::mass`] |
//! | leading discriminant | [`TopCandidate::discriminant`](crate::topreco::TopCandidate) |
//! | neutrino p_z | [`NeutrinoSolution::pz`] |
//! | failures by reason | [`SelectionFailure`] |
//! | truth mismatch codes | [`MismatchCode`] |

use crate::config::ScorerConfig;
use crate::neutrino::{MassEstimate, MismatchCode, NeutrinoSolution};
use crate::pipeline::EventRecord;
use crate::topreco::{SelectionFailure, SelectionResult, TetrajetSystem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════════
// SINK INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Consumer of per-event reconstruction output
pub trait RecordingSink {
    fn record_selection(&mut self, selection: &SelectionResult, tetrajet: Option<&TetrajetSystem>);

    fn record_mass(&mut self, solution: &NeutrinoSolution, estimate: &MassEstimate);

    fn record_event(&mut self, record: &EventRecord) {
        self.record_selection(&record.selection, record.tetrajet.as_ref());
        if let Some(nu) = &record.neutrino {
            self.record_mass(&nu.solution, &nu.estimate);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HISTOGRAM
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-width histogram with under/overflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin edges
    pub edges: Vec<f64>,
    /// Bin counts
    pub counts: Vec<u64>,
    /// Total entries, including under/overflow
    pub total: u64,
    pub underflow: u64,
    /// Values at or above the last edge, and non-finite values
    pub overflow: u64,
    /// Finite entries contributing to the moments
    finite: u64,
    sum: f64,
    sum_sq: f64,
}

impl Histogram {
    /// Uniform bins over `[min, max)`; at least one bin is always created
    pub fn new(min: f64, max: f64, n_bins: usize) -> Self {
        let n_bins = n_bins.max(1);
        let step = (max - min) / n_bins as f64;
        let edges: Vec<f64> = (0..=n_bins).map(|i| min + i as f64 * step).collect();
        Self {
            edges,
            counts: vec![0; n_bins],
            total: 0,
            underflow: 0,
            overflow: 0,
            finite: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.counts.len()]
    }

    pub fn fill(&mut self, value: f64) {
        self.total += 1;
        if !value.is_finite() {
            self.overflow += 1;
            return;
        }
        self.finite += 1;
        self.sum += value;
        self.sum_sq += value * value;

        if value < self.min() {
            self.underflow += 1;
            return;
        }
        if value >= self.max() {
            self.overflow += 1;
            return;
        }

        let bin = self.edges.partition_point(|&e| e <= value) - 1;
        if bin < self.counts.len() {
            self.counts[bin] += 1;
        }
    }

    /// Entries inside the binned range
    pub fn in_range(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Mean of all finite entries, under/overflow included
    pub fn mean(&self) -> f64 {
        if self.finite > 0 {
            self.sum / self.finite as f64
        } else {
            0.0
        }
    }

    pub fn variance(&self) -> f64 {
        if self.finite > 1 {
            let mean = self.mean();
            (self.sum_sq / self.finite as f64 - mean * mean).max(0.0)
        } else {
            0.0
        }
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        if bin < self.counts.len() {
            (self.edges[bin] + self.edges[bin + 1]) / 2.0
        } else {
            0.0
        }
    }

    /// Center of the most populated bin; the lowest bin wins ties
    pub fn peak(&self) -> Option<f64> {
        let mut best: Option<(usize, u64)> = None;
        for (bin, &count) in self.counts.iter().enumerate() {
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((bin, count));
            }
        }
        best.map(|(bin, _)| self.bin_center(bin))
    }

    pub fn reset(&mut self) {
        for c in &mut self.counts {
            *c = 0;
        }
        self.total = 0;
        self.underflow = 0;
        self.overflow = 0;
        self.finite = 0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    pub fn summary(&self) -> String {
        format!(
            "n={} mean={:.2} std={:.2} peak={} under={} over={}",
            self.total,
            self.mean(),
            self.std(),
            self.peak()
                .map(|p| format!("{:.1}", p))
                .unwrap_or_else(|| "-".to_string()),
            self.underflow,
            self.overflow
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HISTOGRAM SINK
// ═══════════════════════════════════════════════════════════════════════════════

/// Accumulates distributions and pass/fail bookkeeping over a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramSink {
    pub tetrajet_mass: Histogram,
    pub full_mass: Histogram,
    pub leading_discriminant: Histogram,
    pub neutrino_pz: Histogram,
    pub events: u64,
    pub passed: u64,
    failures: HashMap<SelectionFailure, u64>,
    pub neutrino_solved: u64,
    pub approximated: u64,
    mismatch_codes: [u64; 8],
}

impl Default for HistogramSink {
    fn default() -> Self {
        Self::with_discriminant_range(0.0, 50.0)
    }
}

impl HistogramSink {
    /// Discriminant binning suited to the configured scorer
    pub fn for_scorer(scorer: &ScorerConfig) -> Self {
        match scorer {
            ScorerConfig::ChiSquare { .. } => Self::default(),
            ScorerConfig::Classifier { .. } => Self::with_discriminant_range(0.0, 1.0),
        }
    }

    pub fn with_discriminant_range(min: f64, max: f64) -> Self {
        Self {
            tetrajet_mass: Histogram::new(0.0, 3000.0, 60),
            full_mass: Histogram::new(0.0, 1000.0, 50),
            leading_discriminant: Histogram::new(min, max, 50),
            neutrino_pz: Histogram::new(-1000.0, 1000.0, 50),
            events: 0,
            passed: 0,
            failures: HashMap::new(),
            neutrino_solved: 0,
            approximated: 0,
            mismatch_codes: [0; 8],
        }
    }

    pub fn failures(&self, reason: SelectionFailure) -> u64 {
        self.failures.get(&reason).copied().unwrap_or(0)
    }

    pub fn mismatch_count(&self, code: MismatchCode) -> u64 {
        self.mismatch_codes[code.bits() as usize]
    }

    pub fn pass_fraction(&self) -> f64 {
        if self.events > 0 {
            self.passed as f64 / self.events as f64
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "═══════════════════════════════════════════════════════════════\n\
             TETRAJET RECONSTRUCTION SUMMARY\n\
             ═══════════════════════════════════════════════════════════════\n\
             Events: {}  passed: {} ({:.1}%)\n",
            self.events,
            self.passed,
            100.0 * self.pass_fraction()
        );
        for reason in SelectionFailure::all() {
            out.push_str(&format!("  fail {:<22} {}\n", reason.name(), self.failures(reason)));
        }
        out.push_str(&format!(
            "Tetrajet mass:        {}\n\
             Leading discriminant: {}\n\
             Neutrino solved: {}  approximated: {}\n\
             Full mass:            {}\n\
             Neutrino p_z:         {}\n",
            self.tetrajet_mass.summary(),
            self.leading_discriminant.summary(),
            self.neutrino_solved,
            self.approximated,
            self.full_mass.summary(),
            self.neutrino_pz.summary(),
        ));
        if self.mismatch_codes.iter().any(|&c| c > 0) {
            out.push_str("Truth mismatch codes:\n");
            for code in MismatchCode::all() {
                out.push_str(&format!(
                    "  {} {:<20} {}\n",
                    code.bits(),
                    code.label(),
                    self.mismatch_count(code)
                ));
            }
        }
        out.push_str("═══════════════════════════════════════════════════════════════");
        out
    }
}

impl RecordingSink for HistogramSink {
    fn record_selection(&mut self, selection: &SelectionResult, tetrajet: Option<&TetrajetSystem>) {
        self.events += 1;
        if let Some(leading) = &selection.leading {
            self.leading_discriminant.fill(leading.discriminant);
        }
        if selection.passed {
            self.passed += 1;
        } else if let Some(reason) = selection.failure {
            *self.failures.entry(reason).or_insert(0) += 1;
        }
        if let Some(system) = tetrajet {
            self.tetrajet_mass.fill(system.mass);
        }
    }

    fn record_mass(&mut self, solution: &NeutrinoSolution, estimate: &MassEstimate) {
        self.neutrino_solved += 1;
        if solution.approximated {
            self.approximated += 1;
        }
        self.neutrino_pz.fill(solution.pz);
        self.full_mass.fill(estimate.mass);
        if let Some(code) = estimate.code {
            self.mismatch_codes[code.bits() as usize] += 1;
        }
    }
}
