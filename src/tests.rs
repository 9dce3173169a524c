//! Scenario Tests for Tetrajet Reconstruction
//!
//! End-to-end checks spanning several modules: the selection invariants over
//! randomised events, the reference physics scenarios, and classifier runs
//! configured from files.

use crate::config::ReconConfig;
use crate::jets::{BTagWorkingPoint, JetInput, JetPool};
use crate::kinematics::{FourMomentum, MissingEt};
use crate::neutrino::{NeutrinoPzSolver, RootPolicy};
use crate::pipeline::{Event, EventReconstructor};
use crate::topreco::{
    ChiSquareScorer, SelectionFailure, TopCandidateSelector, TrijetDiscriminant, TrijetEnumerator,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

fn massless_jet(pt: f64, eta: f64, phi: f64, disc: f64) -> JetInput {
    JetInput {
        momentum: FourMomentum::from_pt_eta_phi_m(pt, eta, phi, 0.0),
        btag_discriminant: disc,
    }
}

fn random_event(rng: &mut StdRng, id: u64) -> Event {
    let n_jets = rng.gen_range(0..11);
    let jets = (0..n_jets)
        .map(|_| JetInput {
            momentum: FourMomentum::from_pt_eta_phi_m(
                rng.gen_range(25.0..250.0),
                rng.gen_range(-2.5..2.5),
                rng.gen_range(-PI..PI),
                rng.gen_range(0.0..12.0),
            ),
            btag_discriminant: rng.gen_range(0.0..1.0),
        })
        .collect();
    Event {
        id,
        jets,
        tau: Some(FourMomentum::from_pt_eta_phi_m(
            rng.gen_range(20.0..120.0),
            rng.gen_range(-2.3..2.3),
            rng.gen_range(-PI..PI),
            1.777,
        )),
        met: MissingEt::from_polar(rng.gen_range(5.0..150.0), rng.gen_range(-PI..PI)),
        truth: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SELECTION INVARIANTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod selection_tests {
    use super::*;

    #[test]
    fn test_passed_events_use_seven_distinct_jets() {
        let mut rng = StdRng::seed_from_u64(2024);
        let events: Vec<Event> = (0..300).map(|id| random_event(&mut rng, id)).collect();
        let reco = EventReconstructor::new(&ReconConfig {
            btag_working_point: "loose".to_string(),
            ..Default::default()
        })
        .unwrap();
        let records = reco.process_events(&events).unwrap();

        let mut n_passed = 0;
        for (event, record) in events.iter().zip(&records) {
            let pool = JetPool::new(&event.jets, BTagWorkingPoint::Loose);
            match record.selection.selected() {
                Some((leading, subleading, free)) => {
                    n_passed += 1;
                    assert!(pool.len() >= 7);
                    assert!(leading.has_btag());
                    assert!(!leading.overlaps(subleading));
                    assert!(!leading.contains(free.index));
                    assert!(!subleading.contains(free.index));
                    assert!(free.is_btagged);
                    let mut used = record.selection.used_indices();
                    used.sort_unstable();
                    used.dedup();
                    assert_eq!(used.len(), 7);
                    assert!(record.tetrajet.is_some());
                }
                None => {
                    assert!(record.selection.failure.is_some());
                    assert!(record.tetrajet.is_none());
                }
            }
        }
        assert!(n_passed > 0, "expected some passing events");
    }

    #[test]
    fn test_fewer_than_three_jets_never_pass() {
        let selector = TopCandidateSelector::default();
        let scorer = ChiSquareScorer::default();
        for n in 0..3 {
            let inputs: Vec<JetInput> = (0..n)
                .map(|i| massless_jet(50.0 + i as f64, 0.0, i as f64, 0.9))
                .collect();
            let pool = JetPool::new(&inputs, BTagWorkingPoint::Medium);
            assert!(TrijetEnumerator::new().enumerate(&pool).is_empty());
            let result = selector.select(&pool, &scorer).unwrap();
            assert!(!result.passed);
            assert_eq!(result.failure, Some(SelectionFailure::TooFewJets));
        }
    }

    /// Two b-jets and a light pair tuned to the W mass
    #[test]
    fn test_four_jets_two_bjets_pick_w_pair_then_fail() {
        let pt: f64 = 60.0;
        let half_dphi = (1.0 - 80.4_f64.powi(2) / (2.0 * pt * pt)).acos() / 2.0;
        let inputs = vec![
            massless_jet(80.0, 0.0, PI, 0.9),
            massless_jet(40.0, 1.5, 2.0, 0.9),
            massless_jet(pt, 0.0, half_dphi, 0.05),
            massless_jet(pt, 0.0, -half_dphi, 0.05),
        ];
        let pool = JetPool::new(&inputs, BTagWorkingPoint::Medium);
        let result = TopCandidateSelector::default()
            .select(&pool, &ChiSquareScorer::default())
            .unwrap();

        let leading = result.leading.unwrap();
        assert_eq!(leading.indices(), [1, 2, 3]);
        assert_eq!(leading.b.index, 1);
        assert!((leading.dijet_mass - 80.4).abs() < 1e-9);

        // Both b-jets cannot be spent and still leave one free
        assert!(!result.passed);
        assert_eq!(result.failure, Some(SelectionFailure::NoDisjointCandidate));
    }

    #[test]
    fn test_scores_are_reproducible() {
        let mut rng = StdRng::seed_from_u64(5);
        let event = random_event(&mut rng, 0);
        let pool = JetPool::new(&event.jets, BTagWorkingPoint::Medium);
        let scorer = ChiSquareScorer::default();
        let trijets = TrijetEnumerator::new().enumerate(&pool);
        let first = scorer.score_all(&trijets).unwrap();
        let second = scorer.score_all(&trijets).unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.discriminant.to_bits(), b.discriminant.to_bits());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// NEUTRINO SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod neutrino_tests {
    use super::*;

    #[test]
    fn test_reference_event_min_angle_is_stable() {
        let tau = FourMomentum::from_pt_eta_phi_m(50.0, 0.0, 0.0, 0.0);
        let bjet = FourMomentum::from_pt_eta_phi_m(60.0, 0.2, 0.1, 0.0);
        let met = MissingEt::new(40.0, 0.0);

        let values: Vec<u64> = (0..5)
            .map(|_| {
                let solver = NeutrinoPzSolver::new(200.0, RootPolicy::MinAngle).unwrap();
                let solution = solver.solve(&tau, &bjet, &met);
                assert!(solution.discriminant >= 0.0);
                solution.pz.to_bits()
            })
            .collect();
        assert!(values.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_roots_satisfy_quadratic_over_random_inputs() {
        let mut rng = StdRng::seed_from_u64(99);
        let solver = NeutrinoPzSolver::new(300.0, RootPolicy::PreferSmaller).unwrap();
        for _ in 0..500 {
            let event = random_event(&mut rng, 0);
            let tau = event.tau.unwrap_or_default();
            let bjet = FourMomentum::from_pt_eta_phi_m(
                rng.gen_range(25.0..200.0),
                rng.gen_range(-2.5..2.5),
                rng.gen_range(-PI..PI),
                4.8,
            );
            let solution = solver.solve(&tau, &bjet, &event.met);
            let q = solution.quadratic;
            if solution.discriminant >= 0.0 {
                for root in solution.roots {
                    // Natural size of the terms, robust when c is tiny
                    let scale = q.magnitude(root) + q.b * q.b / q.a.abs();
                    assert!(q.evaluate(root).abs() / scale < 1e-9);
                }
            } else {
                let real = -q.b / (2.0 * q.a);
                assert!(solution.approximated);
                assert_eq!(solution.roots[0].to_bits(), real.to_bits());
                assert_eq!(solution.roots[1].to_bits(), real.to_bits());
            }
        }
    }

    #[test]
    fn test_pipeline_uses_leading_bjet() {
        let event = Event {
            id: 3,
            jets: vec![
                massless_jet(40.0, 0.0, 0.0, 0.9),
                massless_jet(90.0, 0.5, 1.0, 0.1),
                massless_jet(70.0, -0.5, 2.0, 0.95),
            ],
            tau: Some(FourMomentum::from_pt_eta_phi_m(50.0, 0.0, 0.0, 0.0)),
            met: MissingEt::new(40.0, 0.0),
            truth: None,
        };
        let reco = EventReconstructor::new(&ReconConfig::default()).unwrap();
        let record = reco.reconstruct(&event).unwrap();
        assert_eq!(record.neutrino.unwrap().bjet_index, 2);
        assert_eq!(record.selection.failure, Some(SelectionFailure::NoDisjointCandidate));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CLASSIFIER RUNS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod classifier_tests {
    use super::*;
    use crate::error::ReconError;
    use crate::topreco::classifier::tests::linear_model;
    use crate::topreco::classifier::N_FEATURES;
    use crate::topreco::{ScoreOrdering, TrijetScorer};
    use tempfile::TempDir;

    #[test]
    fn test_classifier_config_end_to_end() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.json");
        let mut w = [0.0; N_FEATURES];
        w[10] = 1.0;
        w[4] = -0.001;
        std::fs::write(&model_path, serde_json::to_string(&linear_model(w, 0.0)).unwrap())
            .unwrap();

        let config = ReconConfig::with_classifier(&model_path);
        let reco = EventReconstructor::new(&config).unwrap();
        assert_eq!(reco.scorer().ordering(), ScoreOrdering::HigherIsBetter);

        let mut rng = StdRng::seed_from_u64(17);
        let event = loop {
            let candidate = random_event(&mut rng, 0);
            if candidate.jets.len() >= 7 {
                break candidate;
            }
        };
        let record = reco.reconstruct(&event).unwrap();

        let pool = JetPool::new(&event.jets, reco.working_point());
        let scored = reco
            .scorer()
            .score_all(&TrijetEnumerator::new().enumerate(&pool))
            .unwrap();
        let best_tagged = scored
            .iter()
            .filter(|c| c.has_btag())
            .map(|c| c.discriminant)
            .fold(f64::NEG_INFINITY, f64::max);
        if let Some(leading) = record.selection.leading {
            assert!((leading.discriminant - best_tagged).abs() < 1e-12);
        } else {
            assert_eq!(best_tagged, f64::NEG_INFINITY);
        }
    }

    #[test]
    fn test_malformed_model_fails_before_events() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.json");
        let mut model = linear_model([0.0; N_FEATURES], 0.0);
        model.layers[0].weights[0].pop();
        std::fs::write(&model_path, serde_json::to_string(&model).unwrap()).unwrap();

        let result = EventReconstructor::new(&ReconConfig::with_classifier(&model_path));
        assert!(matches!(result, Err(ReconError::MalformedModel(_))));
    }

    #[test]
    fn test_chi_square_is_default_scorer() {
        let reco = EventReconstructor::new(&ReconConfig::default()).unwrap();
        assert!(matches!(reco.scorer(), TrijetScorer::ChiSquare(_)));
    }
}
