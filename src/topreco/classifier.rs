//! Classifier-based trijet scoring
//!
//! A small feed-forward network stored as JSON:
//!
//! ```json
//! {
//!   "feature_means":  [11 numbers],
//!   "feature_scales": [11 numbers],
//!   "layers": [
//!     { "weights": [[...], ...], "bias": [...], "activation": "relu" },
//!     { "weights": [[...]],      "bias": [b],   "activation": "sigmoid" }
//!   ]
//! }
//! ```
//!
//! `weights` is `out × in`. Inputs are standardised as `(x − mean) / scale`
//! before the first layer. The last layer must have a single output, which is
//! the discriminant (higher is better).
//!
//! Layers run as `candle_nn::Linear` on the CPU in f64, so the same model gives
//! bit-identical scores on every call.

use crate::error::ReconError;
use crate::topreco::scoring::{ScoreOrdering, TrijetDiscriminant};
use crate::topreco::trijet::Trijet;
use crate::ReconResult;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Length of the trijet feature vector
pub const N_FEATURES: usize = 11;

/// Feature names in vector order
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "dr_l1_l2",
    "dr_b_l1",
    "dr_b_l2",
    "m_dijet",
    "m_trijet",
    "pt_l1",
    "pt_l2",
    "pt_b",
    "btag_l1",
    "btag_l2",
    "btag_b",
];

/// Kinematic features of one b-jet assignment inside a triple
///
/// `b_position` must be below 3.
pub fn trijet_features(trijet: &Trijet, b_position: usize) -> [f64; N_FEATURES] {
    let [l1, l2] = trijet.light_pair(b_position);
    let b = trijet.jets[b_position];
    [
        l1.momentum.delta_r(&l2.momentum),
        b.momentum.delta_r(&l1.momentum),
        b.momentum.delta_r(&l2.momentum),
        (l1.momentum + l2.momentum).mass(),
        trijet.momentum().mass(),
        l1.pt(),
        l2.pt(),
        b.pt(),
        l1.btag_discriminant,
        l2.btag_discriminant,
        b.btag_discriminant,
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZED MODEL
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(&self, x: Tensor) -> candle_core::Result<Tensor> {
        match self {
            Activation::Linear => Ok(x),
            Activation::Relu => x.relu(),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => x.neg()?.exp()?.affine(1.0, 1.0)?.recip(),
        }
    }
}

/// One dense layer as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn n_inputs(&self) -> usize {
        self.weights.first().map(|r| r.len()).unwrap_or(0)
    }

    fn n_outputs(&self) -> usize {
        self.weights.len()
    }
}

/// Serialized classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub feature_means: Vec<f64>,
    pub feature_scales: Vec<f64>,
    pub layers: Vec<DenseLayer>,
}

impl ClassifierModel {
    /// Check shapes and values; every failure is a configuration error
    pub fn validate(&self) -> ReconResult<()> {
        if self.feature_means.len() != N_FEATURES {
            return Err(ReconError::FeatureMismatch {
                expected: N_FEATURES,
                got: self.feature_means.len(),
            });
        }
        if self.feature_scales.len() != N_FEATURES {
            return Err(ReconError::FeatureMismatch {
                expected: N_FEATURES,
                got: self.feature_scales.len(),
            });
        }
        if self.feature_means.iter().any(|m| !m.is_finite()) {
            return Err(ReconError::MalformedModel(
                "non-finite feature mean".to_string(),
            ));
        }
        if self
            .feature_scales
            .iter()
            .any(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(ReconError::MalformedModel(
                "feature scales must be finite and non-zero".to_string(),
            ));
        }
        if self.layers.is_empty() {
            return Err(ReconError::MalformedModel("model has no layers".to_string()));
        }

        let mut width = N_FEATURES;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.n_outputs() == 0 {
                return Err(ReconError::MalformedModel(format!("layer {} is empty", i)));
            }
            if layer.weights.iter().any(|row| row.len() != width) {
                return Err(ReconError::MalformedModel(format!(
                    "layer {} expects {} inputs per row",
                    i, width
                )));
            }
            if layer.bias.len() != layer.n_outputs() {
                return Err(ReconError::MalformedModel(format!(
                    "layer {} has {} outputs but {} biases",
                    i,
                    layer.n_outputs(),
                    layer.bias.len()
                )));
            }
            let finite = layer.bias.iter().all(|b| b.is_finite())
                && layer.weights.iter().flatten().all(|w| w.is_finite());
            if !finite {
                return Err(ReconError::MalformedModel(format!(
                    "layer {} has non-finite parameters",
                    i
                )));
            }
            width = layer.n_outputs();
        }
        if width != 1 {
            return Err(ReconError::MalformedModel(format!(
                "final layer must have 1 output, has {}",
                width
            )));
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ReconResult<Self> {
        let text = fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&text)?;
        model.validate()?;
        Ok(model)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCORER
// ═══════════════════════════════════════════════════════════════════════════════

/// Trijet scorer backed by a [`ClassifierModel`]
#[derive(Debug, Clone)]
pub struct ClassifierScorer {
    means: Vec<f64>,
    scales: Vec<f64>,
    layers: Vec<(Linear, Activation)>,
    device: Device,
}

impl ClassifierScorer {
    /// Validate the model and move its parameters into tensors
    pub fn from_model(model: &ClassifierModel) -> ReconResult<Self> {
        model.validate()?;
        let device = Device::Cpu;
        let mut layers = Vec::with_capacity(model.layers.len());
        for layer in &model.layers {
            let flat: Vec<f64> = layer.weights.iter().flatten().copied().collect();
            let weight = Tensor::from_vec(flat, (layer.n_outputs(), layer.n_inputs()), &device)?;
            let bias = Tensor::from_vec(layer.bias.clone(), layer.n_outputs(), &device)?;
            layers.push((Linear::new(weight, Some(bias)), layer.activation));
        }
        Ok(Self {
            means: model.feature_means.clone(),
            scales: model.feature_scales.clone(),
            layers,
            device,
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ReconResult<Self> {
        let path = path.as_ref();
        let model = ClassifierModel::from_json_file(path)?;
        log::info!(
            "Loaded trijet classifier from {:?} ({} layers)",
            path,
            model.layers.len()
        );
        Self::from_model(&model)
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    /// Network output for a raw (unstandardised) feature vector
    pub fn evaluate(&self, features: &[f64]) -> ReconResult<f64> {
        if features.len() != N_FEATURES {
            return Err(ReconError::FeatureMismatch {
                expected: N_FEATURES,
                got: features.len(),
            });
        }
        let standardised: Vec<f64> = features
            .iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();

        let mut x = Tensor::from_vec(standardised, (1, N_FEATURES), &self.device)?;
        for (linear, activation) in &self.layers {
            x = activation.apply(linear.forward(&x)?)?;
        }
        let out: Vec<f64> = x.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;
        out.first()
            .copied()
            .ok_or_else(|| ReconError::MalformedModel("empty network output".to_string()))
    }
}

impl TrijetDiscriminant for ClassifierScorer {
    fn ordering(&self) -> ScoreOrdering {
        ScoreOrdering::HigherIsBetter
    }

    fn assignment_score(&self, trijet: &Trijet, b_position: usize) -> ReconResult<f64> {
        trijet.check_b_position(b_position)?;
        self.evaluate(&trijet_features(trijet, b_position))
    }

    fn name(&self) -> &'static str {
        "classifier"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
