//! Run configuration
//!
//! Everything here is checked once, before the first event, by
//! [`ReconConfig::validate`]. A configuration that passes validation cannot
//! make per-event reconstruction fail.

use crate::error::ReconError;
use crate::jets::BTagWorkingPoint;
use crate::neutrino::RootPolicy;
use crate::ReconResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-candidate scoring mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScorerConfig {
    /// Mass-constrained χ² against W and top hypotheses
    ChiSquare {
        w_mass: f64,
        w_width: f64,
        top_mass: f64,
        top_width: f64,
    },
    /// Pre-trained classifier loaded from a JSON model file
    Classifier { model_path: PathBuf },
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig::ChiSquare {
            w_mass: 80.4,
            w_width: 10.0,
            top_mass: 172.5,
            top_width: 15.0,
        }
    }
}

impl ScorerConfig {
    pub fn validate(&self) -> ReconResult<()> {
        match self {
            ScorerConfig::ChiSquare {
                w_mass,
                w_width,
                top_mass,
                top_width,
            } => {
                for (name, value) in [
                    ("w_mass", w_mass),
                    ("w_width", w_width),
                    ("top_mass", top_mass),
                    ("top_width", top_width),
                ] {
                    if !value.is_finite() || *value <= 0.0 {
                        return Err(ReconError::InvalidParameter(format!(
                            "{} must be positive and finite, got {}",
                            name, value
                        )));
                    }
                }
                Ok(())
            }
            ScorerConfig::Classifier { model_path } => {
                if model_path.as_os_str().is_empty() {
                    return Err(ReconError::InvalidParameter(
                        "classifier model_path is empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Two-top selection options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Also require a b-tagged jet inside the subleading triple
    #[serde(default)]
    pub subleading_requires_btag: bool,
}

/// Neutrino p_z solver options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeutrinoConfig {
    /// Mass of the (tau + b + neutrino) resonance hypothesis in GeV
    pub resonance_mass: f64,
    /// Root choice when the quadratic has two real solutions
    pub root_policy: RootPolicy,
}

impl Default for NeutrinoConfig {
    fn default() -> Self {
        Self {
            resonance_mass: 200.0,
            root_policy: RootPolicy::MinAngle,
        }
    }
}

impl NeutrinoConfig {
    pub fn validate(&self) -> ReconResult<()> {
        if !self.resonance_mass.is_finite() || self.resonance_mass <= 0.0 {
            return Err(ReconError::InvalidParameter(format!(
                "resonance_mass must be positive and finite, got {}",
                self.resonance_mass
            )));
        }
        Ok(())
    }
}

/// Generator-level matching tolerances (diagnostic path only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthMatchConfig {
    /// Maximum ΔR between a reconstructed object and its truth partner
    pub max_delta_r: f64,
    /// Maximum |Δφ| between reconstructed MET and the true neutrino
    pub met_max_delta_phi: f64,
    /// Maximum |MET − p_T(ν)| / p_T(ν)
    pub met_max_relative_pt: f64,
}

impl Default for TruthMatchConfig {
    fn default() -> Self {
        Self {
            max_delta_r: 0.4,
            met_max_delta_phi: 0.4,
            met_max_relative_pt: 0.3,
        }
    }
}

impl TruthMatchConfig {
    pub fn validate(&self) -> ReconResult<()> {
        for (name, value) in [
            ("max_delta_r", self.max_delta_r),
            ("met_max_delta_phi", self.met_max_delta_phi),
            ("met_max_relative_pt", self.met_max_relative_pt),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ReconError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Complete reconstruction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Working point name (`loose`, `medium`, `tight`) or numeric threshold
    #[serde(
        default = "default_working_point",
        deserialize_with = "deserialize_working_point"
    )]
    pub btag_working_point: String,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub neutrino: NeutrinoConfig,
    #[serde(default)]
    pub truth_matching: TruthMatchConfig,
}

fn default_working_point() -> String {
    BTagWorkingPoint::default().name()
}

/// Name or bare number as written in the config file
#[derive(Deserialize)]
#[serde(untagged)]
enum WorkingPointField {
    Name(String),
    Threshold(f64),
}

fn deserialize_working_point<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WorkingPointField::deserialize(deserializer)? {
        WorkingPointField::Name(name) => name,
        WorkingPointField::Threshold(threshold) => threshold.to_string(),
    })
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            btag_working_point: default_working_point(),
            scorer: ScorerConfig::default(),
            selection: SelectionConfig::default(),
            neutrino: NeutrinoConfig::default(),
            truth_matching: TruthMatchConfig::default(),
        }
    }
}

impl ReconConfig {
    /// Default χ² setup with a tighter tagger and the stricter subleading rule
    pub fn tight() -> Self {
        Self {
            btag_working_point: "tight".to_string(),
            selection: SelectionConfig {
                subleading_requires_btag: true,
            },
            ..Default::default()
        }
    }

    /// Classifier scoring with the given model file
    pub fn with_classifier(model_path: impl Into<PathBuf>) -> Self {
        Self {
            scorer: ScorerConfig::Classifier {
                model_path: model_path.into(),
            },
            ..Default::default()
        }
    }

    /// Parsed b-tag working point
    pub fn working_point(&self) -> ReconResult<BTagWorkingPoint> {
        self.btag_working_point.parse()
    }

    /// Check every parameter, failing on the first invalid one
    pub fn validate(&self) -> ReconResult<()> {
        let wp = self.working_point()?;
        if wp.threshold() <= 0.0 {
            log::warn!(
                "b-tag threshold {} tags every jet with a positive discriminant",
                wp.threshold()
            );
        }
        self.scorer.validate()?;
        self.neutrino.validate()?;
        self.truth_matching.validate()?;
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> ReconResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("Loaded reconstruction config from {:?}", path);
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> ReconResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
