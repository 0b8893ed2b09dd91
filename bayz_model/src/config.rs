// Data-driven configuration for fitting and generation.
//
// Every tunable lives here, loaded from JSON with per-field defaults so a
// config file only needs to name what it changes. The CLI entry points load a
// `BayzConfig` (or start from `Default`) and then apply command-line flags on
// top.
//
// `TypeModelConfig` is validated by `TypeModel::new`; an empty n-gram order
// list or a bad smoothing constant is rejected there, at construction time,
// rather than when probabilities are first queried.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ngram::{DEFAULT_SMOOTHING, NGramOrder};

/// Parameters of the type model (mixture fit + n-gram conditioning).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeModelConfig {
    /// Upper bound on mixture components; the fit may prune below it.
    pub n_components: usize,
    /// Additive smoothing per n-gram order per candidate.
    pub smoothing: f64,
    /// N-gram orders summed by `conditional_probability`.
    pub ngram_orders: Vec<NGramOrder>,
    /// When false, `emit` always draws straight from the component Gaussian.
    pub conditional: bool,
    /// Whether an empty history still goes through the conditioned branch
    /// (smoothing-only n-gram mass). When false, empty history draws from the
    /// Gaussian directly.
    pub condition_empty_history: bool,
    /// Lloyd iterations for the k-means stage of fitting.
    pub max_fit_iterations: usize,
    /// Added to every fitted covariance diagonal.
    pub reg_covar: f64,
    /// Seed for the stochastic steps of fitting.
    pub fit_seed: u64,
}

impl Default for TypeModelConfig {
    fn default() -> Self {
        Self {
            n_components: 32,
            smoothing: DEFAULT_SMOOTHING,
            ngram_orders: NGramOrder::ALL.to_vec(),
            conditional: true,
            condition_empty_history: true,
            max_fit_iterations: 100,
            reg_covar: 1e-6,
            fit_seed: 0,
        }
    }
}

/// Parameters of sequence generation and caching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sequences generated eagerly when a cache is built.
    pub pre_gen: usize,
    /// Shortest sequence a type source may draw.
    pub min_length: usize,
    /// Longest sequence a type source may draw.
    pub max_length: usize,
    /// Splits a decoded word into simultaneous sub-symbols.
    pub delimiter: String,
    /// RNG seed for generation. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            pre_gen: 3,
            min_length: 8,
            max_length: 16,
            delimiter: "_".into(),
            seed: None,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.min_length > self.max_length {
            return Err(ModelError::InvalidConfig(format!(
                "min_length {} exceeds max_length {}",
                self.min_length, self.max_length
            )));
        }
        if self.delimiter.is_empty() {
            return Err(ModelError::InvalidConfig("delimiter must not be empty".into()));
        }
        Ok(())
    }
}

/// Top-level config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayzConfig {
    pub model: TypeModelConfig,
    pub generation: GenerationConfig,
}

impl BayzConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read_to_string(path)?;
        let config: BayzConfig = serde_json::from_str(&data)?;
        config.generation.validate()?;
        Ok(config)
    }
}
