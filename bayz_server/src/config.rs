// Configuration for the `bayz-live` session, loaded from JSON.
//
// Paths name the embedding, the fitted model, and optionally the training
// corpus (used to fit a Markov chain over type ids). Command-line flags in
// `main.rs` override the file.

use std::path::{Path, PathBuf};

use bayz_model::{BayzConfig, ModelError};
use bayz_protocol::DEFAULT_CYCLE_LENGTH;
use serde::{Deserialize, Serialize};

use crate::band::LineOptions;
use crate::server::ServerConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub server: ServerConfig,
    pub embedding_path: PathBuf,
    pub model_path: PathBuf,
    pub corpus_path: Option<PathBuf>,
    pub bayz: BayzConfig,
    pub cycle_length: f64,
    pub line: LineOptions,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding_path: "save/embedding.json".into(),
            model_path: "save/model.json".into(),
            corpus_path: None,
            bayz: BayzConfig::default(),
            cycle_length: DEFAULT_CYCLE_LENGTH,
            line: LineOptions::default(),
        }
    }
}

impl LiveConfig {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read_to_string(path)?;
        let config: LiveConfig = serde_json::from_str(&data)?;
        config.bayz.generation.validate()?;
        Ok(config)
    }
}
