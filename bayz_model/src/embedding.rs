// Embedding store: the fixed token vocabulary and its vectors.
//
// The word embedding is trained elsewhere; this module only defines what the
// type model needs from it (`EmbeddingStore`) and a plain in-memory
// implementation (`KeyedVectors`) loaded from JSON.
//
// Vocabulary order matters: the type model's per-component density cache is a
// list parallel to `vocabulary()`, so an implementation must return the same
// order on every call. `KeyedVectors` keeps insertion order.
//
// Decoding uses cosine similarity, and ties keep vocabulary order (stable
// sort), so the first-listed token wins an exact tie.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Read-only view of a token embedding.
pub trait EmbeddingStore {
    /// Length of every vector in the store.
    fn dimension(&self) -> usize;

    /// Every token, in a stable order.
    fn vocabulary(&self) -> &[String];

    /// Vector for `token`, if the token is in the vocabulary.
    fn vector_of(&self, token: &str) -> Option<ArrayView1<'_, f64>>;

    /// Up to `top_n` tokens closest to `vector`, best first, with their scores.
    fn nearest_token(&self, vector: ArrayView1<'_, f64>, top_n: usize) -> Vec<(String, f64)>;
}

/// Token vectors held in memory, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KeyedVectorsFile", into = "KeyedVectorsFile")]
pub struct KeyedVectors {
    dimension: usize,
    tokens: Vec<String>,
    /// One row per token, parallel to `tokens`.
    vectors: Array2<f64>,
    index: HashMap<String, usize>,
}

/// On-disk layout: parallel token and vector lists.
#[derive(Serialize, Deserialize)]
struct KeyedVectorsFile {
    dimension: usize,
    tokens: Vec<String>,
    vectors: Vec<Vec<f64>>,
}

impl KeyedVectors {
    /// Build a store from `(token, vector)` pairs. Every vector must have
    /// length `dimension` and tokens must be unique.
    pub fn new(
        dimension: usize,
        entries: impl IntoIterator<Item = (String, Vec<f64>)>,
    ) -> Result<Self, ModelError> {
        let mut store = Self {
            dimension,
            tokens: Vec::new(),
            vectors: Array2::zeros((0, dimension)),
            index: HashMap::new(),
        };
        for (token, vector) in entries {
            store.insert(token, vector)?;
        }
        Ok(store)
    }

    fn insert(&mut self, token: String, vector: Vec<f64>) -> Result<(), ModelError> {
        if vector.len() != self.dimension {
            return Err(ModelError::dimension_mismatch(self.dimension, vector.len()));
        }
        if self.index.contains_key(&token) {
            return Err(ModelError::InvalidConfig(format!(
                "duplicate token {token:?} in embedding"
            )));
        }
        self.vectors
            .push_row(ArrayView1::from(&vector))
            .map_err(|e| ModelError::InvalidConfig(e.to_string()))?;
        self.index.insert(token.clone(), self.tokens.len());
        self.tokens.push(token);
        Ok(())
    }

    /// Load from a JSON keyed-vector file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read_to_string(path)?;
        let store: KeyedVectors = serde_json::from_str(&data)?;
        tracing::info!(
            path = %path.display(),
            tokens = store.len(),
            dimension = store.dimension,
            "loaded embedding"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every vector as one row, parallel to `vocabulary()`.
    pub fn vectors(&self) -> &Array2<f64> {
        &self.vectors
    }
}

impl EmbeddingStore for KeyedVectors {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vocabulary(&self) -> &[String] {
        &self.tokens
    }

    fn vector_of(&self, token: &str) -> Option<ArrayView1<'_, f64>> {
        self.index.get(token).map(|&i| self.vectors.row(i))
    }

    fn nearest_token(&self, vector: ArrayView1<'_, f64>, top_n: usize) -> Vec<(String, f64)> {
        if vector.len() != self.dimension {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| (i, cosine_similarity(vector, candidate)))
            .collect();
        // Stable: equal scores keep vocabulary order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .take(top_n)
            .map(|(i, score)| (self.tokens[i].clone(), score))
            .collect()
    }
}

impl TryFrom<KeyedVectorsFile> for KeyedVectors {
    type Error = ModelError;

    fn try_from(file: KeyedVectorsFile) -> Result<Self, Self::Error> {
        if file.tokens.len() != file.vectors.len() {
            return Err(ModelError::InvalidConfig(format!(
                "embedding lists {} tokens but {} vectors",
                file.tokens.len(),
                file.vectors.len()
            )));
        }
        KeyedVectors::new(file.dimension, file.tokens.into_iter().zip(file.vectors))
    }
}

impl From<KeyedVectors> for KeyedVectorsFile {
    fn from(store: KeyedVectors) -> Self {
        Self {
            dimension: store.dimension,
            tokens: store.tokens,
            vectors: store.vectors.rows().into_iter().map(|row| row.to_vec()).collect(),
        }
    }
}

/// Cosine similarity; zero when either vector has zero length.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        a.dot(&b) / (norm_a * norm_b)
    }
}
