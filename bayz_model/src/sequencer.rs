// Turns component-id sequences into decoded token sequences.
//
// Each step emits a vector from the type model conditioned on the words
// decoded so far, decodes it to the nearest vocabulary word, and feeds that
// word back into the history. Steps are strictly sequential within a run.
//
// A decoded word may stand for several simultaneous symbols (a chord, say),
// written with a delimiter between them: `C_E_G`. The sequencer keeps raw
// words in the history and hands callers the split form. Splitting is a plain
// string split, so doubled or trailing delimiters leave empty sub-symbols in
// place; downstream pitch conversion skips them.

use std::sync::Arc;

use ndarray::ArrayView1;
use rand::Rng;

use crate::embedding::EmbeddingStore;
use crate::error::ModelError;
use crate::type_model::TypeModel;

/// One decoded word split into its sub-symbols.
pub type Token = Vec<String>;

/// Nearest vocabulary word to `vector`.
pub fn decode<E: EmbeddingStore + ?Sized>(
    embedding: &E,
    vector: ArrayView1<'_, f64>,
) -> Result<String, ModelError> {
    if vector.len() != embedding.dimension() {
        return Err(ModelError::dimension_mismatch(embedding.dimension(), vector.len()));
    }
    embedding
        .nearest_token(vector, 1)
        .into_iter()
        .next()
        .map(|(token, _)| token)
        .ok_or(ModelError::EmptyVocabulary)
}

pub struct Sequencer<E> {
    model: Arc<TypeModel<E>>,
    delimiter: String,
}

impl<E: EmbeddingStore> Sequencer<E> {
    pub fn new(model: Arc<TypeModel<E>>, delimiter: impl Into<String>) -> Self {
        Self {
            model,
            delimiter: delimiter.into(),
        }
    }

    /// Emit and decode one word per id, conditioning each step on the
    /// words before it.
    pub fn realize_words<R: Rng + ?Sized>(
        &self,
        ids: &[usize],
        rng: &mut R,
    ) -> Result<Vec<String>, ModelError> {
        let mut history: Vec<String> = Vec::with_capacity(ids.len());
        for &id in ids {
            let vector = self.model.emit(id, &history, rng)?;
            let word = decode(self.model.embedding(), vector.view())?;
            history.push(word);
        }
        tracing::debug!(steps = ids.len(), "realized sequence");
        Ok(history)
    }

    /// Like `realize_words`, with every word split on the delimiter.
    pub fn realize<R: Rng + ?Sized>(
        &self,
        ids: &[usize],
        rng: &mut R,
    ) -> Result<Vec<Token>, ModelError> {
        Ok(self
            .realize_words(ids, rng)?
            .iter()
            .map(|word| self.split(word))
            .collect())
    }

    pub fn split(&self, word: &str) -> Token {
        word.split(self.delimiter.as_str()).map(str::to_string).collect()
    }

    pub fn model(&self) -> &Arc<TypeModel<E>> {
        &self.model
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}
