// Generation cache: pre-generated sequences behind a read cursor.
//
// Sampling a sequence takes one emission per step, each of which weighs the
// whole vocabulary. The cache moves that cost off the request path: it fills
// `pre_gen` sequences up front and afterwards generates only when the cursor
// runs past the end of the buffer.
//
// Invariant: `cursor <= buffer.len()`. `next` always leaves a sequence at the
// old cursor position before advancing. `rewind` replays the buffer in order;
// `reset` throws it away.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::GenerationConfig;
use crate::embedding::EmbeddingStore;
use crate::error::ModelError;
use crate::sequencer::{Sequencer, Token};
use crate::type_source::TypeSource;

/// All tokens of one generation run.
pub type CachedSequence = Vec<Token>;

pub struct GenerationCache<E, S> {
    sequencer: Sequencer<E>,
    source: S,
    rng: StdRng,
    buffer: Vec<CachedSequence>,
    cursor: usize,
    /// Sampling events since construction.
    generated: usize,
}

impl<E: EmbeddingStore, S: TypeSource> GenerationCache<E, S> {
    /// Build the cache and eagerly generate `pre_gen` sequences.
    pub fn new(
        sequencer: Sequencer<E>,
        source: S,
        pre_gen: usize,
        rng: StdRng,
    ) -> Result<Self, ModelError> {
        let mut cache = Self {
            sequencer,
            source,
            rng,
            buffer: Vec::with_capacity(pre_gen),
            cursor: 0,
            generated: 0,
        };
        for _ in 0..pre_gen {
            let sequence = cache.generate()?;
            cache.buffer.push(sequence);
        }
        tracing::info!(pre_gen, "generation cache ready");
        Ok(cache)
    }

    /// Build from a generation config: its `pre_gen` and `seed` (OS entropy
    /// when unset).
    pub fn from_config(
        sequencer: Sequencer<E>,
        source: S,
        config: &GenerationConfig,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(sequencer, source, config.pre_gen, rng)
    }

    fn generate(&mut self) -> Result<CachedSequence, ModelError> {
        let ids = self.source.sample_types(&mut self.rng);
        let sequence = self.sequencer.realize(&ids, &mut self.rng)?;
        self.generated += 1;
        tracing::debug!(length = sequence.len(), total = self.generated, "generated sequence");
        Ok(sequence)
    }

    /// The sequence at the cursor, generating one first if the buffer is
    /// exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<CachedSequence, ModelError> {
        if self.cursor >= self.buffer.len() {
            let sequence = self.generate()?;
            self.buffer.push(sequence);
        }
        let sequence = self.buffer[self.cursor].clone();
        self.cursor += 1;
        Ok(sequence)
    }

    /// Drop every buffered sequence.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Replay the buffer from the start.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn generated_count(&self) -> usize {
        self.generated
    }

    pub fn sequencer(&self) -> &Sequencer<E> {
        &self.sequencer
    }
}
