// Bayz: generative token sequences from a mixture-conditioned n-gram model.
//
// A word embedding places every vocabulary token (a chord or note spelling
// such as `C_E_G`) in a vector space. A Gaussian mixture fitted over that
// space gives each token a "type" (component id), and an n-gram table counted
// from the training corpus says which tokens tend to follow which. Generation
// draws a sequence of type ids, then emits one token per id, weighing the
// component density against the n-gram likelihood given the words so far.
//
// Architecture:
// - embedding.rs: Embedding store contract + in-memory `KeyedVectors`
// - ngram.rs: Bigram/trigram follower counts
// - mixture.rs: Gaussian mixture parameters, Cholesky math, k-means fitting
// - type_model.rs: `TypeModel` (conditional probability, emission, density
//   cache, save/load)
// - type_source.rs: Where type-id sequences come from (mixture weights or a
//   Markov chain over ids)
// - sequencer.rs: Emit + decode loop that grows the token history
// - cache.rs: Pre-generated sequence buffer with rewind/reset
// - pitch.rs: Note names to MIDI numbers
// - config.rs: JSON-loadable tunables
// - corpus.rs: Training corpus files
// - error.rs: `ModelError`
//
// Generation is deterministic given a seed.

pub mod cache;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod mixture;
pub mod ngram;
pub mod pitch;
pub mod sequencer;
pub mod type_model;
pub mod type_source;

#[cfg(test)]
mod test_support;

pub use cache::{CachedSequence, GenerationCache};
pub use config::{BayzConfig, GenerationConfig, TypeModelConfig};
pub use corpus::{Corpus, load_corpus};
pub use embedding::{EmbeddingStore, KeyedVectors};
pub use error::ModelError;
pub use ngram::{NGramOrder, NGramTable};
pub use sequencer::{Sequencer, Token};
pub use type_model::TypeModel;
pub use type_source::{BoxedTypeSource, MarkovTypeSource, MixtureTypeSource, TypeSource, boxed};
