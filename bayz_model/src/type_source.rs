// Sources of component-id sequences ("types") for the sequencer.
//
// The generation cache asks a `TypeSource` for the ids of one whole sequence;
// the source decides the length as well. Two sources ship here:
//
// - `MixtureTypeSource`: ids drawn independently by mixture weight.
// - `MarkovTypeSource`: a first-order chain over ids, fitted from the corpus
//   after mapping every token to its component (`TypeModel::label_sequences`).
//   Add-one smoothing keeps every transition reachable.
//
// Both draw the length uniformly from an inclusive range. Any
// `FnMut(&mut dyn RngCore) -> Vec<usize>` closure is a source too.

use std::ops::RangeInclusive;

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, RngCore};

use crate::error::ModelError;
use crate::mixture::GaussianMixture;

/// Produces the component ids (and thereby the length) of one sequence.
pub trait TypeSource {
    fn sample_types(&mut self, rng: &mut dyn RngCore) -> Vec<usize>;
}

impl<F> TypeSource for F
where
    F: FnMut(&mut dyn RngCore) -> Vec<usize>,
{
    fn sample_types(&mut self, rng: &mut dyn RngCore) -> Vec<usize> {
        self(rng)
    }
}

/// A source picked at run time.
pub type BoxedTypeSource = Box<dyn FnMut(&mut dyn RngCore) -> Vec<usize> + Send>;

/// Erase the concrete source type.
pub fn boxed<S: TypeSource + Send + 'static>(mut source: S) -> BoxedTypeSource {
    Box::new(move |rng: &mut dyn RngCore| source.sample_types(rng))
}

fn check_lengths(lengths: &RangeInclusive<usize>) -> Result<(), ModelError> {
    if lengths.is_empty() {
        return Err(ModelError::InvalidConfig(format!(
            "empty sequence length range {}..={}",
            lengths.start(),
            lengths.end()
        )));
    }
    Ok(())
}

fn weighted(weights: &[f64]) -> Result<WeightedIndex<f64>, ModelError> {
    WeightedIndex::new(weights).map_err(|e| ModelError::Sampling(e.to_string()))
}

/// Independent draws by mixture weight.
#[derive(Debug, Clone)]
pub struct MixtureTypeSource {
    weights: WeightedIndex<f64>,
    lengths: RangeInclusive<usize>,
}

impl MixtureTypeSource {
    pub fn new(
        mixture: &GaussianMixture,
        lengths: RangeInclusive<usize>,
    ) -> Result<Self, ModelError> {
        check_lengths(&lengths)?;
        if mixture.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let weights: Vec<f64> = mixture.components.iter().map(|c| c.weight).collect();
        Ok(Self {
            weights: weighted(&weights)?,
            lengths,
        })
    }
}

impl TypeSource for MixtureTypeSource {
    fn sample_types(&mut self, rng: &mut dyn RngCore) -> Vec<usize> {
        let len = rng.random_range(self.lengths.clone());
        (0..len).map(|_| self.weights.sample(rng)).collect()
    }
}

/// First-order Markov chain over component ids.
#[derive(Debug, Clone)]
pub struct MarkovTypeSource {
    initial: WeightedIndex<f64>,
    transitions: Vec<WeightedIndex<f64>>,
    lengths: RangeInclusive<usize>,
}

impl MarkovTypeSource {
    /// Fit start and transition counts (plus one) from labelled sequences.
    pub fn fit(
        sequences: &[Vec<usize>],
        n_components: usize,
        lengths: RangeInclusive<usize>,
    ) -> Result<Self, ModelError> {
        check_lengths(&lengths)?;
        if n_components == 0 {
            return Err(ModelError::NotFitted);
        }
        let mut initial = vec![1.0; n_components];
        let mut transitions = vec![vec![1.0; n_components]; n_components];
        for sequence in sequences {
            if let Some(&bad) = sequence.iter().find(|&&id| id >= n_components) {
                return Err(ModelError::out_of_range(bad, n_components));
            }
            if let Some(&first) = sequence.first() {
                initial[first] += 1.0;
            }
            for pair in sequence.windows(2) {
                transitions[pair[0]][pair[1]] += 1.0;
            }
        }
        Ok(Self {
            initial: weighted(&initial)?,
            transitions: transitions
                .iter()
                .map(|row| weighted(row))
                .collect::<Result<_, _>>()?,
            lengths,
        })
    }
}

impl TypeSource for MarkovTypeSource {
    fn sample_types(&mut self, rng: &mut dyn RngCore) -> Vec<usize> {
        let len = rng.random_range(self.lengths.clone());
        let mut ids = Vec::with_capacity(len);
        let mut current = self.initial.sample(rng);
        for _ in 0..len {
            ids.push(current);
            current = self.transitions[current].sample(rng);
        }
        ids
    }
}
