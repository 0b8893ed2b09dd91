// The type model: mixture-conditioned, history-aware token emission.
//
// A "type" is a mixture component id. Given a type and the tokens emitted so
// far, `emit` produces one vector in embedding space:
//
// - Unconditioned (conditioning disabled, or empty history when
//   `condition_empty_history` is off): a straight draw from the component's
//   Gaussian.
// - Conditioned: every vocabulary token gets the weight
//   `density(token | component) * conditional_probability(token, history)`,
//   one token is drawn by weight, and its embedding vector is returned. The
//   output is a vector either way, so callers always decode the same shape.
//
// `conditional_probability` sums `count + smoothing` over the configured
// n-gram orders, which keeps every candidate strictly positive, including
// tokens and contexts never seen in training.
//
// Density cache: the per-vocabulary density list of a component only depends
// on the mixture, so it is computed the first time that component is emitted
// with conditioning and kept until the mixture is replaced (`fit`, `load`).
// The list is filled while holding the cache lock, so concurrent emitters
// compute each component exactly once. Stored values are densities divided by
// the component's largest one; the shared factor cancels out of weighted
// sampling and keeps high-dimensional densities from underflowing to zero.
//
// Persistence covers the mixture and the n-gram table only. The embedding is
// supplied by the caller on both sides of a save/load.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ndarray::{Array1, ArrayView1, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::TypeModelConfig;
use crate::embedding::EmbeddingStore;
use crate::error::ModelError;
use crate::mixture::{CholeskyFactor, FitOptions, GaussianMixture, MixtureComponent, fit_mixture};
use crate::ngram::{NGramTable, context_of};

/// Version written into saved models.
pub const FORMAT_VERSION: u32 = 1;

/// Mixture + n-gram emitter over an embedding store.
pub struct TypeModel<E> {
    embedding: E,
    config: TypeModelConfig,
    mixture: GaussianMixture,
    /// Parallel to `mixture.components`.
    factors: Vec<CholeskyFactor>,
    ngrams: NGramTable,
    density_cache: Mutex<HashMap<usize, Arc<Vec<f64>>>>,
}

#[derive(Serialize)]
struct SavedModelRef<'a> {
    format_version: u32,
    mixture: &'a GaussianMixture,
    ngrams: &'a NGramTable,
}

#[derive(Deserialize)]
struct SavedModel {
    format_version: u32,
    mixture: GaussianMixture,
    ngrams: NGramTable,
}

impl<E: EmbeddingStore> TypeModel<E> {
    /// Create an unfitted model. Fails on an unusable configuration.
    pub fn new(embedding: E, config: TypeModelConfig) -> Result<Self, ModelError> {
        if config.ngram_orders.is_empty() {
            return Err(ModelError::NoNGramOrders);
        }
        if !(config.smoothing.is_finite() && config.smoothing > 0.0) {
            return Err(ModelError::InvalidSmoothing(config.smoothing));
        }
        if config.n_components == 0 {
            return Err(ModelError::InvalidConfig(
                "n_components must be at least 1".into(),
            ));
        }
        Ok(Self {
            embedding,
            config,
            mixture: GaussianMixture::default(),
            factors: Vec::new(),
            ngrams: NGramTable::new(),
            density_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fit the mixture over the whole vocabulary and count n-grams over
    /// `sequences`, replacing any previous fit.
    pub fn fit<S: AsRef<[String]>>(&mut self, sequences: &[S]) -> Result<(), ModelError> {
        if sequences.is_empty() {
            return Err(ModelError::EmptyCorpus);
        }
        let rows = self
            .embedding
            .vocabulary()
            .iter()
            .map(|token| self.vector(token))
            .collect::<Result<Vec<_>, _>>()?;
        if rows.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }
        let points = ndarray::stack(Axis(0), &rows)
            .map_err(|e| ModelError::InvalidConfig(e.to_string()))?;

        let options = FitOptions {
            max_components: self.config.n_components,
            max_iterations: self.config.max_fit_iterations,
            reg_covar: self.config.reg_covar,
        };
        let mut rng = StdRng::seed_from_u64(self.config.fit_seed);
        let mixture = fit_mixture(points.view(), &options, &mut rng)?;
        let ngrams = NGramTable::from_sequences(sequences, &self.config.ngram_orders);

        self.install(mixture, ngrams)?;
        tracing::info!(
            components = self.component_count(),
            sequences = sequences.len(),
            "fitted type model"
        );
        Ok(())
    }

    /// Swap in new parameters and invalidate everything derived from the old
    /// ones.
    fn install(&mut self, mixture: GaussianMixture, ngrams: NGramTable) -> Result<(), ModelError> {
        mixture.validate(self.embedding.dimension())?;
        let factors = mixture
            .components
            .iter()
            .enumerate()
            .map(|(id, c)| CholeskyFactor::regularized(c.covariance.view(), id))
            .collect::<Result<Vec<_>, _>>()?;
        self.mixture = mixture;
        self.factors = factors;
        self.ngrams = ngrams;
        self.lock_cache().clear();
        Ok(())
    }

    /// Smoothed n-gram mass of `candidate` following `history`. Always > 0.
    /// Each order looks only at its own table with its own context, so a
    /// history too short for an order contributes smoothing alone.
    pub fn conditional_probability(&self, candidate: &str, history: &[String]) -> f64 {
        self.config
            .ngram_orders
            .iter()
            .map(|&order| {
                let context = context_of(history, order);
                f64::from(self.ngrams.count(order, context, candidate)) + self.config.smoothing
            })
            .sum()
    }

    /// Draw one vector for `component` given the tokens emitted so far.
    pub fn emit<R: Rng + ?Sized>(
        &self,
        component: usize,
        history: &[String],
        rng: &mut R,
    ) -> Result<Array1<f64>, ModelError> {
        let (params, factor) = self.component_with_factor(component)?;
        let conditioned = self.config.conditional
            && (!history.is_empty() || self.config.condition_empty_history);
        if !conditioned {
            return Ok(factor.sample(params.mean.view(), rng));
        }

        let weights = self.selection_weights(component, history)?;
        let index = WeightedIndex::new(&weights)
            .map_err(|e| ModelError::Sampling(e.to_string()))?
            .sample(rng);
        let token = &self.embedding.vocabulary()[index];
        tracing::trace!(component, token = %token, "emitted");
        Ok(self.vector(token)?.to_owned())
    }

    /// Unnormalised selection weight of every vocabulary token (vocabulary
    /// order) for a conditioned emission.
    pub fn selection_weights(
        &self,
        component: usize,
        history: &[String],
    ) -> Result<Vec<f64>, ModelError> {
        let densities = self.densities(component)?;
        Ok(self
            .embedding
            .vocabulary()
            .iter()
            .zip(densities.iter())
            .map(|(token, density)| density * self.conditional_probability(token, history))
            .collect())
    }

    /// Relative vocabulary densities for `component`, computed on first use.
    pub fn densities(&self, component: usize) -> Result<Arc<Vec<f64>>, ModelError> {
        let (params, factor) = self.component_with_factor(component)?;
        let mut cache = self.lock_cache();
        if let Some(cached) = cache.get(&component) {
            return Ok(Arc::clone(cached));
        }

        let vocabulary = self.embedding.vocabulary();
        if vocabulary.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }
        let log_densities = vocabulary
            .iter()
            .map(|token| Ok::<_, ModelError>(factor.log_density(params.mean.view(), self.vector(token)?)))
            .collect::<Result<Vec<f64>, ModelError>>()?;
        let peak = log_densities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let densities = Arc::new(
            log_densities
                .iter()
                .map(|l| (l - peak).exp())
                .collect::<Vec<f64>>(),
        );
        tracing::debug!(component, tokens = vocabulary.len(), "cached vocabulary densities");
        cache.insert(component, Arc::clone(&densities));
        Ok(densities)
    }

    /// The cached density list for `component`, without computing it.
    pub fn cached_densities(&self, component: usize) -> Option<Arc<Vec<f64>>> {
        self.lock_cache().get(&component).cloned()
    }

    /// Number of components whose densities are cached.
    pub fn cached_component_count(&self) -> usize {
        self.lock_cache().len()
    }

    /// Most likely component for `vector` (weighted log density).
    pub fn predict(&self, vector: ArrayView1<'_, f64>) -> Result<usize, ModelError> {
        if self.mixture.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let dimension = self.embedding.dimension();
        if vector.len() != dimension {
            return Err(ModelError::dimension_mismatch(dimension, vector.len()));
        }
        self.mixture
            .components
            .iter()
            .zip(&self.factors)
            .map(|(c, f)| c.weight.ln() + f.log_density(c.mean.view(), vector))
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
            .ok_or(ModelError::NotFitted)
    }

    /// Component id of every vocabulary token.
    pub fn label_vocabulary(&self) -> Result<BTreeMap<String, usize>, ModelError> {
        self.embedding
            .vocabulary()
            .iter()
            .map(|token| Ok::<_, ModelError>((token.clone(), self.predict(self.vector(token)?)?)))
            .collect()
    }

    /// Map token sequences to component id sequences.
    pub fn label_sequences<S: AsRef<[String]>>(
        &self,
        sequences: &[S],
    ) -> Result<Vec<Vec<usize>>, ModelError> {
        let labels = self.label_vocabulary()?;
        sequences
            .iter()
            .map(|sequence| {
                sequence
                    .as_ref()
                    .iter()
                    .map(|token| {
                        labels
                            .get(token)
                            .copied()
                            .ok_or_else(|| ModelError::UnknownToken(token.clone()))
                    })
                    .collect::<Result<Vec<usize>, ModelError>>()
            })
            .collect()
    }

    /// Write the mixture and n-gram table as JSON.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), ModelError> {
        let saved = SavedModelRef {
            format_version: FORMAT_VERSION,
            mixture: &self.mixture,
            ngrams: &self.ngrams,
        };
        serde_json::to_writer(writer, &saved)?;
        Ok(())
    }

    /// Replace the mixture and n-gram table with a saved one.
    pub fn read_from<R: Read>(&mut self, reader: R) -> Result<(), ModelError> {
        let saved: SavedModel = serde_json::from_reader(reader)?;
        if saved.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat {
                found: saved.format_version,
                expected: FORMAT_VERSION,
            });
        }
        self.install(saved.mixture, saved.ngrams)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))?;
        tracing::info!(path = %path.display(), "saved type model");
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> Result<(), ModelError> {
        let file = std::fs::File::open(path)?;
        self.read_from(std::io::BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            components = self.component_count(),
            "loaded type model"
        );
        Ok(())
    }

    pub fn embedding(&self) -> &E {
        &self.embedding
    }

    pub fn config(&self) -> &TypeModelConfig {
        &self.config
    }

    pub fn mixture(&self) -> &GaussianMixture {
        &self.mixture
    }

    pub fn ngrams(&self) -> &NGramTable {
        &self.ngrams
    }

    pub fn component_count(&self) -> usize {
        self.mixture.len()
    }

    pub fn component(&self, id: usize) -> Result<&MixtureComponent, ModelError> {
        self.component_with_factor(id).map(|(c, _)| c)
    }

    fn component_with_factor(
        &self,
        id: usize,
    ) -> Result<(&MixtureComponent, &CholeskyFactor), ModelError> {
        if self.mixture.is_empty() {
            return Err(ModelError::NotFitted);
        }
        match (self.mixture.components.get(id), self.factors.get(id)) {
            (Some(c), Some(f)) => Ok((c, f)),
            _ => Err(ModelError::out_of_range(id, self.component_count())),
        }
    }

    fn vector(&self, token: &str) -> Result<ArrayView1<'_, f64>, ModelError> {
        self.embedding
            .vector_of(token)
            .ok_or_else(|| ModelError::UnknownToken(token.to_string()))
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<usize, Arc<Vec<f64>>>> {
        self.density_cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::KeyedVectors;
    use crate::ngram::NGramOrder;
    use crate::test_support::{axis_embedding, repeated_pairs, words};
    use ndarray::array;

    fn single_component() -> TypeModelConfig {
        TypeModelConfig {
            n_components: 1,
            ..Default::default()
        }
    }

    fn fitted(config: TypeModelConfig) -> TypeModel<KeyedVectors> {
        let mut model = TypeModel::new(axis_embedding(["A", "B", "C", "D", "E", "F"]), config)
            .unwrap();
        model.fit(&repeated_pairs("A", "B", 50)).unwrap();
        model
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("bayz_type_model_{name}_{}.json", std::process::id()))
    }

    fn decode(model: &TypeModel<KeyedVectors>, vector: &Array1<f64>) -> String {
        model.embedding().nearest_token(vector.view(), 1).remove(0).0
    }

    fn is_vocabulary_vector(model: &TypeModel<KeyedVectors>, vector: &Array1<f64>) -> bool {
        model.embedding().vectors().rows().into_iter().any(|row| row == vector.view())
    }

    #[test]
    fn configuration_errors_at_construction() {
        let embedding = axis_embedding(["A", "B", "C", "D", "E", "F"]);
        let no_orders = TypeModelConfig {
            ngram_orders: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            TypeModel::new(embedding.clone(), no_orders),
            Err(ModelError::NoNGramOrders)
        ));

        let zero_smoothing = TypeModelConfig {
            smoothing: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            TypeModel::new(embedding.clone(), zero_smoothing),
            Err(ModelError::InvalidSmoothing(_))
        ));

        let no_components = TypeModelConfig {
            n_components: 0,
            ..Default::default()
        };
        assert!(TypeModel::new(embedding, no_components).is_err());
    }

    #[test]
    fn fit_rejects_empty_corpus() {
        let mut model =
            TypeModel::new(axis_embedding(["A", "B", "C", "D", "E", "F"]), single_component())
                .unwrap();
        let corpus: Vec<Vec<String>> = Vec::new();
        assert!(matches!(model.fit(&corpus), Err(ModelError::EmptyCorpus)));
    }

    #[test]
    fn conditional_probability_sums_smoothed_orders() {
        let model = fitted(single_component());
        // Bigram A->B seen 50 times. The one-token history is too short for
        // the trigram order, which adds smoothing only.
        let p = model.conditional_probability("B", &words("A"));
        assert!((p - 50.02).abs() < 1e-9, "p = {p}");
        // Unseen follower: smoothing from both orders.
        assert!((model.conditional_probability("C", &words("A")) - 0.02).abs() < 1e-12);
        // Unseen context and unknown token.
        assert!((model.conditional_probability("zzz", &words("Q R")) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn short_history_never_reads_lower_order_counts_twice() {
        let model = fitted(single_component());
        let bigram_only = TypeModelConfig {
            ngram_orders: vec![NGramOrder::Bigram],
            ..single_component()
        };
        let mut single = TypeModel::new(axis_embedding(["A", "B", "C", "D", "E", "F"]), bigram_only)
            .unwrap();
        single.fit(&repeated_pairs("A", "B", 50)).unwrap();

        // Adding the trigram order to a one-token history only adds its
        // smoothing, never the bigram count again.
        let both = model.conditional_probability("B", &words("A"));
        let bigram = single.conditional_probability("B", &words("A"));
        assert!((bigram - 50.01).abs() < 1e-9, "bigram = {bigram}");
        assert!((both - bigram - 0.01).abs() < 1e-9, "both = {both}");
    }

    #[test]
    fn conditional_probability_is_strictly_positive() {
        let model = fitted(single_component());
        let histories = [words(""), words("A"), words("B A"), words("A B A"), words("x y z")];
        for token in ["A", "B", "C", "D", "E", "F", "never-seen"] {
            for history in &histories {
                assert!(model.conditional_probability(token, history) > 0.0);
            }
        }
    }

    #[test]
    fn single_order_uses_only_that_order() {
        let config = TypeModelConfig {
            n_components: 1,
            ngram_orders: vec![NGramOrder::Trigram],
            ..Default::default()
        };
        let mut model =
            TypeModel::new(axis_embedding(["A", "B", "C", "D", "E", "F"]), config).unwrap();
        model.fit(&[words("A B C A B C")]).unwrap();
        assert!((model.conditional_probability("C", &words("A B")) - 2.01).abs() < 1e-12);
        assert!((model.conditional_probability("B", &words("A")) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn emit_rejects_unknown_component() {
        let model = fitted(single_component());
        let mut rng = StdRng::seed_from_u64(1);
        let result = model.emit(1, &words("A"), &mut rng);
        assert!(matches!(result, Err(ModelError::OutOfRange { id: 1, count: 1 })));
    }

    #[test]
    fn unfitted_model_has_no_components() {
        let model =
            TypeModel::new(axis_embedding(["A", "B", "C", "D", "E", "F"]), single_component())
                .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(model.component_count(), 0);
        assert!(matches!(model.emit(0, &[], &mut rng), Err(ModelError::NotFitted)));
        assert!(matches!(model.densities(0), Err(ModelError::NotFitted)));
        assert!(matches!(
            model.predict(array![1.0, 0.0, 0.0].view()),
            Err(ModelError::NotFitted)
        ));
        assert!(matches!(model.label_vocabulary(), Err(ModelError::NotFitted)));
    }

    #[test]
    fn unconditioned_draws_match_component_moments() {
        let config = TypeModelConfig {
            conditional: false,
            ..single_component()
        };
        let model = fitted(config);
        let component = model.component(0).unwrap().clone();
        let mut rng = StdRng::seed_from_u64(42);

        let n = 20_000;
        let draws: Vec<Array1<f64>> = (0..n)
            .map(|_| model.emit(0, &[], &mut rng).unwrap())
            .collect();
        for i in 0..3 {
            let mean = draws.iter().map(|d| d[i]).sum::<f64>() / n as f64;
            assert!((mean - component.mean[i]).abs() < 0.03, "mean[{i}] = {mean}");
            for j in 0..3 {
                let cov = draws
                    .iter()
                    .map(|d| (d[i] - mean) * (d[j] - component.mean[j]))
                    .sum::<f64>()
                    / n as f64;
                assert!(
                    (cov - component.covariance[[i, j]]).abs() < 0.03,
                    "cov[{i}][{j}] = {cov}, fitted {}",
                    component.covariance[[i, j]]
                );
            }
        }
    }

    #[test]
    fn conditioning_disabled_ignores_history() {
        let config = TypeModelConfig {
            conditional: false,
            ..single_component()
        };
        let model = fitted(config);
        let mut rng = StdRng::seed_from_u64(7);
        let vector = model.emit(0, &words("A"), &mut rng).unwrap();
        // A Gaussian draw, not a vocabulary vector.
        assert!(!is_vocabulary_vector(&model, &vector));
        assert_eq!(model.cached_component_count(), 0);
    }

    #[test]
    fn empty_history_still_conditions_by_default() {
        let model = fitted(single_component());
        let mut rng = StdRng::seed_from_u64(11);
        let vector = model.emit(0, &[], &mut rng).unwrap();
        assert!(is_vocabulary_vector(&model, &vector));
        assert!(model.cached_densities(0).is_some());
    }

    #[test]
    fn empty_history_can_skip_conditioning() {
        let config = TypeModelConfig {
            condition_empty_history: false,
            ..single_component()
        };
        let model = fitted(config);
        let mut rng = StdRng::seed_from_u64(11);
        let vector = model.emit(0, &[], &mut rng).unwrap();
        assert!(!is_vocabulary_vector(&model, &vector));
        // With history the conditioned branch is taken again.
        let vector = model.emit(0, &words("A"), &mut rng).unwrap();
        assert!(is_vocabulary_vector(&model, &vector));
    }

    #[test]
    fn density_cache_is_filled_once() {
        let model = fitted(single_component());
        let mut rng = StdRng::seed_from_u64(3);
        assert!(model.cached_densities(0).is_none());

        model.emit(0, &words("A"), &mut rng).unwrap();
        let first = model.cached_densities(0).unwrap();
        model.emit(0, &words("A B"), &mut rng).unwrap();
        let second = model.cached_densities(0).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(first.len(), 6);
        assert_eq!(model.cached_component_count(), 1);
    }

    #[test]
    fn symmetric_embedding_has_equal_densities() {
        let model = fitted(single_component());
        let densities = model.densities(0).unwrap();
        for d in densities.iter() {
            assert!((d - 1.0).abs() < 1e-9, "density {d}");
        }
    }

    #[test]
    fn trained_follower_outweighs_unseen_tokens() {
        let model = fitted(single_component());
        let weights = model.selection_weights(0, &words("A")).unwrap();
        let vocabulary = model.embedding().vocabulary();
        let b = vocabulary.iter().position(|t| t == "B").unwrap();
        for (i, token) in vocabulary.iter().enumerate() {
            if !["A", "B"].contains(&token.as_str()) {
                assert!(weights[b] > weights[i]);
            }
        }

        let mut rng = StdRng::seed_from_u64(2024);
        let draws = 3_000;
        let b_count = (0..draws)
            .filter(|_| decode(&model, &model.emit(0, &words("A"), &mut rng).unwrap()) == "B")
            .count();
        let uniform = draws as f64 / vocabulary.len() as f64;
        assert!(b_count as f64 > 2.0 * uniform, "B drawn {b_count} of {draws}");
    }

    #[test]
    fn equal_weights_are_drawn_uniformly() {
        let model = fitted(single_component());
        let mut rng = StdRng::seed_from_u64(99);
        let history = words("unseen");
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for _ in 0..6_000 {
            let token = decode(&model, &model.emit(0, &history, &mut rng).unwrap());
            *counts.entry(token).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        for (token, count) in counts {
            assert!((850..1150).contains(&count), "{token} drawn {count} times");
        }
    }

    #[test]
    fn concurrent_emitters_share_one_cache_entry() {
        let model = Arc::new(fitted(single_component()));
        let handles: Vec<_> = (0..4)
            .map(|seed| {
                let model = Arc::clone(&model);
                std::thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for _ in 0..50 {
                        model.emit(0, &words("A"), &mut rng).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(model.cached_component_count(), 1);
        assert_eq!(model.cached_densities(0).unwrap().len(), 6);
    }

    #[test]
    fn save_load_round_trip() {
        let model = fitted(single_component());
        let path = temp_path("round_trip");
        model.save(&path).unwrap();

        let mut restored =
            TypeModel::new(axis_embedding(["A", "B", "C", "D", "E", "F"]), single_component())
                .unwrap();
        restored.load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.mixture(), model.mixture());
        assert_eq!(restored.ngrams(), model.ngrams());
        assert_eq!(
            restored.selection_weights(0, &words("A")).unwrap(),
            model.selection_weights(0, &words("A")).unwrap()
        );
    }

    #[test]
    fn load_invalidates_density_cache() {
        let mut model = fitted(single_component());
        let mut buffer = Vec::new();
        model.write_to(&mut buffer).unwrap();

        model.densities(0).unwrap();
        assert_eq!(model.cached_component_count(), 1);
        model.read_from(buffer.as_slice()).unwrap();
        assert_eq!(model.cached_component_count(), 0);
    }

    #[test]
    fn saved_document_is_versioned() {
        let model = fitted(single_component());
        let mut buffer = Vec::new();
        model.write_to(&mut buffer).unwrap();
        let mut json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(json["format_version"], FORMAT_VERSION);

        json["format_version"] = serde_json::json!(99);
        let mut other = fitted(single_component());
        let result = other.read_from(json.to_string().as_bytes());
        assert!(matches!(
            result,
            Err(ModelError::UnsupportedFormat { found: 99, expected: FORMAT_VERSION })
        ));
    }

    #[test]
    fn load_rejects_other_dimension() {
        let model = fitted(single_component());
        let mut buffer = Vec::new();
        model.write_to(&mut buffer).unwrap();

        let flat = KeyedVectors::new(2, vec![("A".to_string(), vec![1.0, 0.0])]).unwrap();
        let mut other = TypeModel::new(flat, single_component()).unwrap();
        assert!(matches!(
            other.read_from(buffer.as_slice()),
            Err(ModelError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn predict_and_label_separate_clusters() {
        let embedding = KeyedVectors::new(
            2,
            vec![
                ("hi1".to_string(), vec![10.0, 10.0]),
                ("hi2".to_string(), vec![10.5, 9.5]),
                ("lo1".to_string(), vec![-10.0, -10.0]),
                ("lo2".to_string(), vec![-9.5, -10.5]),
            ],
        )
        .unwrap();
        let config = TypeModelConfig {
            n_components: 2,
            ..Default::default()
        };
        let mut model = TypeModel::new(embedding, config).unwrap();
        model.fit(&[words("hi1 lo1 hi2 lo2")]).unwrap();
        assert_eq!(model.component_count(), 2);

        let hi = model.predict(array![10.2, 9.8].view()).unwrap();
        let lo = model.predict(array![-9.8, -10.2].view()).unwrap();
        assert_ne!(hi, lo);

        let labels = model.label_vocabulary().unwrap();
        assert_eq!(labels["hi1"], hi);
        assert_eq!(labels["hi2"], hi);
        assert_eq!(labels["lo1"], lo);
        assert_eq!(labels["lo2"], lo);

        let sequences = model.label_sequences(&[words("hi1 lo2")]).unwrap();
        assert_eq!(sequences, vec![vec![hi, lo]]);
        assert!(matches!(
            model.label_sequences(&[words("nope")]),
            Err(ModelError::UnknownToken(_))
        ));
        assert!(matches!(
            model.predict(array![1.0].view()),
            Err(ModelError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
