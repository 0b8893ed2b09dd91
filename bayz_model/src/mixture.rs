// Gaussian mixture over the embedding space.
//
// Holds the fitted components (weight, mean, full covariance) and the numeric
// helpers the type model needs from them: a Cholesky factor per component for
// log densities and for drawing samples (`mean + L z`).
//
// Fitting: k-means++ seeding, Lloyd iterations, then
// per-cluster moments. The requested component count is an upper bound. It is
// capped by the number of distinct points, and clusters that end up empty are
// pruned, so the fitted model can have fewer components than asked for.
//
// Covariances of tiny clusters are singular or close to it. `reg_covar` is
// added to every diagonal at fit time, and `CholeskyFactor::regularized`
// adds growing jitter when a loaded covariance still fails to factor.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// ln(2π)
const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Jitter attempts before a covariance is declared singular.
const MAX_JITTER_ATTEMPTS: usize = 6;

/// One Gaussian component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    /// Mixing proportion; weights of a fitted mixture sum to 1.
    pub weight: f64,
    pub mean: Array1<f64>,
    /// d x d, symmetric positive semi-definite.
    pub covariance: Array2<f64>,
}

/// The fitted mixture. Component ids are indices into `components`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixture {
    pub components: Vec<MixtureComponent>,
}

impl GaussianMixture {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Check every mean and covariance against the embedding dimension.
    pub fn validate(&self, dimension: usize) -> Result<(), ModelError> {
        for component in &self.components {
            if component.mean.len() != dimension {
                return Err(ModelError::dimension_mismatch(dimension, component.mean.len()));
            }
            let (rows, cols) = component.covariance.dim();
            if rows != dimension {
                return Err(ModelError::dimension_mismatch(dimension, rows));
            }
            if cols != dimension {
                return Err(ModelError::dimension_mismatch(dimension, cols));
            }
        }
        Ok(())
    }
}

/// Lower-triangular Cholesky factor `L` of a covariance, `L Lᵀ = Σ`.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    /// Upper triangle zero.
    lower: Array2<f64>,
    /// ln |Σ|
    log_det: f64,
}

impl CholeskyFactor {
    /// Factor `covariance`, or `None` if it is not positive definite.
    pub fn decompose(covariance: ArrayView2<'_, f64>) -> Option<Self> {
        Self::decompose_with_jitter(covariance, 0.0)
    }

    /// Factor `covariance`, adding growing diagonal jitter if needed.
    /// `component` only labels the error.
    pub fn regularized(
        covariance: ArrayView2<'_, f64>,
        component: usize,
    ) -> Result<Self, ModelError> {
        if let Some(factor) = Self::decompose(covariance) {
            return Ok(factor);
        }
        let mean_diag = covariance.diag().mapv(f64::abs).mean().unwrap_or(0.0);
        let scale = if mean_diag > 0.0 { mean_diag } else { 1.0 };
        let mut jitter = 1e-10 * scale;
        for _ in 0..MAX_JITTER_ATTEMPTS {
            if let Some(factor) = Self::decompose_with_jitter(covariance, jitter) {
                tracing::warn!(component, jitter, "regularised covariance");
                return Ok(factor);
            }
            jitter *= 10.0;
        }
        Err(ModelError::SingularCovariance { component })
    }

    fn decompose_with_jitter(covariance: ArrayView2<'_, f64>, jitter: f64) -> Option<Self> {
        if !covariance.is_square() {
            return None;
        }
        let dim = covariance.nrows();
        let mut lower = Array2::<f64>::zeros((dim, dim));
        let mut log_det = 0.0;
        for j in 0..dim {
            let done = lower.slice(s![j, ..j]);
            let pivot = covariance[[j, j]] + jitter - done.dot(&done);
            if !(pivot > 0.0 && pivot.is_finite()) {
                return None;
            }
            let ljj = pivot.sqrt();
            lower[[j, j]] = ljj;
            log_det += 2.0 * ljj.ln();
            for i in (j + 1)..dim {
                let dot = lower.slice(s![i, ..j]).dot(&lower.slice(s![j, ..j]));
                lower[[i, j]] = (covariance[[i, j]] - dot) / ljj;
            }
        }
        Some(Self { lower, log_det })
    }

    pub fn dimension(&self) -> usize {
        self.lower.nrows()
    }

    /// ln |Σ|
    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    /// Entry `L[row][col]`.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.lower[[row, col]]
    }

    /// ln N(x | mean, Σ).
    pub fn log_density(&self, mean: ArrayView1<'_, f64>, x: ArrayView1<'_, f64>) -> f64 {
        // Forward substitution: L y = x - mean, so the Mahalanobis term is |y|².
        let dim = self.dimension();
        let diff = &x - &mean;
        let mut y = Array1::<f64>::zeros(dim);
        for i in 0..dim {
            let dot = self.lower.slice(s![i, ..i]).dot(&y.slice(s![..i]));
            y[i] = (diff[i] - dot) / self.lower[[i, i]];
        }
        -0.5 * (dim as f64 * LN_2PI + self.log_det + y.dot(&y))
    }

    /// Draw one vector from N(mean, Σ).
    pub fn sample<R: Rng + ?Sized>(&self, mean: ArrayView1<'_, f64>, rng: &mut R) -> Array1<f64> {
        let z = Array1::<f64>::from_shape_fn(self.dimension(), |_| StandardNormal.sample(&mut *rng));
        &mean + &self.lower.dot(&z)
    }
}

/// Knobs for `fit_mixture`.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Upper bound on the number of components.
    pub max_components: usize,
    /// Lloyd iterations before giving up on convergence.
    pub max_iterations: usize,
    /// Added to every covariance diagonal.
    pub reg_covar: f64,
}

/// Fit a mixture to the rows of `points` (k-means++ / Lloyd, then
/// per-cluster moments).
pub fn fit_mixture<R: Rng + ?Sized>(
    points: ArrayView2<'_, f64>,
    options: &FitOptions,
    rng: &mut R,
) -> Result<GaussianMixture, ModelError> {
    if points.nrows() == 0 {
        return Err(ModelError::EmptyVocabulary);
    }
    if options.max_components == 0 {
        return Err(ModelError::InvalidConfig(
            "mixture needs at least one component".into(),
        ));
    }

    let mut centers = seed_centers(points, options.max_components, rng);
    let mut assignment = vec![usize::MAX; points.nrows()];
    let mut iterations = 0;
    for _ in 0..options.max_iterations.max(1) {
        iterations += 1;
        let mut changed = false;
        for (slot, point) in assignment.iter_mut().zip(points.rows()) {
            let nearest = nearest_center(point, centers.view());
            if *slot != nearest {
                *slot = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        for (c, mut center) in centers.rows_mut().into_iter().enumerate() {
            // An empty cluster keeps its old center and is pruned below.
            if let Some(mean) = members_of(points, &assignment, c).mean_axis(Axis(0)) {
                center.assign(&mean);
            }
        }
    }

    let total = points.nrows() as f64;
    let mut components = Vec::new();
    for c in 0..centers.nrows() {
        let members = members_of(points, &assignment, c);
        let Some(mean) = members.mean_axis(Axis(0)) else {
            continue;
        };
        let count = members.nrows() as f64;
        // Biased (divide by n) covariance plus the regulariser.
        let centered = &members - &mean;
        let mut covariance = centered.t().dot(&centered) / count;
        covariance.diag_mut().mapv_inplace(|v| v + options.reg_covar);
        components.push(MixtureComponent {
            weight: count / total,
            mean,
            covariance,
        });
    }

    tracing::debug!(
        requested = options.max_components,
        fitted = components.len(),
        iterations,
        "fitted mixture"
    );
    Ok(GaussianMixture { components })
}

/// Rows of `points` currently assigned to `cluster`.
fn members_of(points: ArrayView2<'_, f64>, assignment: &[usize], cluster: usize) -> Array2<f64> {
    let rows: Vec<usize> = assignment
        .iter()
        .enumerate()
        .filter(|&(_, &a)| a == cluster)
        .map(|(i, _)| i)
        .collect();
    points.select(Axis(0), &rows)
}

/// k-means++ seeding. Stops early once every point coincides with a center.
fn seed_centers<R: Rng + ?Sized>(points: ArrayView2<'_, f64>, k: usize, rng: &mut R) -> Array2<f64> {
    let mut chosen = vec![rng.random_range(0..points.nrows())];
    while chosen.len() < k {
        let distances: Vec<f64> = points
            .rows()
            .into_iter()
            .map(|p| {
                chosen
                    .iter()
                    .map(|&c| squared_distance(p, points.row(c)))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        match WeightedIndex::new(&distances) {
            Ok(dist) => chosen.push(dist.sample(rng)),
            Err(_) => break,
        }
    }
    points.select(Axis(0), &chosen)
}

fn nearest_center(point: ArrayView1<'_, f64>, centers: ArrayView2<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, center) in centers.rows().into_iter().enumerate() {
        let d = squared_distance(point, center);
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let diff = &a - &b;
    diff.dot(&diff)
}
