//! CART regression tree with a squared-error criterion.
//!
//! Growth rules: every node tries all features (visited in an order permuted
//! by a seeded RNG, which decides ties between equally good splits), the best
//! split maximises the reduction in squared error, thresholds sit halfway
//! between consecutive distinct feature values, and a node becomes a leaf when
//! its targets are constant, it holds fewer than `min_samples_split` samples,
//! no feature varies, or `max_depth` is reached. Leaves predict the mean
//! target of their samples. Samples go left when `x[feature] <= threshold`.
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

/// Feature values closer than this are treated as equal when placing thresholds.
const FEATURE_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,
    #[error("feature matrix has {rows} rows but target has {targets}")]
    LengthMismatch { rows: usize, targets: usize },
    #[error("model was fitted with {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },
    #[error("model is not fitted")]
    NotFitted,
    #[error("training data contains non-finite values")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    proxy: f64,
}

/// Decision-tree regressor; unlimited depth and single-sample leaves by default.
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    seed: u64,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTreeRegressor {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            nodes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n.max(1);
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Longest root-to-leaf path in edges; 0 for a single leaf.
    pub fn depth(&self) -> usize {
        if !self.is_fitted() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, d)) = stack.pop() {
            match self.nodes[id] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left, d + 1));
                    stack.push((right, d + 1));
                }
            }
        }
        max_depth
    }

    /// Grow the tree on `x` (samples x features) and targets `y`.
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), TreeError> {
        let (n, n_features) = x.dim();
        if n == 0 {
            return Err(TreeError::EmptyTrainingSet);
        }
        if y.len() != n {
            return Err(TreeError::LengthMismatch {
                rows: n,
                targets: y.len(),
            });
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(TreeError::NonFinite);
        }

        self.nodes.clear();
        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        self.nodes.push(Node::Leaf { value: 0.0 });
        // Explicit work stack; an unbounded tree can be as deep as the sample count
        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(0, (0..n).collect(), 0)];

        while let Some((id, indices, depth)) = stack.pop() {
            let (mean, impurity) = node_mean_and_impurity(&y, &indices);
            let splittable = indices.len() >= self.min_samples_split
                && indices.len() >= 2 * self.min_samples_leaf
                && impurity > f64::EPSILON
                && self.max_depth.is_none_or(|d| depth < d);

            let best = if splittable {
                self.best_split(&x, &y, &indices, &mut rng)
            } else {
                None
            };

            match best {
                None => {
                    self.nodes[id] = Node::Leaf { value: mean };
                }
                Some(split) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = indices
                        .iter()
                        .copied()
                        .partition(|&i| x[[i, split.feature]] <= split.threshold);

                    let left_id = self.nodes.len();
                    let right_id = left_id + 1;
                    self.nodes.push(Node::Leaf { value: 0.0 });
                    self.nodes.push(Node::Leaf { value: 0.0 });
                    self.nodes[id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left: left_id,
                        right: right_id,
                    };
                    stack.push((right_id, right, depth + 1));
                    stack.push((left_id, left, depth + 1));
                }
            }
        }

        debug!(
            "Fitted regression tree: samples={}, nodes={}, leaves={}",
            n,
            self.n_nodes(),
            self.n_leaves()
        );
        Ok(())
    }

    fn best_split(
        &self,
        x: &ArrayView2<f64>,
        y: &ArrayView1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();

        let mut order: Vec<usize> = (0..self.n_features).collect();
        order.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = indices.to_vec();

        for &f in &order {
            sorted.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));
            if x[[sorted[n - 1], f]] <= x[[sorted[0], f]] + FEATURE_THRESHOLD {
                continue;
            }

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += y[sorted[pos]];
                let xi = x[[sorted[pos], f]];
                let xn = x[[sorted[pos + 1], f]];
                if xn <= xi + FEATURE_THRESHOLD {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                // Maximising this is equivalent to minimising the children's squared error
                let proxy =
                    left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if best.is_none_or(|b| proxy > b.proxy) {
                    let mut threshold = xi / 2.0 + xn / 2.0;
                    if threshold >= xn || !threshold.is_finite() {
                        threshold = xi;
                    }
                    best = Some(SplitCandidate {
                        feature: f,
                        threshold,
                        proxy,
                    });
                }
            }
        }

        best
    }

    /// Predict one sample.
    pub fn predict_one(&self, sample: ArrayView1<f64>) -> Result<f64, TreeError> {
        if !self.is_fitted() {
            return Err(TreeError::NotFitted);
        }
        if sample.len() != self.n_features {
            return Err(TreeError::FeatureCount {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value, .. } => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if sample[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, TreeError> {
        let mut out = Array1::<f64>::zeros(x.nrows());
        for (i, row) in x.rows().into_iter().enumerate() {
            out[i] = self.predict_one(row)?;
        }
        Ok(out)
    }
}

fn node_mean_and_impurity(y: &ArrayView1<f64>, indices: &[usize]) -> (f64, f64) {
    if indices.is_empty() {
        return (0.0, 0.0);
    }
    let n = indices.len() as f64;
    let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n;
    let mse = indices
        .iter()
        .map(|&i| {
            let d = y[i] - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, mse)
}
