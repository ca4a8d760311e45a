//! Bagged regression trees (random forest regressor).
//!
//! Every tree is fit on a bootstrap resample and considers all features at
//! each split; the forest predicts the mean of its trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const FEATURE_COUNT: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Resample with replacement per tree; off means every tree sees all samples.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 10,
            max_depth: 16,
            min_samples_split: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub features: [f64; FEATURE_COUNT],
    pub target: f64,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    pub fn fit(samples: &[Sample], indices: Vec<usize>, params: &ForestParams) -> Self {
        Self {
            root: grow(samples, indices, 0, params),
        }
    }

    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// `None` when `samples` is empty.
    pub fn fit(samples: &[Sample], params: &ForestParams) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = samples.len();
        let trees = (0..params.n_trees.max(1))
            .map(|_| {
                let indices: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(samples, indices, params)
            })
            .collect();
        Some(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }
}

fn mean(samples: &[Sample], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| samples[i].target).sum::<f64>() / indices.len() as f64
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

fn grow(samples: &[Sample], indices: Vec<usize>, depth: usize, params: &ForestParams) -> Node {
    let value = mean(samples, &indices);
    if depth >= params.max_depth || indices.len() < params.min_samples_split.max(2) {
        return Node::Leaf(value);
    }

    let parent_sse: f64 = indices
        .iter()
        .map(|&i| (samples[i].target - value).powi(2))
        .sum();
    let Some(best) = best_split(samples, &indices) else {
        return Node::Leaf(value);
    };
    if best.sse >= parent_sse {
        return Node::Leaf(value);
    }

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| samples[i].features[best.feature] <= best.threshold);

    Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(grow(samples, left, depth + 1, params)),
        right: Box::new(grow(samples, right, depth + 1, params)),
    }
}

/// Split minimizing the summed squared error of both children.
fn best_split(samples: &[Sample], indices: &[usize]) -> Option<BestSplit> {
    let mut best: Option<BestSplit> = None;
    let n = indices.len();

    for feature in 0..FEATURE_COUNT {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            samples[a].features[feature].total_cmp(&samples[b].features[feature])
        });

        let total_sum: f64 = sorted.iter().map(|&i| samples[i].target).sum();
        let total_sq: f64 = sorted.iter().map(|&i| samples[i].target.powi(2)).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for pos in 0..n - 1 {
            let target = samples[sorted[pos]].target;
            left_sum += target;
            left_sq += target * target;

            let here = samples[sorted[pos]].features[feature];
            let next = samples[sorted[pos + 1]].features[feature];
            if here == next {
                continue;
            }

            let left_n = (pos + 1) as f64;
            let right_n = (n - pos - 1) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.as_ref().is_none_or(|b| sse < b.sse) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    sse,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(count: f64, severity: f64, target: f64) -> Sample {
        Sample {
            features: [count, severity],
            target,
        }
    }

    fn ladder() -> Vec<Sample> {
        vec![
            sample(0.0, 0.0, 0.1),
            sample(1.0, 0.3, 0.3),
            sample(2.0, 0.5, 0.5),
            sample(3.0, 0.7, 0.7),
            sample(5.0, 0.9, 0.9),
        ]
    }

    #[test]
    fn single_tree_fits_training_points_exactly() {
        let samples = ladder();
        let tree = RegressionTree::fit(&samples, (0..samples.len()).collect(), &ForestParams::default());
        for s in &samples {
            assert!((tree.predict(&s.features) - s.target).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_targets_make_a_leaf() {
        let samples = vec![sample(0.0, 0.0, 0.4), sample(4.0, 1.0, 0.4)];
        let tree = RegressionTree::fit(&samples, vec![0, 1], &ForestParams::default());
        assert_eq!(tree.predict(&[100.0, 100.0]), 0.4);
    }

    #[test]
    fn depth_zero_predicts_mean() {
        let samples = ladder();
        let params = ForestParams {
            max_depth: 0,
            ..ForestParams::default()
        };
        let tree = RegressionTree::fit(&samples, (0..samples.len()).collect(), &params);
        assert!((tree.predict(&[0.0, 0.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let samples = ladder();
        let a = RandomForest::fit(&samples, &ForestParams::default()).unwrap();
        let b = RandomForest::fit(&samples, &ForestParams::default()).unwrap();
        assert_eq!(a.n_trees(), 10);
        for s in &samples {
            assert_eq!(a.predict(&s.features), b.predict(&s.features));
        }
    }

    #[test]
    fn forest_orders_low_and_high_risk() {
        let forest = RandomForest::fit(&ladder(), &ForestParams::default()).unwrap();
        let low = forest.predict(&[0.0, 0.0]);
        let high = forest.predict(&[5.0, 0.9]);
        assert!(low < 0.5, "low = {low}");
        assert!(high > 0.5, "high = {high}");
        assert!(low < high);
    }

    #[test]
    fn without_bootstrap_every_tree_agrees() {
        let samples = ladder();
        let params = ForestParams {
            bootstrap: false,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&samples, &params).unwrap();
        for s in &samples {
            assert!((forest.predict(&s.features) - s.target).abs() < 1e-12);
        }
    }

    #[test]
    fn no_samples_no_forest() {
        assert!(RandomForest::fit(&[], &ForestParams::default()).is_none());
    }
}
