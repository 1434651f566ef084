//! Least-squares gradient boosting over the bucketed store.

use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::DataStore;
use crate::model::{Forest, Node, NodeId, Tree};

// =============================================================================
// Training Parameters
// =============================================================================

/// Boosting parameters.
///
/// Every field is optional in the config file and through the builder:
///
/// ```ignore
/// let params = TrainParams::builder().num_trees(50).learning_rate(0.05).build();
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Clone, Debug))]
#[serde(default)]
pub struct TrainParams {
    /// Boosted trees to grow after the mean stump.
    #[builder(default = 100)]
    pub num_trees: usize,
    /// Maximum split depth per tree.
    #[builder(default = 4)]
    pub max_depth: usize,
    /// Shrinkage applied to every boosted leaf.
    #[builder(default = 0.1)]
    pub learning_rate: f64,
    /// Minimum examples on each side of a split.
    #[builder(default = 16)]
    pub min_node_examples: usize,
    /// Maximum buckets per feature when compressing the dataset.
    #[builder(default = crate::data::DEFAULT_MAX_BINS)]
    pub max_bins: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

// =============================================================================
// Trainer
// =============================================================================

/// A trained ensemble plus per-feature split-gain importances.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub forest: Forest,
    /// Accumulated split gain per feature id, length = feature count.
    pub importances: Vec<f64>,
}

/// Grows a regression forest on a closed [`DataStore`].
///
/// Tree 0 is a single-leaf stump carrying the target mean, so prefix length 1
/// is the mean-predictor baseline. Each boosting round fits the current
/// residuals with a depth-limited tree: split search scans per-bucket
/// (count, residual-sum) histograms and picks the variance-gain maximum;
/// leaf values are shrunk by the learning rate.
pub struct GbmTrainer<'a> {
    store: &'a DataStore,
    params: &'a TrainParams,
}

struct SplitCandidate {
    feature: usize,
    /// Buckets `0..=bin` go left.
    bin: usize,
    gain: f64,
    /// Raw-value threshold equivalent to the bucket split.
    threshold: f64,
}

impl<'a> GbmTrainer<'a> {
    pub fn new(store: &'a DataStore, params: &'a TrainParams) -> Self {
        Self { store, params }
    }

    /// Train the full ensemble.
    pub fn fit(&self) -> TrainedModel {
        let n = self.store.n_examples();
        let targets = self.store.targets();
        let mut importances = vec![0.0; self.store.n_features()];

        let mean = if n == 0 {
            0.0
        } else {
            targets.iter().sum::<f64>() / n as f64
        };
        let mut forest = Forest::new();
        forest.push_tree(Tree::leaf(mean));
        if n == 0 {
            return TrainedModel {
                forest,
                importances,
            };
        }

        let mut predictions = vec![mean; n];
        let mut residuals = vec![0.0; n];
        for round in 0..self.params.num_trees {
            for i in 0..n {
                residuals[i] = targets[i] - predictions[i];
            }
            let tree = self.grow_tree(&residuals, &mut predictions, &mut importances);
            debug!(round, nodes = tree.n_nodes(), "grew tree");
            forest.push_tree(tree);
        }

        TrainedModel {
            forest,
            importances,
        }
    }

    /// Grow one residual-fitting tree, updating `predictions` as leaves are
    /// sealed (every row belongs to exactly one leaf).
    fn grow_tree(
        &self,
        residuals: &[f64],
        predictions: &mut [f64],
        importances: &mut [f64],
    ) -> Tree {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let all_rows: Vec<u32> = (0..residuals.len() as u32).collect();
        let mut pending = vec![(0usize, all_rows, 0usize)];

        while let Some((slot, rows, depth)) = pending.pop() {
            let split = if depth < self.params.max_depth {
                self.best_split(&rows, residuals)
            } else {
                None
            };

            match split {
                Some(split) => {
                    importances[split.feature] += split.gain;
                    let bins = self.store.feature_bins(split.feature);
                    let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = rows
                        .iter()
                        .copied()
                        .partition(|&r| (bins[r as usize] as usize) <= split.bin);

                    let left = nodes.len() as NodeId;
                    nodes.push(Node::Leaf { value: 0.0 });
                    let right = nodes.len() as NodeId;
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes[slot] = Node::Split {
                        feature: split.feature as u32,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    pending.push((left as usize, left_rows, depth + 1));
                    pending.push((right as usize, right_rows, depth + 1));
                }
                None => {
                    let value = self.params.learning_rate * mean_of(&rows, residuals);
                    nodes[slot] = Node::Leaf { value };
                    for &r in &rows {
                        predictions[r as usize] += value;
                    }
                }
            }
        }

        Tree::new(nodes)
    }

    /// Best variance-gain split over every feature's bucket histogram, or
    /// `None` when no split clears the minimum-examples and positive-gain
    /// bars.
    fn best_split(&self, rows: &[u32], residuals: &[f64]) -> Option<SplitCandidate> {
        let min_examples = self.params.min_node_examples;
        if rows.len() < 2 * min_examples {
            return None;
        }

        let total_cnt = rows.len() as f64;
        let total_sum: f64 = rows.iter().map(|&r| residuals[r as usize]).sum();
        let parent_score = total_sum * total_sum / total_cnt;

        let mut best: Option<SplitCandidate> = None;
        for feature in 0..self.store.n_features() {
            let edges = self.store.bin_edges(feature);
            if edges.is_empty() {
                continue;
            }
            let n_bins = self.store.n_bins(feature);
            let bins = self.store.feature_bins(feature);

            let mut hist_sum = vec![0.0f64; n_bins];
            let mut hist_cnt = vec![0u32; n_bins];
            for &r in rows {
                let b = bins[r as usize] as usize;
                hist_sum[b] += residuals[r as usize];
                hist_cnt[b] += 1;
            }

            // Scan split points: buckets 0..=b left, threshold edges[b].
            let mut left_sum = 0.0;
            let mut left_cnt = 0u32;
            for b in 0..n_bins - 1 {
                left_sum += hist_sum[b];
                left_cnt += hist_cnt[b];
                let right_cnt = rows.len() as u32 - left_cnt;
                if (left_cnt as usize) < min_examples || (right_cnt as usize) < min_examples {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                let gain = left_sum * left_sum / left_cnt as f64
                    + right_sum * right_sum / right_cnt as f64
                    - parent_score;
                if gain > 0.0 && best.as_ref().map_or(true, |c| gain > c.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        bin: b,
                        gain,
                        threshold: edges[b],
                    });
                }
            }
        }
        best
    }
}

fn mean_of(rows: &[u32], values: &[f64]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| values[r as usize]).sum::<f64>() / rows.len() as f64
}
