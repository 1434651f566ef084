//! Ordered tree ensemble and its JSON document.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tree::{Tree, TreeValidationError};

/// Errors loading or validating a model document.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model document")]
    Io(#[from] std::io::Error),
    #[error("model document is not valid JSON")]
    Json(#[from] serde_json::Error),
    #[error("model document has no trees")]
    Empty,
    #[error("tree {tree_idx} is structurally invalid")]
    InvalidTree {
        tree_idx: usize,
        #[source]
        source: TreeValidationError,
    },
}

/// Ordered ensemble of regression trees.
///
/// The ensemble prediction is the sum of every tree's response. Array order
/// is evaluation order and is preserved by the `{ "trees": [ ... ] }`
/// document. Immutable once loaded for evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tree; it becomes the last stage of every prediction.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Iterate over trees in evaluation order.
    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Full-ensemble prediction for one row.
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.trees.iter().map(|tree| tree.response(features)).sum()
    }

    /// Prediction after each ensemble prefix, as `(prefix_len, prediction)`.
    ///
    /// Carries the partial sum forward, so scoring every prefix of `T` trees
    /// costs one traversal per tree rather than one traversal per (prefix,
    /// tree) pair. The iterator is lazy and restartable; its final item is
    /// the full-ensemble prediction, summed in the same order as
    /// [`Forest::predict`].
    pub fn staged_predict<'a>(
        &'a self,
        features: &'a [f64],
    ) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.trees.iter().enumerate().scan(0.0, move |acc, (idx, tree)| {
            *acc += tree.response(features);
            Some((idx + 1, *acc))
        })
    }

    /// Write the `{ "trees": [ ... ] }` document.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), ModelError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read and structurally validate a model document.
    pub fn from_reader<R: Read>(reader: R, n_features: usize) -> Result<Self, ModelError> {
        let forest: Forest = serde_json::from_reader(reader)?;
        if forest.trees.is_empty() {
            return Err(ModelError::Empty);
        }
        for (tree_idx, tree) in forest.trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|source| ModelError::InvalidTree { tree_idx, source })?;
        }
        Ok(forest)
    }
}
