//! Flat regression-tree storage and traversal.

use serde::{Deserialize, Serialize};

/// Index of a node within a tree's flat node array.
pub type NodeId = u32;

/// One node of a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Numeric split: `feature < threshold` goes left; missing values go left.
    Split {
        feature: u32,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    },
    Leaf {
        value: f64,
    },
}

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node {node}: {side} child {child} out of bounds for {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    #[error("node {node}: {side} child {child} is not a forward reference")]
    CycleDetected {
        node: NodeId,
        side: &'static str,
        child: NodeId,
    },
    #[error("split node {node} names feature {feature} but the model has {n_features}")]
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },
}

/// A regression tree stored as a flat node array; node 0 is the root.
///
/// Children always sit at larger indices than their parent, which is what
/// [`Tree::validate`] enforces to rule out cycles in deserialized documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Single-leaf tree responding `value` for every row.
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Response of this tree for one feature vector.
    ///
    /// Traversal: `feature < threshold` goes left, NaN goes left.
    pub fn response(&self, features: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = features[*feature as usize];
                    node = if v.is_nan() || v < *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    /// Check structural invariants, for trees read from untrusted documents.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        if self.nodes.is_empty() {
            return Err(TreeValidationError::EmptyTree);
        }
        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            else {
                continue;
            };
            let idx = idx as NodeId;
            for (side, &child) in [("left", left), ("right", right)] {
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node: idx,
                        side,
                        child,
                        n_nodes,
                    });
                }
                if child <= idx {
                    return Err(TreeValidationError::CycleDetected {
                        node: idx,
                        side,
                        child,
                    });
                }
            }
            if *feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node: idx,
                    feature: *feature,
                    n_features,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, left_val: f64, right_val: f64) -> Tree {
        Tree::new(vec![
            Node::Split {
                feature: 0,
                threshold,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: left_val },
            Node::Leaf { value: right_val },
        ])
    }

    #[test]
    fn routes_below_threshold_left() {
        let tree = stump(0.5, 1.0, 2.0);
        assert_eq!(tree.response(&[0.3]), 1.0);
        assert_eq!(tree.response(&[0.5]), 2.0);
        assert_eq!(tree.response(&[0.7]), 2.0);
    }

    #[test]
    fn missing_values_go_left() {
        let tree = stump(0.5, 1.0, 2.0);
        assert_eq!(tree.response(&[f64::NAN]), 1.0);
    }

    #[test]
    fn leaf_tree_responds_everywhere() {
        let tree = Tree::leaf(0.25);
        assert_eq!(tree.response(&[1.0]), 0.25);
        assert_eq!(tree.response(&[-1.0]), 0.25);
    }

    #[test]
    fn validate_accepts_well_formed_trees() {
        assert_eq!(stump(0.5, 1.0, 2.0).validate(1), Ok(()));
        assert_eq!(Tree::leaf(0.0).validate(1), Ok(()));
    }

    #[test]
    fn validate_rejects_damage() {
        assert_eq!(
            Tree::new(Vec::new()).validate(1),
            Err(TreeValidationError::EmptyTree)
        );

        let dangling = Tree::new(vec![Node::Split {
            feature: 0,
            threshold: 0.5,
            left: 1,
            right: 9,
        }]);
        assert!(matches!(
            dangling.validate(1),
            Err(TreeValidationError::ChildOutOfBounds { child: 1, .. })
        ));

        let looping = Tree::new(vec![
            Node::Split {
                feature: 0,
                threshold: 0.5,
                left: 0,
                right: 1,
            },
            Node::Leaf { value: 0.0 },
        ]);
        assert!(matches!(
            looping.validate(1),
            Err(TreeValidationError::CycleDetected { child: 0, .. })
        ));

        assert!(matches!(
            stump(0.5, 1.0, 2.0).validate(0),
            Err(TreeValidationError::FeatureOutOfRange { .. })
        ));
    }
}
