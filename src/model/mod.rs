//! Ensemble model: flat regression trees, the forest, and its JSON document.

mod forest;
mod tree;

pub use forest::{Forest, ModelError};
pub use tree::{Node, NodeId, Tree, TreeValidationError};
