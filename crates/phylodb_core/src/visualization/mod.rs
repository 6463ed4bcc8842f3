//! Tree reconstruction from inference distance edges.

pub mod tree;

pub use tree::{build_tree, Tree, TreeBuilder, TreeError, Vertex};
