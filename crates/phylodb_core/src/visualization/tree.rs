//! Forest construction over directed distance edges.
//!
//! # Invariants
//! - Roots are edge sources that never appear as a target, deduplicated,
//!   in first-seen edge order. Roots carry distance 0.
//! - Children of a vertex follow its outgoing edges in edge order.
//! - Every vertex appears exactly once in the result. Input where a vertex
//!   is reached twice (cycle or multiple parents) or is unreachable from
//!   every root is rejected as malformed.
//! - Recursion depth never exceeds the configured cap.

use crate::config::DEFAULT_MAX_TREE_DEPTH;
use crate::model::DistanceEdge;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: String,
    /// Distance from the parent vertex, 0 for roots.
    pub distance: i64,
    pub children: Vec<Vertex>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub roots: Vec<Vertex>,
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of vertices across all roots.
    pub fn vertex_count(&self) -> usize {
        let mut pending: Vec<&Vertex> = self.roots.iter().collect();
        let mut count = 0;
        while let Some(vertex) = pending.pop() {
            count += 1;
            pending.extend(vertex.children.iter());
        }
        count
    }
}

// Deep chains would otherwise drop one stack frame per level.
impl Drop for Vertex {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut vertex) = pending.pop() {
            pending.append(&mut vertex.children);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Edges do not form a forest.
    MalformedInput(String),
    DepthExceeded { limit: usize },
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedInput(message) => write!(f, "malformed distance edges: {message}"),
            Self::DepthExceeded { limit } => {
                write!(f, "tree depth exceeds the limit of {limit}")
            }
        }
    }
}

impl Error for TreeError {}

/// Builds forests with a bounded recursion depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeBuilder {
    max_depth: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TREE_DEPTH)
    }
}

impl TreeBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn build(&self, edges: &[DistanceEdge]) -> Result<Tree, TreeError> {
        let mut targets = HashSet::new();
        let mut outgoing: HashMap<&str, Vec<&DistanceEdge>> = HashMap::new();
        let mut nodes = HashSet::new();
        for edge in edges {
            targets.insert(edge.to.as_str());
            outgoing.entry(edge.from.as_str()).or_default().push(edge);
            nodes.insert(edge.from.as_str());
            nodes.insert(edge.to.as_str());
        }

        let mut seen_roots = HashSet::new();
        let roots: Vec<&str> = edges
            .iter()
            .map(|edge| edge.from.as_str())
            .filter(|source| !targets.contains(source) && seen_roots.insert(*source))
            .collect();
        if !edges.is_empty() && roots.is_empty() {
            return Err(TreeError::MalformedInput(
                "every vertex is the target of some edge".to_string(),
            ));
        }

        let mut walk = Walk {
            outgoing: &outgoing,
            visited: HashSet::new(),
            max_depth: self.max_depth,
            stack: Vec::new(),
        };
        let roots = roots
            .into_iter()
            .map(|root| walk.subtree(root))
            .collect::<Result<Vec<_>, _>>()?;

        if walk.visited.len() != nodes.len() {
            return Err(TreeError::MalformedInput(format!(
                "{} vertices are unreachable from any root",
                nodes.len() - walk.visited.len()
            )));
        }

        debug!(
            "event=tree_build module=visualization status=ok roots={} vertices={}",
            roots.len(),
            nodes.len()
        );
        Ok(Tree { roots })
    }
}

/// Builds a forest with the default depth cap.
pub fn build_tree(edges: &[DistanceEdge]) -> Result<Tree, TreeError> {
    TreeBuilder::default().build(edges)
}

/// Depth-first walk over an explicit stack so depth is bounded only by
/// `max_depth`, never by the thread stack.
struct Walk<'a> {
    outgoing: &'a HashMap<&'a str, Vec<&'a DistanceEdge>>,
    visited: HashSet<&'a str>,
    max_depth: usize,
    stack: Vec<Frame<'a>>,
}

/// A vertex whose outgoing edges are still being expanded.
struct Frame<'a> {
    id: &'a str,
    distance: i64,
    next_edge: usize,
    children: Vec<Vertex>,
}

impl<'a> Walk<'a> {
    fn subtree(&mut self, root: &'a str) -> Result<Vertex, TreeError> {
        self.stack.clear();
        self.enter(root, 0)?;

        loop {
            let depth = self.stack.len();
            let Some(frame) = self.stack.last_mut() else {
                return Err(TreeError::MalformedInput("walk lost its root".to_string()));
            };
            let next = self
                .outgoing
                .get(frame.id)
                .and_then(|edges| edges.get(frame.next_edge))
                .copied();
            if let Some(edge) = next {
                frame.next_edge += 1;
                self.check_depth(depth)?;
                self.enter(edge.to.as_str(), edge.distance)?;
                continue;
            }

            let Some(done) = self.stack.pop() else {
                return Err(TreeError::MalformedInput("walk lost its root".to_string()));
            };
            let vertex = Vertex {
                id: done.id.to_string(),
                distance: done.distance,
                children: done.children,
            };
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(vertex),
                None => return Ok(vertex),
            }
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), TreeError> {
        if depth > self.max_depth {
            return Err(TreeError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn enter(&mut self, id: &'a str, distance: i64) -> Result<(), TreeError> {
        if !self.visited.insert(id) {
            return Err(TreeError::MalformedInput(format!(
                "vertex `{id}` is reached more than once"
            )));
        }
        self.stack.push(Frame {
            id,
            distance,
            next_edge: 0,
            children: Vec::new(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{build_tree, TreeBuilder, TreeError, Vertex};
    use crate::config::DEFAULT_MAX_TREE_DEPTH;
    use crate::model::DistanceEdge;

    #[test]
    fn default_builder_uses_configured_cap() {
        assert_eq!(TreeBuilder::default().max_depth(), DEFAULT_MAX_TREE_DEPTH);
    }

    fn edge(from: &str, to: &str, distance: i64) -> DistanceEdge {
        DistanceEdge::new(from, to, distance)
    }

    fn ids(vertices: &[Vertex]) -> Vec<&str> {
        vertices.iter().map(|vertex| vertex.id.as_str()).collect()
    }

    #[test]
    fn single_root_with_nested_children() {
        let tree = build_tree(&[edge("A", "B", 1), edge("A", "C", 2), edge("B", "D", 1)]).unwrap();

        assert_eq!(ids(&tree.roots), vec!["A"]);
        let root = &tree.roots[0];
        assert_eq!(root.distance, 0);
        assert_eq!(ids(&root.children), vec!["B", "C"]);
        assert_eq!(root.children[0].distance, 1);
        assert_eq!(root.children[1].distance, 2);
        assert_eq!(ids(&root.children[0].children), vec!["D"]);
        assert_eq!(root.children[0].children[0].distance, 1);
        assert!(root.children[1].children.is_empty());
        assert_eq!(tree.vertex_count(), 4);
    }

    #[test]
    fn disjoint_edges_give_two_roots_in_edge_order() {
        let tree = build_tree(&[edge("X", "Y", 3), edge("A", "B", 1)]).unwrap();
        assert_eq!(ids(&tree.roots), vec!["X", "A"]);
    }

    #[test]
    fn repeated_sources_yield_one_root() {
        let tree = build_tree(&[edge("A", "B", 1), edge("A", "C", 1), edge("A", "D", 1)]).unwrap();
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(ids(&tree.roots[0].children), vec!["B", "C", "D"]);
    }

    #[test]
    fn empty_input_is_an_empty_forest() {
        let tree = build_tree(&[]).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn pure_cycle_has_no_roots() {
        let err = build_tree(&[edge("A", "B", 1), edge("B", "A", 1)]).unwrap_err();
        assert!(matches!(err, TreeError::MalformedInput(_)));
    }

    #[test]
    fn cycle_below_a_root_is_rejected() {
        let err = build_tree(&[edge("R", "A", 1), edge("A", "B", 1), edge("B", "A", 1)]).unwrap_err();
        assert!(matches!(err, TreeError::MalformedInput(_)));
    }

    #[test]
    fn shared_child_is_rejected() {
        let err = build_tree(&[edge("A", "C", 1), edge("B", "C", 1)]).unwrap_err();
        assert!(matches!(err, TreeError::MalformedInput(message) if message.contains("`C`")));
    }

    #[test]
    fn unreachable_cycle_is_rejected() {
        let err = build_tree(&[edge("A", "B", 1), edge("C", "D", 1), edge("D", "C", 1)]).unwrap_err();
        assert!(matches!(err, TreeError::MalformedInput(_)));
    }

    #[test]
    fn depth_cap_is_enforced() {
        let chain = chain(5);

        assert!(TreeBuilder::new(5).build(&chain).is_ok());
        assert_eq!(
            TreeBuilder::new(4).build(&chain),
            Err(TreeError::DepthExceeded { limit: 4 })
        );
    }

    fn chain(length: usize) -> Vec<DistanceEdge> {
        (0..length)
            .map(|index| edge(&format!("n{index}"), &format!("n{}", index + 1), 1))
            .collect()
    }

    #[test]
    fn chain_at_the_default_cap_builds_on_a_test_thread() {
        let tree = build_tree(&chain(DEFAULT_MAX_TREE_DEPTH)).unwrap();

        assert_eq!(tree.vertex_count(), DEFAULT_MAX_TREE_DEPTH + 1);
        let mut deepest = &tree.roots[0];
        let mut depth = 0;
        while let Some(child) = deepest.children.first() {
            deepest = child;
            depth += 1;
        }
        assert_eq!(depth, DEFAULT_MAX_TREE_DEPTH);
        assert_eq!(deepest.id, format!("n{DEFAULT_MAX_TREE_DEPTH}"));
    }

    #[test]
    fn chain_past_the_default_cap_fails_cleanly() {
        let err = build_tree(&chain(DEFAULT_MAX_TREE_DEPTH + 1)).unwrap_err();
        assert_eq!(
            err,
            TreeError::DepthExceeded {
                limit: DEFAULT_MAX_TREE_DEPTH
            }
        );
    }

    #[test]
    fn very_deep_chain_respects_a_raised_cap() {
        let length = 50_000;
        let tree = TreeBuilder::new(length).build(&chain(length)).unwrap();
        assert_eq!(tree.vertex_count(), length + 1);
    }

    #[test]
    fn tree_serializes_for_presentation() {
        let tree = build_tree(&[edge("A", "B", 2)]).unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["roots"][0]["id"], "A");
        assert_eq!(json["roots"][0]["children"][0]["distance"], 2);
    }
}
