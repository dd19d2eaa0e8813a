//! Document tree
//!
//! Arena of nodes addressed by id. Children are stored as ordered id lists, so the tree
//! maps directly onto the key-value layout of the store.

pub mod builder;
pub mod node;
pub mod persist;
pub mod writer;

pub use builder::{parse, TreeBuilder};
pub use node::{Node, ROOT_ID};
pub use writer::{render_outline, serialize};

use crate::error::NiwaError;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: HashMap<String, Node>,
}

impl Tree {
    pub(crate) fn from_parts(nodes: Vec<Node>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    /// Rebuild from stored nodes. Fails if there is no root.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, NiwaError> {
        let tree = Self::from_parts(nodes);
        if !tree.nodes.contains_key(ROOT_ID) {
            return Err(NiwaError::NodeNotFound(ROOT_ID.to_string()));
        }
        Ok(tree)
    }

    /// The root node. Every constructor guarantees one exists.
    pub fn root(&self) -> &Node {
        &self.nodes[ROOT_ID]
    }

    pub fn lookup(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|n| n.parent_id.as_deref())
    }

    /// Nodes in document order (pre-order, children in stored order).
    pub fn walk(&self) -> Vec<&Node> {
        self.walk_with_depth().into_iter().map(|(_, n)| n).collect()
    }

    pub fn walk_with_depth(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, ROOT_ID)];
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child.as_str()));
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_nodes(self) -> impl Iterator<Item = Node> {
        self.nodes.into_values()
    }
}
