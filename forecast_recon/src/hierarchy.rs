//! Hierarchy construction and traversal
//!
//! A hierarchy arrives as a parent → ordered-children mapping, for example
//! `Total → [Brand_A, Brand_B]`, `Brand_A → [Brand_A_US, Brand_A_CA]`. It is
//! parsed once into an arena of nodes addressed by [`NodeId`], with the
//! key → id lookup kept as a separate map:
//!
//! ```text
//! Level 0:            Total
//!                    /     \
//! Level 1:     Brand_A     Brand_B
//!              /     \
//! Level 2: Brand_A_US Brand_A_CA
//! ```
//!
//! The model is a strict tree: every node has at most one parent, and every
//! node must be reachable from a root. Child order is kept exactly as
//! declared so that traversal, and therefore reconciliation output, is
//! deterministic.

use crate::error::{ReconError, Result};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Index of a node inside a [`Hierarchy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    key: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    level: usize,
}

impl HierarchyNode {
    /// Unique key of the node
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Parent node, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in declaration order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Generation of the node, 0 for roots
    pub fn level(&self) -> usize {
        self.level
    }

    /// True when the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Collects parent → children declarations and validates them into a [`Hierarchy`]
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder {
    entries: Vec<(String, Vec<String>)>,
}

impl HierarchyBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from any parent → children mapping.
    ///
    /// Declaration order of the mapping decides root order, so pass an
    /// ordered collection (a `Vec` of pairs or a `BTreeMap`) when output
    /// order matters.
    pub fn from_mapping<I, K, C, S>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::new();
        for (parent, children) in mapping {
            builder.add_children(parent, children);
        }
        builder
    }

    /// Declare the children of `parent`, consuming the builder
    pub fn with_children<K, C, S>(mut self, parent: K, children: C) -> Self
    where
        K: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_children(parent, children);
        self
    }

    /// Declare the children of `parent`
    pub fn add_children<K, C, S>(&mut self, parent: K, children: C) -> &mut Self
    where
        K: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push((
            parent.into(),
            children.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Number of parent declarations collected so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate the declarations and build the hierarchy.
    ///
    /// # Errors
    ///
    /// - [`ReconError::InvalidHierarchy`] when a parent is declared twice, a
    ///   child is listed twice, or a child has more than one parent.
    /// - [`ReconError::CycleDetected`] when level expansion does not finish
    ///   within `declarations + 1` rounds or a node cannot be reached from
    ///   any root.
    pub fn build(&self) -> Result<Hierarchy> {
        let mut nodes: Vec<HierarchyNode> = Vec::new();
        let mut index: HashMap<String, NodeId> = HashMap::new();
        let mut declared: HashSet<NodeId> = HashSet::new();
        let mut parent_order: Vec<NodeId> = Vec::with_capacity(self.entries.len());

        for (parent_key, child_keys) in &self.entries {
            let parent = intern(&mut nodes, &mut index, parent_key);
            if !declared.insert(parent) {
                return Err(ReconError::InvalidHierarchy(format!(
                    "parent '{parent_key}' is declared more than once"
                )));
            }
            parent_order.push(parent);

            for child_key in child_keys {
                let child = intern(&mut nodes, &mut index, child_key);
                let existing_parent = nodes[child.0].parent;
                match existing_parent {
                    Some(existing) if existing == parent => {
                        return Err(ReconError::InvalidHierarchy(format!(
                            "child '{child_key}' is listed twice under '{parent_key}'"
                        )));
                    }
                    Some(existing) => {
                        return Err(ReconError::InvalidHierarchy(format!(
                            "child '{child_key}' has more than one parent: '{}' and '{parent_key}'",
                            nodes[existing.0].key
                        )));
                    }
                    None => nodes[child.0].parent = Some(parent),
                }
                nodes[parent.0].children.push(child);
            }
        }

        let roots: Vec<NodeId> = parent_order
            .iter()
            .copied()
            .filter(|id| nodes[id.0].parent.is_none())
            .collect();

        let max_rounds = self.entries.len() + 1;
        let mut levels: Vec<Vec<NodeId>> = Vec::new();
        let mut visited = vec![false; nodes.len()];
        let mut current = roots;

        while !current.is_empty() {
            if levels.len() >= max_rounds {
                return Err(ReconError::CycleDetected(format!(
                    "level expansion did not finish within {max_rounds} rounds"
                )));
            }
            let depth = levels.len();
            let mut next = Vec::new();
            for &id in &current {
                if visited[id.0] {
                    return Err(ReconError::CycleDetected(format!(
                        "node '{}' reached twice during expansion",
                        nodes[id.0].key
                    )));
                }
                visited[id.0] = true;
                nodes[id.0].level = depth;
                next.extend_from_slice(&nodes[id.0].children);
            }
            trace!(level = depth, width = current.len(), "expanded hierarchy level");
            levels.push(current);
            current = next;
        }

        if let Some(stranded) = visited.iter().position(|seen| !seen) {
            return Err(ReconError::CycleDetected(format!(
                "node '{}' is not reachable from any root",
                nodes[stranded].key
            )));
        }

        debug!(
            nodes = nodes.len(),
            levels = levels.len(),
            roots = levels.first().map_or(0, Vec::len),
            "built hierarchy"
        );

        Ok(Hierarchy {
            nodes,
            index,
            levels,
        })
    }
}

fn intern(nodes: &mut Vec<HierarchyNode>, index: &mut HashMap<String, NodeId>, key: &str) -> NodeId {
    if let Some(&id) = index.get(key) {
        return id;
    }
    let id = NodeId(nodes.len());
    nodes.push(HierarchyNode {
        key: key.to_string(),
        parent: None,
        children: Vec::new(),
        level: 0,
    });
    index.insert(key.to_string(), id);
    id
}

/// Parse a parent → children mapping into its levels, roots first.
///
/// Each level lists node keys; level `k + 1` is the concatenation of the
/// children of the level-`k` nodes in declaration order. An empty mapping
/// yields no levels.
pub fn build_levels<I, K, C, S>(mapping: I) -> Result<Vec<Vec<String>>>
where
    I: IntoIterator<Item = (K, C)>,
    K: Into<String>,
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    Ok(HierarchyBuilder::from_mapping(mapping).build()?.level_keys())
}

/// A validated strict tree of forecast nodes
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    index: HashMap<String, NodeId>,
    levels: Vec<Vec<NodeId>>,
}

impl Hierarchy {
    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for a hierarchy without nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when `key` names a node
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a node id by key
    pub fn id(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Look up a node id by key, failing with [`ReconError::UnknownNode`]
    pub fn require(&self, key: &str) -> Result<NodeId> {
        self.id(key)
            .ok_or_else(|| ReconError::UnknownNode(key.to_string()))
    }

    /// Node stored at `id`
    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.0]
    }

    /// Key of the node at `id`
    pub fn key(&self, id: NodeId) -> &str {
        &self.nodes[id.0].key
    }

    /// Children of `id` in declaration order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// True when `id` has no children
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_leaf()
    }

    /// Root nodes in declaration order
    pub fn roots(&self) -> &[NodeId] {
        match self.levels.first() {
            Some(level) => level,
            None => &[],
        }
    }

    /// Node ids grouped by generation, roots first
    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    /// Node keys grouped by generation, roots first
    pub fn level_keys(&self) -> Vec<Vec<String>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&id| self.key(id).to_string()).collect())
            .collect()
    }

    /// Number of generations
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Leaf nodes in level order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.levels
            .iter()
            .flatten()
            .copied()
            .filter(|&id| self.is_leaf(id))
            .collect()
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    /// Generations of the subtree rooted at `id`, starting with `id` itself
    pub fn subtree_levels(&self, id: NodeId) -> Vec<Vec<NodeId>> {
        let mut levels = Vec::new();
        let mut current = vec![id];
        while !current.is_empty() {
            let next: Vec<NodeId> = current
                .iter()
                .flat_map(|&node| self.children(node).iter().copied())
                .collect();
            levels.push(current);
            current = next;
        }
        levels
    }

    /// Every node below `id` in breadth-first order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree_levels(id).into_iter().skip(1).flatten().collect()
    }

    /// Iterate over `(id, node)` pairs in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &HierarchyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i), node))
    }
}
