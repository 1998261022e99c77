//! Env tree: nested view of flat environment keys.
//!
//! `DATABASE__CONNECTION__TIMEOUT=60` becomes
//! `{DATABASE: {CONNECTION: {TIMEOUT: "60"}}}` when the nesting token is `__`.

use crate::env::EnvSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Field name a leaf is moved under when the same path also needs children.
pub const VALUE_SENTINEL: &str = "__value__";

/// A node in the env tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnvNode {
    Leaf(String),
    Tree(EnvTree),
}

impl EnvNode {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            EnvNode::Leaf(value) => Some(value),
            EnvNode::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&EnvTree> {
        match self {
            EnvNode::Tree(tree) => Some(tree),
            EnvNode::Leaf(_) => None,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EnvNode::Tree(_))
    }
}

/// Mapping from key segment to leaf value or sub-tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvTree {
    entries: BTreeMap<String, EnvNode>,
}

impl EnvTree {
    /// Build a tree from a snapshot, nesting on `nesting_token`.
    ///
    /// An empty token disables nesting: every key becomes a root leaf.
    pub fn build(snapshot: &EnvSnapshot, nesting_token: &str) -> Self {
        let mut tree = EnvTree::default();
        for (key, value) in snapshot.iter() {
            if nesting_token.is_empty() || !key.contains(nesting_token) {
                tree.insert_leaf(key, value);
                continue;
            }

            let mut segments: Vec<&str> = key.split(nesting_token).collect();
            let last = segments.pop().unwrap_or_default();
            let mut current = &mut tree;
            for segment in segments {
                current = current.subtree_mut(segment);
            }
            current.insert_leaf(last, value);
        }
        tree
    }

    pub fn get(&self, key: &str) -> Option<&EnvNode> {
        self.entries.get(key)
    }

    /// Leaf value at `key`, if `key` holds a leaf.
    pub fn leaf(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(EnvNode::as_leaf)
    }

    /// Sub-tree at `key`, if `key` holds a sub-tree.
    pub fn subtree(&self, key: &str) -> Option<&EnvTree> {
        self.get(key).and_then(EnvNode::as_tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Store a leaf. If a sub-tree already sits at `key`, the value goes
    /// under its sentinel field instead of replacing the children.
    fn insert_leaf(&mut self, key: &str, value: &str) {
        match self.entries.get_mut(key) {
            Some(EnvNode::Tree(children)) => {
                children
                    .entries
                    .insert(VALUE_SENTINEL.to_string(), EnvNode::Leaf(value.to_string()));
            }
            _ => {
                self.entries
                    .insert(key.to_string(), EnvNode::Leaf(value.to_string()));
            }
        }
    }

    /// Walk into `key`, creating an empty sub-tree or demoting a leaf.
    fn subtree_mut(&mut self, key: &str) -> &mut EnvTree {
        let node = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| EnvNode::Tree(EnvTree::default()));

        if let EnvNode::Leaf(value) = &mut *node {
            let mut demoted = EnvTree::default();
            demoted
                .entries
                .insert(VALUE_SENTINEL.to_string(), EnvNode::Leaf(std::mem::take(value)));
            *node = EnvNode::Tree(demoted);
        }

        match node {
            EnvNode::Tree(tree) => tree,
            EnvNode::Leaf(_) => unreachable!("leaf demoted above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_vars(pairs.iter().copied(), "")
    }

    #[test]
    fn empty_snapshot_builds_empty_tree() {
        let tree = EnvTree::build(&EnvSnapshot::default(), "__");
        assert!(tree.is_empty());
    }

    #[test]
    fn flat_keys_stay_flat() {
        let tree = EnvTree::build(&snapshot(&[("HOST", "h"), ("MAX_SIZE", "5")]), "__");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.leaf("HOST"), Some("h"));
        assert_eq!(tree.leaf("MAX_SIZE"), Some("5"));
    }

    #[test]
    fn double_separator_nests() {
        let tree = EnvTree::build(
            &snapshot(&[
                ("DATABASE__HOST", "localhost"),
                ("DATABASE__CONNECTION__TIMEOUT", "60"),
            ]),
            "__",
        );
        let database = tree.subtree("DATABASE").expect("database");
        assert_eq!(database.leaf("HOST"), Some("localhost"));
        let connection = database.subtree("CONNECTION").expect("connection");
        assert_eq!(connection.leaf("TIMEOUT"), Some("60"));
    }

    #[test]
    fn leaf_is_demoted_to_sentinel() {
        let tree = EnvTree::build(&snapshot(&[("POOL", "raw"), ("POOL__SIZE", "3")]), "__");
        let pool = tree.subtree("POOL").expect("pool");
        assert_eq!(pool.leaf(VALUE_SENTINEL), Some("raw"));
        assert_eq!(pool.leaf("SIZE"), Some("3"));
    }

    #[test]
    fn leaf_after_subtree_is_kept() {
        let mut tree = EnvTree::default();
        tree.subtree_mut("POOL").insert_leaf("SIZE", "3");
        tree.insert_leaf("POOL", "raw");
        let pool = tree.subtree("POOL").expect("pool");
        assert_eq!(pool.leaf(VALUE_SENTINEL), Some("raw"));
        assert_eq!(pool.leaf("SIZE"), Some("3"));
    }

    #[test]
    fn custom_nesting_token() {
        let tree = EnvTree::build(&snapshot(&[("POOL..MAX.SIZE", "100")]), "..");
        let pool = tree.subtree("POOL").expect("pool");
        assert_eq!(pool.leaf("MAX.SIZE"), Some("100"));
    }
}
