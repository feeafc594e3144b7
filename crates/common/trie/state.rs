use std::collections::HashMap;

use crate::{error::TrieError, node::Node, node_hash::NodeHash};

/// In-memory node store.
///
/// Nodes are keyed by their [`NodeHash`]; inline references are stored under
/// the encoding itself, so lookups never need to know which form a parent
/// used. Stale nodes from overwritten paths stay in the map until the trie is
/// dropped, which is fine for block-scoped tries.
#[derive(Debug, Default)]
pub struct TrieState {
    nodes: HashMap<NodeHash, Node>,
}

impl TrieState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_node(&self, hash: NodeHash) -> Result<Option<Node>, TrieError> {
        Ok(self.nodes.get(&hash).cloned())
    }

    pub fn insert_node(&mut self, hash: NodeHash, node: Node) {
        self.nodes.insert(hash, node);
    }
}
