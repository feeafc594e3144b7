use bytes::BufMut;
use tern_rlp::encode::{RLPEncode, encode_length};

use crate::{
    ValueRLP,
    error::TrieError,
    nibbles::Nibbles,
    node::{BranchNode, LeafNode, Node},
    node_hash::NodeHash,
    state::TrieState,
};

/// An extension compresses a run of nibbles every key below it shares.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: NodeHash,
}

impl ExtensionNode {
    pub fn new(prefix: Nibbles, child: NodeHash) -> Self {
        Self { prefix, child }
    }

    pub fn get(&self, state: &TrieState, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        if path.skip_prefix(&self.prefix) {
            let child = state
                .get_node(self.child)?
                .ok_or(TrieError::InconsistentTree)?;
            child.get(state, path)
        } else {
            Ok(None)
        }
    }

    pub fn insert(
        self,
        state: &mut TrieState,
        mut path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        // Whole prefix shared: descend.
        if path.skip_prefix(&self.prefix) {
            let child = state
                .get_node(self.child)?
                .ok_or(TrieError::InconsistentTree)?;
            let child = child.insert(state, path, value)?.insert_self(state);
            return Ok(ExtensionNode::new(self.prefix, child).into());
        }

        // Paths diverge inside the prefix: break the extension at the
        // divergence point with a branch.
        let match_len = path.count_prefix(&self.prefix);
        let mut choices = BranchNode::EMPTY_CHOICES;
        let mut branch_value = ValueRLP::new();

        // The old subtree hangs under its diverging nibble, behind the
        // unshared tail of the prefix if one remains.
        let old_tail = self.prefix.offset(match_len + 1);
        choices[self.prefix.at(match_len)] = if old_tail.is_empty() {
            self.child
        } else {
            Node::from(ExtensionNode::new(old_tail, self.child)).insert_self(state)
        };

        let new_tail = path.offset(match_len);
        match new_tail.at(0) {
            16 => branch_value = value,
            choice => {
                choices[choice] =
                    Node::from(LeafNode::new(new_tail.offset(1), value)).insert_self(state);
            }
        }
        let branch: Node = BranchNode::new_with_value(choices, branch_value).into();

        if match_len == 0 {
            Ok(branch)
        } else {
            let child = branch.insert_self(state);
            Ok(ExtensionNode::new(self.prefix.slice(0, match_len), child).into())
        }
    }

    pub fn remove(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        if !path.skip_prefix(&self.prefix) {
            return Ok((Some(self.into()), None));
        }
        let child = state
            .get_node(self.child)?
            .ok_or(TrieError::InconsistentTree)?;
        let (child, value) = child.remove(state, path)?;

        // Fuse with whatever the child collapsed into.
        let node = match child {
            None => None,
            Some(Node::Leaf(mut leaf)) => {
                leaf.partial = self.prefix.concat(&leaf.partial);
                Some(leaf.into())
            }
            Some(Node::Extension(extension)) => {
                self.prefix = self.prefix.concat(&extension.prefix);
                self.child = extension.child;
                Some(self.into())
            }
            Some(branch) => {
                self.child = branch.insert_self(state);
                Some(self.into())
            }
        };
        Ok((node, value))
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let compact = self.prefix.encode_compact();
        let mut payload = Vec::new();
        compact.as_slice().encode(&mut payload);
        self.child.encode_child(&mut payload);

        let mut buf = Vec::new();
        encode_length(payload.len(), &mut buf);
        buf.put_slice(&payload);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(state: &mut TrieState) -> ExtensionNode {
        // Two leaves under a branch under an extension with prefix [0].
        let leaf_a = Node::from(LeafNode::new(
            Nibbles::from_bytes(&[0x01]).offset(2),
            vec![0xaa],
        ));
        let leaf_b = Node::from(LeafNode::new(
            Nibbles::from_bytes(&[0x02]).offset(2),
            vec![0xbb],
        ));
        let mut choices = BranchNode::EMPTY_CHOICES;
        choices[1] = leaf_a.insert_self(state);
        choices[2] = leaf_b.insert_self(state);
        let branch = Node::from(BranchNode::new(choices)).insert_self(state);
        ExtensionNode::new(Nibbles::from_hex(vec![0]), branch)
    }

    #[test]
    fn get_descends_through_prefix() {
        let mut state = TrieState::new();
        let extension = build(&mut state);
        assert_eq!(
            extension
                .get(&state, Nibbles::from_bytes(&[0x01]))
                .unwrap(),
            Some(vec![0xaa])
        );
        assert_eq!(
            extension
                .get(&state, Nibbles::from_bytes(&[0x12]))
                .unwrap(),
            None
        );
    }

    #[test]
    fn insert_divergence_breaks_prefix() {
        let mut state = TrieState::new();
        let extension = build(&mut state);
        let node = extension
            .insert(&mut state, Nibbles::from_bytes(&[0x31]), vec![0xcc])
            .unwrap();
        // 0x31 diverges at the very first nibble, so the extension must have
        // been replaced by a branch.
        assert!(matches!(node, Node::Branch(_)));
    }

    #[test]
    fn remove_fuses_leftover_leaf() {
        let mut state = TrieState::new();
        let extension = build(&mut state);
        let (node, removed) = extension
            .remove(&mut state, Nibbles::from_bytes(&[0x02]))
            .unwrap();
        assert_eq!(removed, Some(vec![0xbb]));
        // Only one leaf remains; the branch collapses and the extension
        // fuses the whole path back into it.
        let Some(Node::Leaf(leaf)) = node else {
            panic!("expected leaf, got {node:?}");
        };
        assert_eq!(leaf.value, vec![0xaa]);
        assert_eq!(leaf.partial, Nibbles::from_bytes(&[0x01]));
    }
}
