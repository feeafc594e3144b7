use bytes::BufMut;
use tern_rlp::encode::{RLPEncode, encode_length};

use crate::{
    ValueRLP,
    error::TrieError,
    nibbles::Nibbles,
    node::{ExtensionNode, LeafNode, Node},
    node_hash::NodeHash,
    state::TrieState,
};

/// A branch fans out over the 16 possible next nibbles; a key ending exactly
/// here stores its value in the branch itself.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub choices: [NodeHash; 16],
    pub value: ValueRLP,
}

impl BranchNode {
    pub const EMPTY_CHOICES: [NodeHash; 16] = [NodeHash::Inline(([0; 31], 0)); 16];

    pub fn new(choices: [NodeHash; 16]) -> Self {
        Self {
            choices,
            value: ValueRLP::new(),
        }
    }

    pub fn new_with_value(choices: [NodeHash; 16], value: ValueRLP) -> Self {
        Self { choices, value }
    }

    pub fn get(&self, state: &TrieState, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        match path.next_choice() {
            Some(choice) if self.choices[choice].is_valid() => {
                let child = state
                    .get_node(self.choices[choice])?
                    .ok_or(TrieError::InconsistentTree)?;
                child.get(state, path)
            }
            Some(_) => Ok(None),
            None => Ok((!self.value.is_empty()).then(|| self.value.clone())),
        }
    }

    pub fn insert(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        match path.next_choice() {
            Some(choice) if self.choices[choice].is_valid() => {
                let child = state
                    .get_node(self.choices[choice])?
                    .ok_or(TrieError::InconsistentTree)?;
                self.choices[choice] = child.insert(state, path, value)?.insert_self(state);
            }
            Some(choice) => {
                self.choices[choice] =
                    Node::from(LeafNode::new(path, value)).insert_self(state);
            }
            None => self.value = value,
        }
        Ok(self.into())
    }

    pub fn remove(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        let removed = match path.next_choice() {
            Some(choice) if self.choices[choice].is_valid() => {
                let child = state
                    .get_node(self.choices[choice])?
                    .ok_or(TrieError::InconsistentTree)?;
                let (child, removed) = child.remove(state, path)?;
                self.choices[choice] = match child {
                    Some(child) => child.insert_self(state),
                    None => NodeHash::default(),
                };
                removed
            }
            Some(_) => None,
            None => (!self.value.is_empty()).then(|| std::mem::take(&mut self.value)),
        };

        let mut children = self
            .choices
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_valid());
        let first_child = children.next();
        let multiple_children = children.next().is_some();

        let node = match (first_child, multiple_children, self.value.is_empty()) {
            // Nothing left at all.
            (None, _, true) => None,
            // Only the branch's own value: shrink to a leaf ending here.
            (None, _, false) => {
                Some(LeafNode::new(Nibbles::from_hex(vec![16]), self.value).into())
            }
            // A single child and no value: pull the child up one nibble.
            (Some((choice, child_hash)), false, true) => {
                let child = state
                    .get_node(*child_hash)?
                    .ok_or(TrieError::InconsistentTree)?;
                match child {
                    Node::Leaf(mut leaf) => {
                        leaf.partial.prepend(choice as u8);
                        Some(leaf.into())
                    }
                    Node::Extension(mut extension) => {
                        extension.prefix.prepend(choice as u8);
                        Some(extension.into())
                    }
                    Node::Branch(_) => Some(
                        ExtensionNode::new(Nibbles::from_hex(vec![choice as u8]), *child_hash)
                            .into(),
                    ),
                }
            }
            _ => Some(self.into()),
        };
        Ok((node, removed))
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        for child in &self.choices {
            child.encode_child(&mut payload);
        }
        self.value.as_slice().encode(&mut payload);

        let mut buf = Vec::new();
        encode_length(payload.len(), &mut buf);
        buf.put_slice(&payload);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_leaf_branch(state: &mut TrieState) -> BranchNode {
        let mut choices = BranchNode::EMPTY_CHOICES;
        choices[0] = Node::from(LeafNode::new(Nibbles::from_hex(vec![0, 16]), vec![0xaa]))
            .insert_self(state);
        choices[1] = Node::from(LeafNode::new(Nibbles::from_hex(vec![1, 16]), vec![0xbb]))
            .insert_self(state);
        BranchNode::new(choices)
    }

    #[test]
    fn get_follows_choice_nibble() {
        let mut state = TrieState::new();
        let branch = two_leaf_branch(&mut state);
        assert_eq!(
            branch.get(&state, Nibbles::from_bytes(&[0x00])).unwrap(),
            Some(vec![0xaa])
        );
        assert_eq!(
            branch.get(&state, Nibbles::from_bytes(&[0x11])).unwrap(),
            Some(vec![0xbb])
        );
        assert_eq!(
            branch.get(&state, Nibbles::from_bytes(&[0x20])).unwrap(),
            None
        );
    }

    #[test]
    fn insert_into_empty_choice_adds_leaf() {
        let mut state = TrieState::new();
        let branch = two_leaf_branch(&mut state);
        let node = branch
            .insert(&mut state, Nibbles::from_bytes(&[0x30]), vec![0xcc])
            .unwrap();
        assert_eq!(
            node.get(&state, Nibbles::from_bytes(&[0x30])).unwrap(),
            Some(vec![0xcc])
        );
    }

    #[test]
    fn remove_collapses_single_child_branch() {
        let mut state = TrieState::new();
        let branch = two_leaf_branch(&mut state);
        let (node, removed) = branch
            .remove(&mut state, Nibbles::from_bytes(&[0x00]))
            .unwrap();
        assert_eq!(removed, Some(vec![0xaa]));
        let Some(Node::Leaf(leaf)) = node else {
            panic!("expected leaf, got {node:?}");
        };
        assert_eq!(leaf.partial, Nibbles::from_bytes(&[0x11]));
    }

    #[test]
    fn remove_keeps_branch_with_two_children() {
        let mut state = TrieState::new();
        let mut choices = BranchNode::EMPTY_CHOICES;
        for nibble in [0u8, 1, 2] {
            choices[nibble as usize] =
                Node::from(LeafNode::new(Nibbles::from_hex(vec![16]), vec![nibble]))
                    .insert_self(&mut state);
        }
        let branch = BranchNode::new(choices);
        let (node, removed) = branch
            .remove(&mut state, Nibbles::from_hex(vec![0, 16]))
            .unwrap();
        assert_eq!(removed, Some(vec![0]));
        assert!(matches!(node, Some(Node::Branch(_))));
    }
}
