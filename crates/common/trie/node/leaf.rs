use tern_rlp::structs::Encoder;

use crate::{
    ValueRLP,
    error::TrieError,
    nibbles::Nibbles,
    node::{BranchNode, ExtensionNode, Node},
    state::TrieState,
};

/// A leaf holds the remainder of a path (leaf flag included) and its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: ValueRLP,
}

impl LeafNode {
    pub fn new(partial: Nibbles, value: ValueRLP) -> Self {
        Self { partial, value }
    }

    pub fn get(&self, path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        if path == self.partial {
            Ok(Some(self.value.clone()))
        } else {
            Ok(None)
        }
    }

    pub fn insert(
        self,
        state: &mut TrieState,
        path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        // Same path: overwrite in place.
        if path == self.partial {
            return Ok(LeafNode::new(path, value).into());
        }

        // Diverging paths: split through a branch at the first difference,
        // with the shared prefix (if any) becoming an extension above it.
        let match_len = path.count_prefix(&self.partial);
        let mut choices = BranchNode::EMPTY_CHOICES;
        let mut branch_value = ValueRLP::new();

        for (partial, value) in [
            (self.partial.offset(match_len), self.value),
            (path.offset(match_len), value),
        ] {
            match partial.at(0) {
                // Path ends exactly at the branch: the value lives in it.
                16 => branch_value = value,
                choice => {
                    choices[choice] =
                        Node::from(LeafNode::new(partial.offset(1), value)).insert_self(state);
                }
            }
        }
        let branch: Node = BranchNode::new_with_value(choices, branch_value).into();

        if match_len == 0 {
            Ok(branch)
        } else {
            let child = branch.insert_self(state);
            Ok(ExtensionNode::new(path.slice(0, match_len), child).into())
        }
    }

    pub fn remove(self, path: Nibbles) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        if path == self.partial {
            Ok((None, Some(self.value)))
        } else {
            Ok((Some(self.into()), None))
        }
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_bytes(&self.partial.encode_compact())
            .encode_bytes(&self.value)
            .finish();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha3::{Digest, Keccak256};

    #[test]
    fn get_matches_exact_path_only() {
        let leaf = LeafNode::new(Nibbles::from_bytes(&[0x12]), vec![0x42]);
        assert_eq!(
            leaf.get(Nibbles::from_bytes(&[0x12])).unwrap(),
            Some(vec![0x42])
        );
        assert_eq!(leaf.get(Nibbles::from_bytes(&[0x13])).unwrap(), None);
    }

    #[test]
    fn insert_same_path_overwrites() {
        let mut state = TrieState::new();
        let leaf = LeafNode::new(Nibbles::from_bytes(&[0x12]), vec![0x42]);
        let node = leaf
            .insert(&mut state, Nibbles::from_bytes(&[0x12]), vec![0x43])
            .unwrap();
        let Node::Leaf(leaf) = node else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.value, vec![0x43]);
    }

    #[test]
    fn insert_diverging_path_splits_through_branch() {
        let mut state = TrieState::new();
        let leaf = LeafNode::new(Nibbles::from_bytes(&[0x12]), vec![0x42]);
        let node = leaf
            .insert(&mut state, Nibbles::from_bytes(&[0x22]), vec![0x43])
            .unwrap();
        // No shared first nibble: a bare branch with two leaf children.
        let Node::Branch(branch) = node else {
            panic!("expected branch");
        };
        assert!(branch.choices[1].is_valid());
        assert!(branch.choices[2].is_valid());
    }

    #[test]
    fn insert_shared_prefix_builds_extension() {
        let mut state = TrieState::new();
        let leaf = LeafNode::new(Nibbles::from_bytes(&[0x12]), vec![0x42]);
        let node = leaf
            .insert(&mut state, Nibbles::from_bytes(&[0x13]), vec![0x43])
            .unwrap();
        let Node::Extension(extension) = node else {
            panic!("expected extension");
        };
        assert_eq!(extension.prefix.as_ref(), &[0x01]);
    }

    #[test]
    fn encoding_hashes_as_expected() {
        // keccak(rlp([compact_path, value])) for a node over 32 bytes
        let leaf = LeafNode::new(Nibbles::from_bytes(&[0xab; 20]), vec![0xcd; 40]);
        let encoded = leaf.encode_raw();
        assert_eq!(
            Node::from(leaf).compute_hash().finalize().0,
            <[u8; 32]>::from(Keccak256::digest(&encoded)),
        );
    }
}
