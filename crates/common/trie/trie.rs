pub mod error;
mod nibbles;
mod node;
mod node_hash;
mod state;

use ethereum_types::H256;
use lazy_static::lazy_static;
use sha3::{Digest, Keccak256};
use tern_rlp::constants::RLP_NULL;

pub use self::error::TrieError;
pub use self::nibbles::Nibbles;
pub use self::node::Node;
pub use self::node_hash::NodeHash;
pub use self::state::TrieState;

use self::node::LeafNode;

lazy_static! {
    /// Hash of the empty trie: keccak(RLP of the empty string).
    pub static ref EMPTY_TRIE_HASH: H256 = H256::from_slice(
        Keccak256::new()
            .chain_update([RLP_NULL])
            .finalize()
            .as_slice(),
    );
}

/// RLP-encoded trie path
pub type PathRLP = Vec<u8>;
/// RLP-encoded trie value
pub type ValueRLP = Vec<u8>;

/// In-memory Ethereum-compatible Merkle Patricia Trie.
#[derive(Debug, Default)]
pub struct Trie {
    /// Reference to the current root node, if the trie is non-empty.
    root: Option<NodeHash>,
    /// Node store.
    state: TrieState,
}

impl Trie {
    /// Creates a new empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a value given its path.
    pub fn get(&self, path: &PathRLP) -> Result<Option<ValueRLP>, TrieError> {
        let Some(root) = &self.root else {
            return Ok(None);
        };
        let root_node = self
            .state
            .get_node(*root)?
            .ok_or(TrieError::InconsistentTree)?;
        root_node.get(&self.state, Nibbles::from_bytes(path))
    }

    /// Inserts a value into the trie.
    pub fn insert(&mut self, path: PathRLP, value: ValueRLP) -> Result<(), TrieError> {
        let path = Nibbles::from_bytes(&path);
        match self.root.take() {
            Some(root) => {
                let root_node = self
                    .state
                    .get_node(root)?
                    .ok_or(TrieError::InconsistentTree)?;
                let root_node = root_node.insert(&mut self.state, path, value)?;
                self.root = Some(root_node.insert_self(&mut self.state));
            }
            None => {
                let leaf = Node::from(LeafNode::new(path, value));
                self.root = Some(leaf.insert_self(&mut self.state));
            }
        }
        Ok(())
    }

    /// Removes a value from the trie, returning it if it was present.
    pub fn remove(&mut self, path: &PathRLP) -> Result<Option<ValueRLP>, TrieError> {
        let Some(root) = self.root.take() else {
            return Ok(None);
        };
        let root_node = self
            .state
            .get_node(root)?
            .ok_or(TrieError::InconsistentTree)?;
        let (root_node, old_value) =
            root_node.remove(&mut self.state, Nibbles::from_bytes(path))?;
        self.root = root_node.map(|node| node.insert_self(&mut self.state));
        Ok(old_value)
    }

    /// Returns the hash of the root node, or [`struct@EMPTY_TRIE_HASH`] for an
    /// empty trie. Root references are computed bottom-up on insertion, so
    /// this is a lookup, not a re-hash.
    pub fn hash(&self) -> H256 {
        self.root
            .as_ref()
            .map(|root| root.finalize())
            .unwrap_or(*EMPTY_TRIE_HASH)
    }

    /// Builds a throwaway trie from the iterator's entries and returns its
    /// root hash. Used for the ordered tries (transactions, receipts) whose
    /// nodes are never needed again.
    pub fn compute_hash_from_unsorted_iter(
        iter: impl Iterator<Item = (PathRLP, ValueRLP)>,
    ) -> Result<H256, TrieError> {
        let mut trie = Trie::new();
        for (path, value) in iter {
            trie.insert(path, value)?;
        }
        Ok(trie.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

    #[test]
    fn empty_trie_root() {
        assert_eq!(
            Trie::new().hash().0,
            hex!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421")
        );
        assert_eq!(*EMPTY_TRIE_HASH, Trie::new().hash());
    }

    #[test]
    fn single_leaf_root_is_hash_of_leaf_rlp() {
        let mut trie = Trie::new();
        trie.insert(b"key".to_vec(), b"value".to_vec()).unwrap();

        let leaf = LeafNode::new(Nibbles::from_bytes(b"key"), b"value".to_vec());
        let expected = H256::from_slice(&Keccak256::digest(leaf.encode_raw()));
        assert_eq!(trie.hash(), expected);
    }

    #[test]
    fn known_root_from_reference_vectors() {
        // Shared vector from the Ethereum reference trie tests.
        let mut trie = Trie::new();
        trie.insert(b"do".to_vec(), b"verb".to_vec()).unwrap();
        trie.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        trie.insert(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        trie.insert(b"horse".to_vec(), b"stallion".to_vec()).unwrap();
        assert_eq!(
            trie.hash().0,
            hex!("5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84")
        );
    }

    #[test]
    fn get_inserted_values() {
        let mut trie = Trie::new();
        trie.insert(b"horse".to_vec(), b"stallion".to_vec()).unwrap();
        trie.insert(b"doge".to_vec(), b"coin".to_vec()).unwrap();

        assert_eq!(trie.get(&b"horse".to_vec()).unwrap(), Some(b"stallion".to_vec()));
        assert_eq!(trie.get(&b"doge".to_vec()).unwrap(), Some(b"coin".to_vec()));
        assert_eq!(trie.get(&b"dog".to_vec()).unwrap(), None);
    }

    #[test]
    fn overwrite_value() {
        let mut trie = Trie::new();
        trie.insert(b"key".to_vec(), vec![1]).unwrap();
        trie.insert(b"key".to_vec(), vec![2]).unwrap();
        assert_eq!(trie.get(&b"key".to_vec()).unwrap(), Some(vec![2]));
    }

    #[test]
    fn remove_restores_previous_root() {
        let mut reference = Trie::new();
        reference.insert(b"do".to_vec(), b"verb".to_vec()).unwrap();
        reference.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        let expected = reference.hash();

        let mut trie = Trie::new();
        trie.insert(b"do".to_vec(), b"verb".to_vec()).unwrap();
        trie.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        trie.insert(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        trie.insert(b"horse".to_vec(), b"stallion".to_vec()).unwrap();

        assert_eq!(trie.remove(&b"horse".to_vec()).unwrap(), Some(b"stallion".to_vec()));
        assert_eq!(trie.remove(&b"doge".to_vec()).unwrap(), Some(b"coin".to_vec()));
        assert_eq!(trie.remove(&b"doge".to_vec()).unwrap(), None);
        assert_eq!(trie.hash(), expected);
    }

    #[test]
    fn remove_only_key_empties_the_trie() {
        let mut trie = Trie::new();
        trie.insert(b"key".to_vec(), b"value".to_vec()).unwrap();
        assert_eq!(trie.remove(&b"key".to_vec()).unwrap(), Some(b"value".to_vec()));
        assert_eq!(trie.hash(), *EMPTY_TRIE_HASH);
    }

    #[test]
    fn insert_get_random_keys() {
        let mut rng = StdRng::seed_from_u64(0x7e51);
        let entries: std::collections::HashMap<Vec<u8>, Vec<u8>> = (0..256)
            .map(|i: u32| {
                let mut key = vec![0u8; rng.gen_range(1..33)];
                rng.fill(key.as_mut_slice());
                (key, i.to_be_bytes().to_vec())
            })
            .collect();

        let mut trie = Trie::new();
        for (key, value) in &entries {
            trie.insert(key.clone(), value.clone()).unwrap();
        }
        for (key, value) in &entries {
            assert_eq!(trie.get(key).unwrap(), Some(value.clone()));
        }
    }

    #[test]
    fn root_is_insertion_order_independent() {
        let mut rng = StdRng::seed_from_u64(0xda7a);
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = (0u16..128)
            .map(|i| {
                let mut key = vec![0u8; 32];
                rng.fill(key.as_mut_slice());
                (key, i.to_be_bytes().to_vec())
            })
            .collect();

        let mut first = Trie::new();
        for (key, value) in &entries {
            first.insert(key.clone(), value.clone()).unwrap();
        }

        entries.shuffle(&mut rng);
        let mut second = Trie::new();
        for (key, value) in &entries {
            second.insert(key.clone(), value.clone()).unwrap();
        }

        assert_eq!(first.hash(), second.hash());
    }
}
