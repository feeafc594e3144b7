use tern_rlp::error::RLPDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("The trie references a node that is not in the store")]
    InconsistentTree,
    #[error(transparent)]
    RLPDecode(#[from] RLPDecodeError),
}
