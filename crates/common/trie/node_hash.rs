use ethereum_types::H256;
use sha3::{Digest, Keccak256};
use tern_rlp::encode::RLPEncode;

/// Reference to a node from its parent.
///
/// Nodes whose RLP encoding is shorter than 32 bytes are embedded verbatim in
/// the parent's encoding; larger nodes are referenced by their keccak hash.
/// The distinction is load-bearing: inlining changes the parent's RLP and
/// therefore every hash above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeHash {
    Hashed(H256),
    /// Raw RLP encoding of the node, at most 31 bytes.
    Inline(([u8; 31], u8)),
}

impl NodeHash {
    /// Returns the reference for a node's RLP encoding.
    pub fn from_encoded_raw(encoded: &[u8]) -> NodeHash {
        if encoded.len() >= 32 {
            NodeHash::Hashed(H256::from_slice(&Keccak256::digest(encoded)))
        } else {
            let mut data = [0; 31];
            data[..encoded.len()].copy_from_slice(encoded);
            NodeHash::Inline((data, encoded.len() as u8))
        }
    }

    /// Converts the reference into a definite hash, hashing inline nodes.
    /// Used for the root: the root node is always hashed, embedded or not.
    pub fn finalize(&self) -> H256 {
        match self {
            NodeHash::Hashed(hash) => *hash,
            NodeHash::Inline((data, len)) => {
                H256::from_slice(&Keccak256::digest(&data[..*len as usize]))
            }
        }
    }

    /// An invalid reference marks an absent child.
    pub fn is_valid(&self) -> bool {
        !matches!(self, NodeHash::Inline((_, 0)))
    }

    /// Writes the child reference into a parent's RLP payload: embedded nodes
    /// verbatim, hashed nodes as a 32-byte string, absent children as the
    /// empty string.
    pub fn encode_child(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            NodeHash::Hashed(hash) => hash.as_bytes().encode(buf),
            NodeHash::Inline((_, 0)) => [].encode(buf),
            NodeHash::Inline((data, len)) => buf.put_slice(&data[..*len as usize]),
        }
    }

    /// Length of [`encode_child`](Self::encode_child)'s output.
    pub fn child_length(&self) -> usize {
        match self {
            NodeHash::Hashed(_) => 33,
            NodeHash::Inline((_, len)) => (*len).max(1) as usize,
        }
    }
}

impl Default for NodeHash {
    fn default() -> Self {
        NodeHash::Inline(([0; 31], 0))
    }
}

impl From<H256> for NodeHash {
    fn from(value: H256) -> Self {
        NodeHash::Hashed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_encodings_are_embedded() {
        let encoded = [0xc2, 0x01, 0x02];
        let hash = NodeHash::from_encoded_raw(&encoded);
        assert!(matches!(hash, NodeHash::Inline(_)));
        let mut buf = Vec::new();
        hash.encode_child(&mut buf);
        assert_eq!(buf, encoded);
    }

    #[test]
    fn long_encodings_are_hashed() {
        let encoded = [0xaa; 32];
        let hash = NodeHash::from_encoded_raw(&encoded);
        assert!(matches!(hash, NodeHash::Hashed(_)));
        let mut buf = Vec::new();
        hash.encode_child(&mut buf);
        assert_eq!(buf.len(), 33);
        assert_eq!(buf[0], 0xa0);
    }

    #[test]
    fn default_is_invalid() {
        assert!(!NodeHash::default().is_valid());
        assert!(NodeHash::from_encoded_raw(&[0x80]).is_valid());
    }
}
