//! Recursive Length Prefix (RLP) encoding and decoding.
//!
//! RLP is the serialization format used throughout Ethereum for transactions,
//! account records, trie nodes and receipts. The encoder always produces the
//! canonical form; the decoder rejects every non-canonical encoding it can
//! detect (non-minimal lengths, leading zeros, could-have-been-short items).
//!
//! - [`encode::RLPEncode`] / [`decode::RLPDecode`]: the core traits.
//! - [`structs::Encoder`] / [`structs::Decoder`]: field-by-field builders for
//!   struct encodings.

pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod structs;
