//! An append-only, fixed-depth binary Merkle tree accumulator backed by a
//! generic transactional key/value store, with a pluggable hash function.
//!
//! - [`hasher`] defines the capability a caller plugs in: how an element
//!   hashes itself and how two child hashes combine into a parent.
//! - [`witness`] is the self-contained membership proof produced against a
//!   historical root.
//! - [`storage`] is the generic transactional store the tree is built on;
//!   it knows nothing about Merkle trees.
//! - [`merkle_tree`] ties the two together into the accumulator itself.

pub mod encoding;
pub mod error;
pub mod hasher;
pub mod merkle_tree;
pub mod storage;
pub mod witness;

#[cfg(test)]
pub(crate) mod test_helper;

pub use error::{EncodingError, StorageError, TreeError};
pub use hasher::{HashableElement, MerkleHash, MerkleHasher};
pub use merkle_tree::{depth_at_leaf_count, LeafRecord, MerkleTree, NodeRecord};
pub use witness::{Side, Witness, WitnessNode};
