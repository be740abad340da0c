//! Authentication paths: proof that a given leaf hash is included under a
//! historical root, independent of the tree that produced it.

use crate::hasher::{HashableElement, MerkleHasher};
use std::sync::Arc;

/// Which child an authentication-path step's sibling hash occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One step of an authentication path: the sibling hash at a given depth,
/// and which side it sits on relative to the path being verified.
#[derive(Debug, Clone)]
pub struct WitnessNode<Hash> {
    pub side: Side,
    pub sibling_hash: Hash,
}

/// A self-contained membership proof for one leaf against one historical
/// root. Carries its own hasher handle so `verify` needs nothing from the
/// tree that produced it.
#[derive(Debug, Clone)]
pub struct Witness<H: MerkleHasher> {
    pub tree_size: u32,
    pub root_hash: <H::Element as HashableElement>::Hash,
    pub auth_path: Vec<WitnessNode<<H::Element as HashableElement>::Hash>>,
    pub(crate) hasher: Arc<H>,
}

impl<H: MerkleHasher> Witness<H> {
    /// Recompute the root implied by `leaf_hash` and this authentication
    /// path, depth-by-depth from the leaf upward, and compare it to the
    /// root this witness was issued against.
    pub fn verify(&self, leaf_hash: &<H::Element as HashableElement>::Hash) -> bool {
        let mut current = leaf_hash.clone();
        for (depth, node) in self.auth_path.iter().enumerate() {
            current = match node.side {
                // `node.sibling_hash` is the *left* sibling, so `current`
                // (built so far) is on the right.
                Side::Left => self.hasher.combine_hash(depth, &node.sibling_hash, &current),
                Side::Right => self.hasher.combine_hash(depth, &current, &node.sibling_hash),
            };
        }
        current == self.root_hash
    }
}
