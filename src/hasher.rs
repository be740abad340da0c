//! The pluggable hash capability the engine is built on top of. Nothing in
//! `crate::merkle_tree` or `crate::storage` knows anything about the
//! concrete hash function, element encoding, or hash width in use; they
//! only ever go through this trait.

use std::fmt::Debug;
use std::io;

/// Marker trait for anything usable as a hash value in the tree.
pub trait MerkleHash: Clone + PartialEq + Eq + Debug {}

impl<T> MerkleHash for T where T: Clone + PartialEq + Eq + Debug {}

/// An element that can be hashed and written to a byte stream. Elements are
/// opaque to the tree beyond this: a note commitment, a nullifier,
/// whatever the caller's ledger calls a leaf.
pub trait HashableElement: Clone + PartialEq + Debug {
    type Hash: MerkleHash;

    /// Calculate the hash of this element.
    fn merkle_hash(&self) -> Self::Hash;

    /// Write this element to a writer, in a self-delimiting way (the
    /// reader must be able to tell where the element ends without an
    /// external length).
    fn write<W: io::Write>(&self, writer: &mut W) -> io::Result<()>;
}

/// The caller-supplied hashing capability: reading/writing elements and
/// hashes, and combining two child hashes into a parent. Depth 0 is the
/// level at which two leaves are combined; depth increases toward the
/// root.
pub trait MerkleHasher: Send + Sync {
    type Element: HashableElement;

    /// Hash a single element. Defaults to the element's own
    /// `merkle_hash`; overridable for hashers that need external state
    /// (e.g. curve parameters) to do the hashing.
    fn hash(&self, element: &Self::Element) -> <Self::Element as HashableElement>::Hash {
        element.merkle_hash()
    }

    /// Combine two child hashes at the given depth into their parent's
    /// hash.
    fn combine_hash(
        &self,
        depth: usize,
        left: &<Self::Element as HashableElement>::Hash,
        right: &<Self::Element as HashableElement>::Hash,
    ) -> <Self::Element as HashableElement>::Hash;

    /// Read an element back from a byte stream written by
    /// `HashableElement::write`.
    fn read_element<R: io::Read>(&self, reader: &mut R) -> io::Result<Self::Element>;

    /// Read a hash value from a byte stream written by `write_hash`.
    fn read_hash<R: io::Read>(
        &self,
        reader: &mut R,
    ) -> io::Result<<Self::Element as HashableElement>::Hash>;

    /// Write a hash value to a byte stream.
    fn write_hash<W: io::Write>(
        &self,
        hash: &<Self::Element as HashableElement>::Hash,
        writer: &mut W,
    ) -> io::Result<()>;
}
