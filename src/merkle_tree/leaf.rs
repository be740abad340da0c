//! The leaf record stored for each element added to the tree: the element
//! itself, its hash (cached so `contains`/`get_leaves` never re-hash), and
//! the index of its current parent node (0 if the leaf is still the root,
//! i.e. it's the only leaf in the tree).

use crate::encoding::{read_u32_le, write_u32_le, Encoding};
use crate::error::EncodingError;
use crate::hasher::{HashableElement, MerkleHasher};
use std::io::Cursor;
use std::sync::Arc;

pub struct LeafRecord<H: MerkleHasher> {
    pub element: H::Element,
    pub merkle_hash: <H::Element as HashableElement>::Hash,
    pub parent_index: u32,
}

impl<H: MerkleHasher> Clone for LeafRecord<H> {
    fn clone(&self) -> Self {
        LeafRecord {
            element: self.element.clone(),
            merkle_hash: self.merkle_hash.clone(),
            parent_index: self.parent_index,
        }
    }
}

impl<H: MerkleHasher> std::fmt::Debug for LeafRecord<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafRecord")
            .field("element", &self.element)
            .field("merkle_hash", &self.merkle_hash)
            .field("parent_index", &self.parent_index)
            .finish()
    }
}

impl<H: MerkleHasher> PartialEq for LeafRecord<H> {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
            && self.merkle_hash == other.merkle_hash
            && self.parent_index == other.parent_index
    }
}

/// On-disk layout: `element bytes || merkle_hash || parent_index (u32 LE)`.
/// The element and hash are read back through the hasher, which knows how
/// wide they are; the engine itself never hardcodes a width.
pub struct LeafEncoding<H: MerkleHasher> {
    pub(crate) hasher: Arc<H>,
}

impl<H: MerkleHasher> LeafEncoding<H> {
    pub fn new(hasher: Arc<H>) -> Self {
        LeafEncoding { hasher }
    }
}

impl<H: MerkleHasher> Encoding for LeafEncoding<H> {
    type Item = LeafRecord<H>;

    fn serialize(&self, value: &LeafRecord<H>) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        value
            .element
            .write(&mut out)
            .map_err(|_| EncodingError::InvalidEncoding)?;
        self.hasher
            .write_hash(&value.merkle_hash, &mut out)
            .map_err(|_| EncodingError::InvalidEncoding)?;
        write_u32_le(&mut out, value.parent_index)?;
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<LeafRecord<H>, EncodingError> {
        let mut cursor = Cursor::new(bytes);
        let element = self
            .hasher
            .read_element(&mut cursor)
            .map_err(|_| EncodingError::InvalidEncoding)?;
        let merkle_hash = self
            .hasher
            .read_hash(&mut cursor)
            .map_err(|_| EncodingError::InvalidEncoding)?;
        let parent_index = read_u32_le(&mut cursor)?;
        Ok(LeafRecord {
            element,
            merkle_hash,
            parent_index,
        })
    }
}
