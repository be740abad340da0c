//! Internal (non-leaf) node records. A node is tagged `Left` or `Right`
//! depending on which child of its own parent it is; `Left` nodes point up
//! at their parent, `Right` nodes point sideways at their left sibling (the
//! pair's parent is reached by following the left sibling's own
//! `parent_index`). This is the index-linked shape that lets the tree
//! rehash only the right spine on `add`, instead of the whole tree.

use crate::encoding::{read_u32_le, write_u32_le, Encoding};
use crate::error::EncodingError;
use crate::hasher::{HashableElement, MerkleHasher};
use std::io::Cursor;
use std::sync::Arc;

pub enum NodeRecord<H: MerkleHasher> {
    Left {
        hash_of_sibling: <H::Element as HashableElement>::Hash,
        parent_index: u32,
    },
    Right {
        hash_of_sibling: <H::Element as HashableElement>::Hash,
        left_index: u32,
    },
}

impl<H: MerkleHasher> NodeRecord<H> {
    pub fn hash_of_sibling(&self) -> &<H::Element as HashableElement>::Hash {
        match self {
            NodeRecord::Left { hash_of_sibling, .. } => hash_of_sibling,
            NodeRecord::Right { hash_of_sibling, .. } => hash_of_sibling,
        }
    }
}

impl<H: MerkleHasher> Clone for NodeRecord<H> {
    fn clone(&self) -> Self {
        match self {
            NodeRecord::Left {
                hash_of_sibling,
                parent_index,
            } => NodeRecord::Left {
                hash_of_sibling: hash_of_sibling.clone(),
                parent_index: *parent_index,
            },
            NodeRecord::Right {
                hash_of_sibling,
                left_index,
            } => NodeRecord::Right {
                hash_of_sibling: hash_of_sibling.clone(),
                left_index: *left_index,
            },
        }
    }
}

impl<H: MerkleHasher> std::fmt::Debug for NodeRecord<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRecord::Left {
                hash_of_sibling,
                parent_index,
            } => f
                .debug_struct("Left")
                .field("hash_of_sibling", hash_of_sibling)
                .field("parent_index", parent_index)
                .finish(),
            NodeRecord::Right {
                hash_of_sibling,
                left_index,
            } => f
                .debug_struct("Right")
                .field("hash_of_sibling", hash_of_sibling)
                .field("left_index", left_index)
                .finish(),
        }
    }
}

const SIDE_LEFT: u8 = 0;
const SIDE_RIGHT: u8 = 1;

/// On-disk layout: `hash || side tag (1B) || other_index (u32 LE)`. For a
/// hasher whose hash serializer emits the usual 32-byte digest, that's the
/// 37-byte record; the engine itself doesn't hardcode the width.
pub struct NodeEncoding<H: MerkleHasher> {
    pub(crate) hasher: Arc<H>,
}

impl<H: MerkleHasher> NodeEncoding<H> {
    pub fn new(hasher: Arc<H>) -> Self {
        NodeEncoding { hasher }
    }
}

impl<H: MerkleHasher> Encoding for NodeEncoding<H> {
    type Item = NodeRecord<H>;

    fn serialize(&self, value: &NodeRecord<H>) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        self.hasher
            .write_hash(value.hash_of_sibling(), &mut out)
            .map_err(|_| EncodingError::InvalidEncoding)?;
        match value {
            NodeRecord::Left { parent_index, .. } => {
                out.push(SIDE_LEFT);
                write_u32_le(&mut out, *parent_index)?;
            }
            NodeRecord::Right { left_index, .. } => {
                out.push(SIDE_RIGHT);
                write_u32_le(&mut out, *left_index)?;
            }
        }
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<NodeRecord<H>, EncodingError> {
        let mut cursor = Cursor::new(bytes);
        let hash_of_sibling = self
            .hasher
            .read_hash(&mut cursor)
            .map_err(|_| EncodingError::InvalidEncoding)?;
        let remaining = &bytes[cursor.position() as usize..];
        if remaining.len() != 5 {
            return Err(EncodingError::InvalidEncoding);
        }
        let side = remaining[0];
        let mut rest = Cursor::new(&remaining[1..]);
        let other_index = read_u32_le(&mut rest)?;
        match side {
            SIDE_LEFT => Ok(NodeRecord::Left {
                hash_of_sibling,
                parent_index: other_index,
            }),
            SIDE_RIGHT => Ok(NodeRecord::Right {
                hash_of_sibling,
                left_index: other_index,
            }),
            _ => Err(EncodingError::InvalidEncoding),
        }
    }
}
