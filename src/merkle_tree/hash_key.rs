//! Lets a hash value double as a store key, so `leaves_index` can map
//! `hash -> leaf index` without a second, hand-rolled byte encoding.

use crate::encoding::Encoding;
use crate::error::EncodingError;
use crate::hasher::{HashableElement, MerkleHasher};
use std::io::Cursor;
use std::sync::Arc;

pub(crate) struct HashKeyEncoding<H: MerkleHasher> {
    pub(crate) hasher: Arc<H>,
}

impl<H: MerkleHasher> HashKeyEncoding<H> {
    pub(crate) fn new(hasher: Arc<H>) -> Self {
        HashKeyEncoding { hasher }
    }
}

impl<H: MerkleHasher> Encoding for HashKeyEncoding<H> {
    type Item = <H::Element as HashableElement>::Hash;

    fn serialize(&self, value: &Self::Item) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        self.hasher
            .write_hash(value, &mut out)
            .map_err(|_| EncodingError::InvalidEncoding)?;
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Item, EncodingError> {
        let mut cursor = Cursor::new(bytes);
        self.hasher
            .read_hash(&mut cursor)
            .map_err(|_| EncodingError::InvalidEncoding)
    }
}
