//! Pure key/value encodings used by the storage layer.
//!
//! Every encoding in this module is a stateless `serialize`/`deserialize`
//! pair. Callers pick the encoding whose byte order matches the logical
//! order they want out of an ordered key/value store: the `*BE` encodings
//! byte-sort the same way they numerically compare, the `*LE` ones don't
//! and are only suitable for values or keys nobody iterates in order.

use crate::error::EncodingError;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// A reversible mapping between a typed value and its on-disk byte
/// representation.
pub trait Encoding {
    type Item;

    fn serialize(&self, value: &Self::Item) -> Result<Vec<u8>, EncodingError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Item, EncodingError>;
}

/// Big-endian `u32`. Byte order matches numeric order, so this is the
/// encoding to reach for whenever a store key needs to iterate in
/// ascending numeric order (leaf index, node index).
#[derive(Debug, Clone, Copy, Default)]
pub struct U32BEEncoding;

impl Encoding for U32BEEncoding {
    type Item = u32;

    fn serialize(&self, value: &u32) -> Result<Vec<u8>, EncodingError> {
        let mut buf = vec![0u8; 4];
        BigEndian::write_u32(&mut buf, *value);
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<u32, EncodingError> {
        if bytes.len() != 4 {
            return Err(EncodingError::InvalidEncoding);
        }
        Ok(BigEndian::read_u32(bytes))
    }
}

/// Little-endian `u32`, for values whose iteration order is irrelevant.
#[derive(Debug, Clone, Copy, Default)]
pub struct U32LEEncoding;

impl Encoding for U32LEEncoding {
    type Item = u32;

    fn serialize(&self, value: &u32) -> Result<Vec<u8>, EncodingError> {
        let mut buf = vec![0u8; 4];
        LittleEndian::write_u32(&mut buf, *value);
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<u32, EncodingError> {
        if bytes.len() != 4 {
            return Err(EncodingError::InvalidEncoding);
        }
        Ok(LittleEndian::read_u32(bytes))
    }
}

/// Big-endian `u64`, for counters or bigint-shaped values that may exceed
/// 32 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct U64BEEncoding;

impl Encoding for U64BEEncoding {
    type Item = u64;

    fn serialize(&self, value: &u64) -> Result<Vec<u8>, EncodingError> {
        let mut buf = vec![0u8; 8];
        BigEndian::write_u64(&mut buf, *value);
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<u64, EncodingError> {
        if bytes.len() != 8 {
            return Err(EncodingError::InvalidEncoding);
        }
        Ok(BigEndian::read_u64(bytes))
    }
}

/// UTF-8 string, serialized as its raw bytes (no length prefix; the store
/// prefix plus key boundaries already delimit it).
#[derive(Debug, Clone, Copy, Default)]
pub struct StringEncoding;

impl Encoding for StringEncoding {
    type Item = String;

    fn serialize(&self, value: &String) -> Result<Vec<u8>, EncodingError> {
        Ok(value.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Identity encoding for raw byte buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferEncoding;

impl Encoding for BufferEncoding {
    type Item = Vec<u8>;

    fn serialize(&self, value: &Vec<u8>) -> Result<Vec<u8>, EncodingError> {
        Ok(value.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>, EncodingError> {
        Ok(bytes.to_vec())
    }
}

/// `Option<Vec<u8>>` with a one-byte presence flag prefix (`0` = absent,
/// `1` = present followed by the raw bytes).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullableBufferEncoding;

impl Encoding for NullableBufferEncoding {
    type Item = Option<Vec<u8>>;

    fn serialize(&self, value: &Option<Vec<u8>>) -> Result<Vec<u8>, EncodingError> {
        match value {
            None => Ok(vec![0u8]),
            Some(buf) => {
                let mut out = Vec::with_capacity(1 + buf.len());
                out.push(1u8);
                out.extend_from_slice(buf);
                Ok(out)
            }
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Option<Vec<u8>>, EncodingError> {
        match bytes.split_first() {
            None => Err(EncodingError::InvalidEncoding),
            Some((0, _)) => Ok(None),
            Some((_, rest)) => Ok(Some(rest.to_vec())),
        }
    }
}

/// `Option<String>` with the same presence-flag convention as
/// [`NullableBufferEncoding`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullableStringEncoding;

impl Encoding for NullableStringEncoding {
    type Item = Option<String>;

    fn serialize(&self, value: &Option<String>) -> Result<Vec<u8>, EncodingError> {
        match value {
            None => Ok(vec![0u8]),
            Some(s) => {
                let mut out = Vec::with_capacity(1 + s.len());
                out.push(1u8);
                out.extend_from_slice(s.as_bytes());
                Ok(out)
            }
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Option<String>, EncodingError> {
        match bytes.split_first() {
            None => Err(EncodingError::InvalidEncoding),
            Some((0, _)) => Ok(None),
            Some((_, rest)) => Ok(Some(String::from_utf8(rest.to_vec())?)),
        }
    }
}

/// Composite key encoding: `serialize(p) || serialize(k)`, where
/// `serialize(p)` is required to be exactly `PREFIX_SIZE` bytes so that a
/// fixed-width prefix can be range-scanned independently of the suffix.
pub struct PrefixEncoding<PE, KE>
where
    PE: Encoding,
    KE: Encoding,
{
    prefix_encoding: PE,
    key_encoding: KE,
    prefix_size: usize,
}

impl<PE, KE> PrefixEncoding<PE, KE>
where
    PE: Encoding,
    KE: Encoding,
{
    pub fn new(prefix_encoding: PE, key_encoding: KE, prefix_size: usize) -> Self {
        PrefixEncoding {
            prefix_encoding,
            key_encoding,
            prefix_size,
        }
    }

    /// Serialize just the prefix component and return the `[gte, lt)`
    /// key range that contains every composite key sharing it.
    pub fn key_range(&self, prefix: &PE::Item) -> Result<KeyRange, EncodingError> {
        let gte = self.prefix_encoding.serialize(prefix)?;
        if gte.len() != self.prefix_size {
            return Err(EncodingError::PrefixSizeError {
                expected: self.prefix_size,
                actual: gte.len(),
            });
        }
        Ok(KeyRange::from_prefix(&gte))
    }
}

impl<PE, KE> Encoding for PrefixEncoding<PE, KE>
where
    PE: Encoding,
    KE: Encoding,
{
    type Item = (PE::Item, KE::Item);

    fn serialize(&self, value: &(PE::Item, KE::Item)) -> Result<Vec<u8>, EncodingError> {
        let prefix_bytes = self.prefix_encoding.serialize(&value.0)?;
        if prefix_bytes.len() != self.prefix_size {
            return Err(EncodingError::PrefixSizeError {
                expected: self.prefix_size,
                actual: prefix_bytes.len(),
            });
        }
        let mut out = prefix_bytes;
        out.extend(self.key_encoding.serialize(&value.1)?);
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<(PE::Item, KE::Item), EncodingError> {
        if bytes.len() < self.prefix_size {
            return Err(EncodingError::InvalidEncoding);
        }
        let (prefix_bytes, key_bytes) = bytes.split_at(self.prefix_size);
        let prefix = self.prefix_encoding.deserialize(prefix_bytes)?;
        let key = self.key_encoding.deserialize(key_bytes)?;
        Ok((prefix, key))
    }
}

/// Generalization of [`PrefixEncoding`] to an ordered tuple of fixed-size
/// components. On the wire it is equivalent to nesting `PrefixEncoding`
/// left to right; this type just avoids writing out that nesting by hand.
pub struct PrefixArrayEncoding<E> {
    component_encoding: E,
    component_sizes: Vec<usize>,
}

impl<E> PrefixArrayEncoding<E>
where
    E: Encoding<Item = Vec<u8>>,
{
    pub fn new(component_encoding: E, component_sizes: Vec<usize>) -> Self {
        PrefixArrayEncoding {
            component_encoding,
            component_sizes,
        }
    }

    pub fn serialize_components(&self, values: &[Vec<u8>]) -> Result<Vec<u8>, EncodingError> {
        if values.len() != self.component_sizes.len() {
            return Err(EncodingError::InvalidEncoding);
        }
        let mut out = Vec::new();
        for (value, &expected_size) in values.iter().zip(self.component_sizes.iter()) {
            let bytes = self.component_encoding.serialize(value)?;
            if bytes.len() != expected_size {
                return Err(EncodingError::PrefixSizeError {
                    expected: expected_size,
                    actual: bytes.len(),
                });
            }
            out.extend(bytes);
        }
        Ok(out)
    }

    pub fn deserialize_components(&self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, EncodingError> {
        let mut out = Vec::with_capacity(self.component_sizes.len());
        let mut offset = 0;
        for &size in &self.component_sizes {
            if bytes.len() < offset + size {
                return Err(EncodingError::InvalidEncoding);
            }
            out.push(self.component_encoding.deserialize(&bytes[offset..offset + size])?);
            offset += size;
        }
        Ok(out)
    }
}

/// A half-open byte-key range `[gte, lt)`. `lt == None` means unbounded
/// above (used when the prefix is all `0xFF` and incrementing it would
/// otherwise require growing the key width).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub gte: Vec<u8>,
    pub lt: Option<Vec<u8>>,
}

impl KeyRange {
    /// Build the `[prefix, increment_be(prefix))` range that contains
    /// every key beginning with `prefix`.
    pub fn from_prefix(prefix: &[u8]) -> Self {
        KeyRange {
            gte: prefix.to_vec(),
            lt: increment_be(prefix),
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        if key < self.gte.as_slice() {
            return false;
        }
        match &self.lt {
            Some(lt) => key < lt.as_slice(),
            None => true,
        }
    }
}

/// Add 1 to a byte sequence interpreted as a big-endian integer, carrying
/// through high-order bytes. Returns `None` if the sequence is all `0xFF`
/// (there is no fixed-width successor; callers treat that as "unbounded
/// above").
pub fn increment_be(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut out = bytes.to_vec();
    for byte in out.iter_mut().rev() {
        if *byte == 0xFF {
            *byte = 0x00;
        } else {
            *byte += 1;
            return Some(out);
        }
    }
    None
}

/// Read a `u32` out of a `Cursor`, used by a handful of on-disk record
/// layouts that are easier to express with `byteorder`'s `Read` extension
/// than with the `Encoding` trait directly.
pub(crate) fn read_u32_le(cursor: &mut Cursor<&[u8]>) -> Result<u32, EncodingError> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| EncodingError::InvalidEncoding)
}

pub(crate) fn write_u32_le(buf: &mut Vec<u8>, value: u32) -> Result<(), EncodingError> {
    buf.write_u32::<LittleEndian>(value)
        .map_err(|_| EncodingError::InvalidEncoding)
}

#[cfg(test)]
mod tests;
