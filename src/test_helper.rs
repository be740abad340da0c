//! Fixtures shared by unit tests across the crate: a `String`-hashing
//! scheme whose combined hashes spell out their own derivation (handy for
//! eyeballing test failures) and a trivial depth-counting scheme for tests
//! that only care about tree shape, not hash content.

use crate::hasher::{HashableElement, MerkleHasher};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::Read;
use std::sync::Arc;

impl HashableElement for String {
    type Hash = String;

    fn merkle_hash(&self) -> Self {
        self.clone()
    }

    fn write<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        let bytes = self.as_bytes();
        writer.write_u8(bytes.len() as u8)?;
        writer.write_all(bytes)
    }
}

/// `combine_hash` renders as `<left|right-depth>`, so a failing assertion's
/// expected/actual strings show exactly how each side's hash was built.
#[derive(Debug, PartialEq)]
pub(crate) struct StringHasher {}

impl StringHasher {
    pub fn new() -> Arc<StringHasher> {
        Arc::new(StringHasher {})
    }
}

impl MerkleHasher for StringHasher {
    type Element = String;

    fn combine_hash(&self, depth: usize, left: &String, right: &String) -> String {
        format!("<{}|{}-{}>", left, right, depth)
    }

    fn read_element<R: io::Read>(&self, reader: &mut R) -> io::Result<String> {
        let str_size = reader.read_u8()?;
        let bytes = reader
            .take(str_size as u64)
            .bytes()
            .collect::<Result<Vec<u8>, _>>()?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read_hash<R: io::Read>(&self, reader: &mut R) -> io::Result<String> {
        let hash_length = reader.read_u32::<LittleEndian>()?;
        let mut bytes = vec![0u8; hash_length as usize];
        reader.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_hash<W: io::Write>(&self, hash: &String, writer: &mut W) -> io::Result<()> {
        let bytes = hash.as_bytes();
        writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
        writer.write_all(bytes)
    }
}

/// Fake hashable element that just counts levels, for tests that want deep
/// trees without the string hasher's exploding output length.
impl HashableElement for u64 {
    type Hash = u64;

    fn merkle_hash(&self) -> Self {
        *self
    }

    fn write<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u64::<LittleEndian>(*self)
    }
}

#[derive(Debug)]
pub(crate) struct CountHasher {}

impl CountHasher {
    pub fn new() -> Arc<CountHasher> {
        Arc::new(CountHasher {})
    }
}

impl MerkleHasher for CountHasher {
    type Element = u64;

    fn combine_hash(&self, _depth: usize, left: &u64, _right: &u64) -> u64 {
        left + 1
    }

    fn read_element<R: io::Read>(&self, reader: &mut R) -> io::Result<u64> {
        reader.read_u64::<LittleEndian>()
    }

    fn read_hash<R: io::Read>(&self, _reader: &mut R) -> io::Result<u64> {
        panic!("not needed for the unit test suite")
    }

    fn write_hash<W: io::Write>(&self, _hash: &u64, _writer: &mut W) -> io::Result<()> {
        panic!("not needed for the unit test suite")
    }
}
