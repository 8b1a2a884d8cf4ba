//! # Hash Value Type
//!
//! A 48-byte SHA-384 digest, the only hash width used anywhere in the block
//! stream. Persisted hash history is stored as flat buffers of consecutive
//! 48-byte records, oldest first; the codecs for that layout live here too.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::errors::SharedTypesError;

/// Width of a SHA-384 digest in bytes.
pub const HASH_SIZE: usize = 48;

/// The all-zero hash, used as the pre-genesis running hash value.
pub const ZERO_HASH: Hash = Hash([0u8; HASH_SIZE]);

/// An opaque 48-byte SHA-384 hash value.
///
/// Equality is byte-wise; composition is always concatenate-then-hash and
/// lives in `shared-crypto`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub [u8; HASH_SIZE]);

impl Hash {
    /// Creates a hash from a slice, failing if the length is not 48 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SharedTypesError> {
        if bytes.len() != HASH_SIZE {
            return Err(SharedTypesError::InvalidHashLength { got: bytes.len() });
        }
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(bytes);
        Ok(Self(hash))
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Lowercase hex rendering, used for logging.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for Hash {
    fn default() -> Self {
        ZERO_HASH
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}..)", &self.to_hex()[..12])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Serde support is hand-written because serde only derives fixed-size array
// impls up to 32 elements.
impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct HashVisitor;

impl<'de> Visitor<'de> for HashVisitor {
    type Value = Hash;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{HASH_SIZE} bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Hash, E> {
        Hash::from_slice(v).map_err(|_| E::invalid_length(v.len(), &self))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Hash, E> {
        self.visit_bytes(&v)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Hash, A::Error> {
        let mut hash = [0u8; HASH_SIZE];
        for (i, byte) in hash.iter_mut().enumerate() {
            *byte = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(Hash(hash))
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(HashVisitor)
    }
}

/// Encodes hashes as a flat buffer of consecutive 48-byte records,
/// oldest first. This is the persisted wire layout for trailing hash
/// history.
pub fn encode_hashes(hashes: &[Hash]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(hashes.len() * HASH_SIZE);
    for hash in hashes {
        buf.extend_from_slice(&hash.0);
    }
    buf
}

/// Decodes a flat buffer of 48-byte records back into hashes.
pub fn decode_hashes(buf: &[u8]) -> Result<Vec<Hash>, SharedTypesError> {
    if buf.len() % HASH_SIZE != 0 {
        return Err(SharedTypesError::MisalignedHashBuffer { len: buf.len() });
    }
    buf.chunks_exact(HASH_SIZE).map(Hash::from_slice).collect()
}
