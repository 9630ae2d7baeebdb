//! Opaque 12-byte document identifiers as issued by document stores.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

pub const OBJECT_ID_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("object id must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex character {0:?} in object id")]
    InvalidHex(char),
}

/// A 12-byte identifier. Its canonical text form is 24 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ObjectIdError::InvalidHex(c));
        }
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(ObjectIdError::InvalidLength {
                expected: OBJECT_ID_LEN * 2,
                actual: s.len(),
            });
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, pair) in s.as_bytes().chunks(2).enumerate() {
            bytes[i] = (hex_nibble(pair[0]) << 4) | hex_nibble(pair[1]);
        }
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(OBJECT_ID_LEN * 2);
        for b in self.0 {
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
        out
    }

    /// Name-based (version 3) UUID computed over the raw identifier bytes:
    /// MD5 digest with the version and RFC 4122 variant bits set.
    pub fn name_uuid(&self) -> Uuid {
        let digest = md5::compute(self.0);
        uuid::Builder::from_md5_bytes(digest.0).into_uuid()
    }
}

fn hex_nibble(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn test_hex_round_trip_is_lowercase() {
        let oid = ObjectId::parse_str(&HEX.to_uppercase()).unwrap();
        assert_eq!(oid.to_hex(), HEX);
        assert_eq!(oid.to_string(), HEX);
        assert_eq!(oid.bytes()[0], 0x50);
        assert_eq!(oid.bytes()[11], 0x11);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            ObjectId::parse_str("abc"),
            Err(ObjectIdError::InvalidLength {
                expected: 24,
                actual: 3
            })
        );
        assert_eq!(
            ObjectId::parse_str("zz7f1f77bcf86cd799439011"),
            Err(ObjectIdError::InvalidHex('z'))
        );
    }

    #[test]
    fn test_name_uuid_is_md5_v3() {
        let oid = ObjectId::parse_str(HEX).unwrap();
        let uuid = oid.name_uuid();

        assert_eq!(uuid.get_version_num(), 3);
        assert_eq!(uuid.get_variant(), uuid::Variant::RFC4122);

        let mut expected = md5::compute(oid.bytes()).0;
        expected[6] = (expected[6] & 0x0f) | 0x30;
        expected[8] = (expected[8] & 0x3f) | 0x80;
        assert_eq!(uuid.as_bytes(), &expected);

        // stable across calls and instances
        assert_eq!(uuid, ObjectId::parse_str(HEX).unwrap().name_uuid());
    }

    #[test]
    fn test_distinct_ids_map_to_distinct_uuids() {
        let a = ObjectId::from_bytes([1; 12]);
        let b = ObjectId::from_bytes([2; 12]);
        assert_ne!(a.name_uuid(), b.name_uuid());
    }
}
