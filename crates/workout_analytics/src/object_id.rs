//! Store-assigned document identifiers.
//!
//! Twelve bytes: a 4-byte big-endian Unix timestamp (seconds), a 5-byte
//! per-process random value and a 3-byte counter. Rendered as 24 lowercase
//! hex characters, so ids sort by creation second.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use rand::{RngExt, rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const COUNTER_MASK: u32 = 0x00ff_ffff;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object id: {0:?}")]
pub struct InvalidObjectId(pub String);

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

fn process_value() -> [u8; 5] {
    static VALUE: OnceLock<[u8; 5]> = OnceLock::new();
    *VALUE.get_or_init(|| {
        let v: u64 = rng().random_range(0..(1u64 << 40));
        let b = v.to_be_bytes();
        [b[3], b[4], b[5], b[6], b[7]]
    })
}

fn next_count() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rng().random_range(0..COUNTER_MASK)))
        .fetch_add(1, Ordering::Relaxed)
        & COUNTER_MASK
}

impl ObjectId {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Generate an id stamped with `time` (truncated to whole seconds).
    pub fn at(time: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&(time.timestamp() as u32).to_be_bytes());
        bytes[4..9].copy_from_slice(&process_value());
        bytes[9..12].copy_from_slice(&next_count().to_be_bytes()[1..4]);
        Self(bytes)
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Creation time encoded in the id.
    pub fn generation_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.timestamp()), 0).unwrap_or_default()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_valid(s: &str) -> bool {
        s.parse::<ObjectId>().is_ok()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 {
            return Err(InvalidObjectId(s.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidObjectId(s.to_string()))?;
        Ok(Self(bytes))
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

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
