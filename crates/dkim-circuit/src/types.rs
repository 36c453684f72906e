use email_parser::types::{deserialize_hex_string, serialize_hex_string};
use serde::{Deserialize, Serialize};

use crate::{error::CircuitError, CircuitResult};

/// Bytes left-padded with zeros to a fixed capacity. `padding` is one less than
/// the number of leading zero bytes, so a full slice has padding `-1` and the
/// real bytes are `bytes[padding + 1..]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddedBytes {
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub bytes: Vec<u8>,
    pub padding: i64,
}

impl PaddedBytes {
    pub fn new(data: &[u8], capacity: usize, region: &'static str) -> CircuitResult<Self> {
        if data.len() > capacity {
            return Err(CircuitError::CapacityOverflow {
                region,
                len: data.len(),
                capacity,
            });
        }

        let zeros = capacity - data.len();
        let mut bytes = vec![0u8; zeros];
        bytes.extend_from_slice(data);

        Ok(Self {
            bytes,
            padding: zeros as i64 - 1,
        })
    }

    /// a slice holding nothing
    pub fn empty(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity],
            padding: capacity as i64 - 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// offset of the first real byte
    pub fn start(&self) -> usize {
        (self.padding + 1).clamp(0, self.capacity() as i64) as usize
    }

    pub fn real_bytes(&self) -> &[u8] {
        &self.bytes[self.start()..]
    }

    /// `self ∥ other` in a slice of the summed capacity
    pub fn concat(&self, other: &PaddedBytes) -> PaddedBytes {
        let mut bytes = vec![0u8; self.start() + other.start()];
        bytes.extend_from_slice(self.real_bytes());
        bytes.extend_from_slice(other.real_bytes());

        PaddedBytes {
            bytes,
            padding: self.padding + other.padding + 1,
        }
    }
}
