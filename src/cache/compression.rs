//! Compression Module
//!
//! Size estimation and optional zlib compression of cached values.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::cache::Payload;
use crate::error::{CacheError, Result};

/// Stored form of a value plus its accounted size.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub payload: Payload,
    pub size: usize,
}

// == Estimate Size ==
/// Byte estimate of a value: the length of its JSON encoding.
pub fn estimate_size(value: &Value) -> Result<usize> {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len())
        .map_err(|e| CacheError::Serialization(e.to_string()))
}

// == Encode ==
/// Prepares a value for storage.
///
/// Compresses when enabled and the encoded value exceeds `threshold`. Any
/// failure falls back to the plain value; the failure is returned alongside
/// so the caller can report it.
pub fn encode(value: Value, enabled: bool, threshold: usize) -> (Encoded, Option<CacheError>) {
    let bytes = match serde_json::to_vec(&value) {
        Ok(bytes) => bytes,
        Err(e) => {
            let fallback = Encoded {
                payload: Payload::Plain(value),
                size: std::mem::size_of::<Value>(),
            };
            return (fallback, Some(CacheError::Serialization(e.to_string())));
        }
    };

    if !enabled || bytes.len() <= threshold {
        let size = bytes.len();
        return (
            Encoded {
                payload: Payload::Plain(value),
                size,
            },
            None,
        );
    }

    match compress(&bytes) {
        // Only keep the compressed form when it actually saves space
        Ok(compressed) if compressed.len() < bytes.len() => {
            let size = compressed.len();
            (
                Encoded {
                    payload: Payload::Compressed(compressed),
                    size,
                },
                None,
            )
        }
        Ok(_) => (
            Encoded {
                payload: Payload::Plain(value),
                size: bytes.len(),
            },
            None,
        ),
        Err(e) => (
            Encoded {
                payload: Payload::Plain(value),
                size: bytes.len(),
            },
            Some(e),
        ),
    }
}

// == Decode ==
/// Returns the value held by a payload, decompressing if needed.
pub fn decode(payload: &Payload) -> Result<Value> {
    match payload {
        Payload::Plain(value) => Ok(value.clone()),
        Payload::Compressed(bytes) => decompress(bytes),
    }
}

pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| CacheError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CacheError::Compression(e.to_string()))
}

pub fn decompress(bytes: &[u8]) -> Result<Value> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| CacheError::Compression(e.to_string()))?;
    serde_json::from_slice(&raw).map_err(|e| CacheError::Serialization(e.to_string()))
}
