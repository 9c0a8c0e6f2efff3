//! Batch payload codec.
//!
//! A persisted batch payload is the canonical JSON serialization of an
//! ordered sequence of [`TaskGraph`]s, gzip-compressed. This is the
//! only durable format the system defines, so both directions live
//! here and the encoding is all-or-nothing: a batch either serializes
//! completely or produces no bytes at all.

use crate::{Error, Result, TaskGraph};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};

/// Serializes and compresses an ordered sequence of task graphs.
///
/// The empty sequence is valid and produces a decompressible payload
/// decoding back to zero graphs.
///
/// # Errors
///
/// Returns [`Error::Codec`] when serialization or compression fails.
/// No partial payload is ever returned.
pub fn compress_batch(graphs: &[TaskGraph]) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(graphs).map_err(|e| Error::Codec {
        context: format!("serializing batch: {e}"),
    })?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(|e| Error::Codec {
        context: format!("compressing batch: {e}"),
    })?;
    encoder.finish().map_err(|e| Error::Codec {
        context: format!("finishing gzip stream: {e}"),
    })
}

/// Decompresses and decodes a stored batch payload.
///
/// # Errors
///
/// Returns [`Error::Codec`] when the payload is not a gzip stream or
/// its content is not a valid graph sequence.
pub fn decompress_batch(payload: &[u8]) -> Result<Vec<TaskGraph>> {
    let mut json = Vec::new();
    GzDecoder::new(payload)
        .read_to_end(&mut json)
        .map_err(|e| Error::Codec {
            context: format!("decompressing batch: {e}"),
        })?;

    serde_json::from_slice(&json).map_err(|e| Error::Codec {
        context: format!("decoding batch: {e}"),
    })
}
