// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Binary stream framing for graph persistence
//!
//! Every saved graph is one framed blob: magic number, format version,
//! payload length, payload bytes, and a trailing CRC32 of the payload.
//! Reads verify the frame before any payload decoding happens; a failed
//! load is terminal and leaves no usable graph.

use std::io::{Read, Write};

use log::debug;
use thiserror::Error;

/// Magic number identifying GraphStore frames ("GSTR")
pub(crate) const STORE_MAGIC: u32 = 0x4753_5452;

/// Current frame format version
pub(crate) const STORE_VERSION: u16 = 1;

/// Error type for persistence operations
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Corrupted stream: {0}")]
    Corrupted(String),

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u16),
}

pub(crate) fn encode_err(err: bincode::Error) -> PersistError {
    PersistError::Encode(err.to_string())
}

pub(crate) fn decode_err(err: bincode::Error) -> PersistError {
    PersistError::Decode(err.to_string())
}

/// Write one frame: magic, version, payload length, payload, CRC32
pub(crate) fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), PersistError> {
    writer.write_all(&STORE_MAGIC.to_le_bytes())?;
    writer.write_all(&STORE_VERSION.to_le_bytes())?;
    writer.write_all(&(payload.len() as u64).to_le_bytes())?;
    writer.write_all(payload)?;

    let checksum = crc32fast::hash(payload);
    writer.write_all(&checksum.to_le_bytes())?;
    writer.flush()?;

    debug!("wrote frame: {} payload bytes", payload.len());
    Ok(())
}

/// Read and verify one frame, returning its payload
pub(crate) fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, PersistError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if u32::from_le_bytes(magic) != STORE_MAGIC {
        return Err(PersistError::Corrupted("invalid magic number".to_string()));
    }

    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;
    let version = u16::from_le_bytes(version);
    if version != STORE_VERSION {
        return Err(PersistError::UnsupportedVersion(version));
    }

    let mut len = [0u8; 8];
    reader.read_exact(&mut len)?;
    let len = u64::from_le_bytes(len) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    let mut checksum = [0u8; 4];
    reader.read_exact(&mut checksum)?;
    if u32::from_le_bytes(checksum) != crc32fast::hash(&payload) {
        return Err(PersistError::Corrupted("checksum mismatch".to_string()));
    }

    debug!("read frame: {} payload bytes", len);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_round_trip() {
        let payload = b"graph bytes".to_vec();
        let mut stream = Vec::new();
        write_frame(&mut stream, &payload).unwrap();

        let back = read_frame(&mut stream.as_slice()).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut stream = Vec::new();
        write_frame(&mut stream, b"data").unwrap();
        stream[0] ^= 0xff;

        let err = read_frame(&mut stream.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::Corrupted(_)), "got {:?}", err);
    }

    #[test]
    fn test_flipped_payload_byte_fails_checksum() {
        let mut stream = Vec::new();
        write_frame(&mut stream, b"payload").unwrap();
        // Flip a byte inside the payload region (after the 14-byte header).
        stream[15] ^= 0x01;

        let err = read_frame(&mut stream.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::Corrupted(_)), "got {:?}", err);
    }

    #[test]
    fn test_truncated_stream_propagates_io_error() {
        let mut stream = Vec::new();
        write_frame(&mut stream, b"payload").unwrap();
        stream.truncate(stream.len() - 6);

        let err = read_frame(&mut stream.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)), "got {:?}", err);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut stream = Vec::new();
        write_frame(&mut stream, b"data").unwrap();
        stream[4] = 0xff;
        stream[5] = 0xff;

        let err = read_frame(&mut stream.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::UnsupportedVersion(_)));
    }
}
