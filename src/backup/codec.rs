//! Transport encoding of serialized backups
//!
//! Compressed payloads are gzip streams wrapped in a base64 data URL.
//! Anything without the data-URL prefix is taken to be plain JSON.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::format::CompressionType;
use crate::error::{ImportFailure, LedgerError, LedgerResult};

/// Prefix of a gzip-compressed payload
pub const GZIP_DATA_URL_PREFIX: &str = "data:application/gzip;base64,";

/// Encode serialized JSON for export
pub fn encode(json: &str, compression: CompressionType) -> LedgerResult<String> {
    match compression {
        CompressionType::None => Ok(json.to_string()),
        CompressionType::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(json.as_bytes())
                .map_err(|e| LedgerError::Export(format!("Failed to compress backup: {}", e)))?;
            let compressed = encoder
                .finish()
                .map_err(|e| LedgerError::Export(format!("Failed to compress backup: {}", e)))?;
            Ok(format!("{}{}", GZIP_DATA_URL_PREFIX, STANDARD.encode(compressed)))
        }
    }
}

/// Invert [`encode`]
pub fn decode(payload: &str) -> LedgerResult<String> {
    let payload = payload.trim();
    let Some(encoded) = payload.strip_prefix(GZIP_DATA_URL_PREFIX) else {
        return Ok(payload.to_string());
    };

    let compressed = STANDARD
        .decode(encoded)
        .map_err(|e| ImportFailure::Malformed(format!("invalid base64: {}", e)))?;

    let mut decoder = GzDecoder::new(&compressed[..]);
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .map_err(|e| ImportFailure::Malformed(format!("invalid gzip stream: {}", e)))?;
    Ok(json)
}

/// Whether a payload carries the compressed encoding
pub fn is_compressed(payload: &str) -> bool {
    payload.trim_start().starts_with(GZIP_DATA_URL_PREFIX)
}
