//! Record encoding
//!
//! Every structured record in a package (project configuration, scenes,
//! assets, the identifier sequence) is RON text, optionally brotli
//! compressed.
//! - Reading: auto-detects plain vs compressed by looking at the first
//!   significant byte
//! - Writing: compression is chosen by the caller (see `PackageSettings`)

use std::io::Cursor;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// File extension used for record files
pub const RECORD_EXTENSION: &str = "ron";

/// Error type for record encoding and decoding
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("brotli {0} failed: {1}")]
    Compression(&'static str, #[source] std::io::Error),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Pretty printer settings shared by every record
fn pretty_config() -> ron::ser::PrettyConfig {
    ron::ser::PrettyConfig::new()
        .depth_limit(8)
        .indentor("  ".to_string())
}

/// Serialize a record to RON, brotli compressing it when `compress` is set
pub fn encode_record<T: Serialize + ?Sized>(value: &T, compress: bool) -> Result<Vec<u8>, CodecError> {
    let ron_string = ron::ser::to_string_pretty(value, pretty_config())?;
    if !compress {
        return Ok(ron_string.into_bytes());
    }

    // quality 6, window 22 - good balance of speed/ratio
    let mut compressed = Vec::new();
    brotli::BrotliCompress(
        &mut Cursor::new(ron_string.as_bytes()),
        &mut compressed,
        &brotli::enc::BrotliEncoderParams {
            quality: 6,
            lgwin: 22,
            ..Default::default()
        },
    )
    .map_err(|e| CodecError::Compression("compression", e))?;
    Ok(compressed)
}

/// Deserialize a record, accepting both plain and compressed RON
pub fn decode_record<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    let contents = if is_plain_ron(data) {
        String::from_utf8(data.to_vec())?
    } else {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(data), &mut decompressed)
            .map_err(|e| CodecError::Compression("decompression", e))?;
        String::from_utf8(decompressed)?
    };
    Ok(ron::from_str(&contents)?)
}

/// RON text is UTF-8 and starts with a value opener, a name or whitespace
fn is_plain_ron(data: &[u8]) -> bool {
    let starts_like_ron = data
        .first()
        .map(|&b| {
            matches!(b, b'(' | b'[' | b'{' | b'"' | b'/' | b' ' | b'\n' | b'\r' | b'\t')
                || b.is_ascii_alphanumeric()
        })
        .unwrap_or(true);
    starts_like_ron && std::str::from_utf8(data).is_ok()
}
