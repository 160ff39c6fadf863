//! Record Codec Module
//!
//! Line format of the backing file:
//!
//! ```text
//! namespace&&key&&v1:{"value":...,"written_at":1700000000000,"ttl":-1}
//! ```
//!
//! The namespace and key are written verbatim; there is no escaping rule for
//! the delimiter, so fields that would make the split ambiguous are refused at
//! encode time. The value payload is compact JSON with every `&` written as
//! `\u0026`, which keeps the delimiter out of it entirely.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheEntry;

/// Separator between the three fields of a record.
pub const DELIMITER: &str = "&&";

/// Version tag prefixed to every encoded value.
pub const FORMAT_VERSION: &str = "v1";

// == Codec Error ==
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("expected 3 fields, found {found}")]
    FieldCount { found: usize },

    #[error("{field} {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("value has no format version prefix")]
    MissingVersion,

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid value payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A decoded line: namespace, key and entry.
pub type Record<V> = (String, String, CacheEntry<V>);

// == Encode ==
/// Encodes one entry as a record line, without the trailing newline.
pub fn encode_record<V: Serialize>(
    namespace: &str,
    key: &str,
    entry: &CacheEntry<V>,
) -> Result<String, CodecError> {
    validate_field("namespace", namespace)?;
    validate_field("key", key)?;

    let payload = serde_json::to_string(entry)?.replace('&', "\\u0026");
    Ok(format!(
        "{namespace}{DELIMITER}{key}{DELIMITER}{FORMAT_VERSION}:{payload}"
    ))
}

// == Decode ==
/// Decodes one record line. The line must not include its newline.
pub fn decode_record<V: DeserializeOwned>(line: &str) -> Result<Record<V>, CodecError> {
    let fields: Vec<&str> = line.split(DELIMITER).collect();
    let &[namespace, key, encoded] = fields.as_slice() else {
        return Err(CodecError::FieldCount {
            found: fields.len(),
        });
    };

    validate_field("namespace", namespace)?;
    validate_field("key", key)?;

    let (version, payload) = encoded
        .split_once(':')
        .ok_or(CodecError::MissingVersion)?;
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version.to_string()));
    }

    let entry = serde_json::from_str(payload)?;
    Ok((namespace.to_string(), key.to_string(), entry))
}

fn validate_field(field: &'static str, text: &str) -> Result<(), CodecError> {
    let reason = if text.contains(DELIMITER) {
        "contains the record delimiter"
    } else if text.contains(['\n', '\r']) {
        "contains a line break"
    } else if text.starts_with('&') || text.ends_with('&') {
        "starts or ends with '&'"
    } else {
        return Ok(());
    };
    Err(CodecError::InvalidField { field, reason })
}
