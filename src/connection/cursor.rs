use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::{Error, Result};

/// Encode a boundary descriptor as an opaque cursor: URL-safe unpadded
/// base64 over a compact JSON object. Field order is preserved, so
/// re-encoding a decoded cursor yields the identical string.
pub fn encode(fields: &serde_json::Map<String, serde_json::Value>) -> String {
    let json = serde_json::Value::Object(fields.clone()).to_string();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode an opaque cursor back into its boundary descriptor.
///
/// Every failure mode (bad base64, bad JSON, non-object payload) collapses
/// into the same `ArgumentError` so tampered input never surfaces as a
/// crash or a format hint.
pub fn decode(cursor: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.trim())
        .map_err(|_| Error::invalid_cursor())?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|_| Error::invalid_cursor())?;
    match value {
        serde_json::Value::Object(fields) => Ok(fields),
        _ => Err(Error::invalid_cursor()),
    }
}
