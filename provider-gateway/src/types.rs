//! Gateway API response types

use serde::{Deserialize, Serialize};

/// `GET api/v0.3/system/chainstate`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStateResponse {
    /// Price per chunk per block
    pub current_price: u64,
}

/// `GET api/v0.3/users/current/batches/{id}`
///
/// Only the usability flag is read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfoResponse {
    #[serde(default)]
    pub usable: bool,
}

/// `POST bzz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub reference: String,
}

/// Identifier endpoints answer with plain text, sometimes JSON-quoted
pub(crate) fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
}
