//! Index API request and response types

use serde::{Deserialize, Serialize};

/// `POST api/v0.3/videos`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub manifest_hash: String,
}

/// `GET api/v0.3/videos/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntryResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub last_valid_manifest: Option<ManifestSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSummary {
    #[serde(default)]
    pub hash: Option<String>,
}
