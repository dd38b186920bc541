//! Video manifest document
//!
//! The JSON metadata uploaded after the media; its content address is what
//! the index entry points at.

use bridge_traits::gateway::{BatchId, ContentAddress};
use bridge_traits::media::ThumbnailInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{PublishError, Result};
use crate::models::Asset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestThumbnail {
    /// `width / height`
    pub aspect_ratio: f32,
    pub blurhash: String,
    /// Address per width, keyed `{width}w`
    pub sources: BTreeMap<String, ContentAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSource {
    pub bitrate: u64,
    pub quality: String,
    pub reference: ContentAddress,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoManifest {
    pub batch_id: BatchId,
    pub description: String,
    pub duration: u64,
    /// Left empty; the storage address identifies the manifest
    pub hash: String,
    pub original_quality: String,
    pub sources: Vec<ManifestSource>,
    pub thumbnail: ManifestThumbnail,
    pub title: String,
}

impl VideoManifest {
    /// Assemble the manifest of an asset whose media is uploaded
    ///
    /// # Errors
    ///
    /// Validation fails for a blank title or description, a variant without
    /// an address, or a thumbnail with zero height.
    pub fn build(
        asset: &Asset,
        batch_id: &BatchId,
        thumbnail_address: &ContentAddress,
        thumbnail: &ThumbnailInfo,
    ) -> Result<Self> {
        if asset.title().trim().is_empty() {
            return Err(PublishError::Validation("Title not defined".to_string()));
        }
        if asset.description().trim().is_empty() {
            return Err(PublishError::Validation("Description not defined".to_string()));
        }
        if thumbnail.height == 0 {
            return Err(PublishError::Validation(
                "Thumbnail height must be greater than 0".to_string(),
            ));
        }

        let sources = asset
            .variants()
            .iter()
            .map(|variant| {
                let reference = variant.address.clone().ok_or_else(|| {
                    PublishError::Validation(format!("Variant {} was not uploaded", variant.label))
                })?;
                Ok(ManifestSource {
                    bitrate: variant.bitrate,
                    quality: variant.label.clone(),
                    reference,
                    size: variant.size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut thumbnail_sources = BTreeMap::new();
        thumbnail_sources.insert(format!("{}w", thumbnail.width), thumbnail_address.clone());

        Ok(Self {
            batch_id: batch_id.clone(),
            description: asset.description().to_string(),
            duration: asset.duration(),
            hash: String::new(),
            original_quality: asset.original_quality().to_string(),
            sources,
            thumbnail: ManifestThumbnail {
                aspect_ratio: thumbnail.width as f32 / thumbnail.height as f32,
                blurhash: thumbnail.hash.clone(),
                sources: thumbnail_sources,
            },
            title: asset.title().to_string(),
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResolutionVariant;

    fn uploaded_asset(title: &str, description: &str) -> Asset {
        let mut variant = ResolutionVariant::new("720p", 3_333_334, "/tmp/720.mp4", 50_000_000);
        variant.address = Some(ContentAddress::new("video720"));
        Asset::new(title, description, 120, vec![variant], "/tmp/abc.jpg").unwrap()
    }

    fn thumbnail() -> ThumbnailInfo {
        ThumbnailInfo {
            hash: "LEHV6nWB2yk8".to_string(),
            width: 1280,
            height: 720,
        }
    }

    #[test]
    fn test_manifest_json_shape() {
        let manifest = VideoManifest::build(
            &uploaded_asset("Talk", "About things"),
            &BatchId::new("batch1"),
            &ContentAddress::new("thumb1"),
            &thumbnail(),
        )
        .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(json["batchId"], "batch1");
        assert_eq!(json["duration"], 120);
        assert_eq!(json["hash"], "");
        assert_eq!(json["originalQuality"], "720p");
        assert_eq!(json["thumbnail"]["blurhash"], "LEHV6nWB2yk8");
        assert_eq!(json["thumbnail"]["sources"]["1280w"], "thumb1");
        assert_eq!(json["sources"][0]["quality"], "720p");
        assert_eq!(json["sources"][0]["reference"], "video720");
        assert_eq!(json["sources"][0]["size"], 50_000_000);

        let ratio = json["thumbnail"]["aspectRatio"].as_f64().unwrap();
        assert!((ratio - 1280.0 / 720.0).abs() < 1e-4);
    }

    #[test]
    fn test_blank_title_or_description_is_rejected() {
        for (title, description) in [("", "About things"), ("Talk", "  ")] {
            let err = VideoManifest::build(
                &uploaded_asset(title, description),
                &BatchId::new("batch1"),
                &ContentAddress::new("thumb1"),
                &thumbnail(),
            )
            .unwrap_err();
            assert!(matches!(err, PublishError::Validation(_)));
        }
    }

    #[test]
    fn test_variant_without_address_is_rejected() {
        let variant = ResolutionVariant::new("720p", 1, "/tmp/720.mp4", 10);
        let asset = Asset::new("Talk", "About things", 120, vec![variant], "/tmp/abc.jpg").unwrap();

        let err = VideoManifest::build(
            &asset,
            &BatchId::new("batch1"),
            &ContentAddress::new("thumb1"),
            &thumbnail(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("720p"));
    }
}
