//! Media generation types (images and video)

use serde::{Deserialize, Serialize};

use crate::types::{ProviderMetadata, Usage, Warning};

/// One generated media asset, either hosted or inlined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaAsset {
    /// Asset hosted by the provider, valid for a limited time
    Url {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: String,
    },
    /// Asset inlined as base64 data
    Base64 {
        data: String,
        #[serde(rename = "mediaType")]
        media_type: String,
    },
}

/// Unified image generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// Unified image generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    pub images: Vec<MediaAsset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Unified video generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Result of a completed long-running video generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenerationResult {
    pub videos: Vec<MediaAsset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    /// Raw provider payload for anything not covered by the unified shape
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}
