//! Generated-content types
//!
//! A [`GeneratedArtifact`] is the immutable result of one generation
//! run: the strategy the backend picked, the ad copy, and the image.
//! Regeneration never mutates an artifact in place; the coordinator
//! replaces the cached one wholesale (or swaps a single section for
//! partial regeneration, producing a new value).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketing strategy selected by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub core_message: String,
    /// Emotional register, e.g. "감성적" / "이성적" / "사회적".
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub expected_effect: String,
}

/// Ad copy produced for one tone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyBlock {
    pub text: String,
    /// Tone code: professional / casual / impact.
    pub tone: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

/// Generated marketing image plus the prompt that produced it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// The full strategy + copy + image bundle from one generation.
///
/// Carries the target fields the backend resolved (it may have filled
/// in ages/interests the user left to "AI 자동 분석") so that partial
/// regeneration requests can echo them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<i64>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub target_age_group: Option<String>,
    #[serde(default)]
    pub target_gender: Option<String>,
    #[serde(default)]
    pub target_ages: Vec<String>,
    #[serde(default)]
    pub target_genders: Vec<String>,
    #[serde(default)]
    pub target_interests: Vec<String>,
    #[serde(default)]
    pub selected_strategy: Strategy,
    pub copy: CopyBlock,
    #[serde(default)]
    pub image: ImageBlock,
    /// When this client received the `complete` event. Not part of the
    /// wire payload.
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl GeneratedArtifact {
    /// New artifact with only the image section swapped.
    pub fn with_image(&self, image: ImageBlock) -> Self {
        let mut next = self.clone();
        next.image = image;
        next.fetched_at = Utc::now();
        next
    }

    /// New artifact with only the copy section swapped.
    pub fn with_copy(&self, copy: CopyBlock) -> Self {
        let mut next = self.clone();
        next.copy = copy;
        next.fetched_at = Utc::now();
        next
    }
}
