//! Optional TOML profile
//!
//! Deployment-specific tuning loaded from a file, currently the intent
//! classifier's keyword sets. Absent sections fall back to the built-in
//! defaults, so a minimal (or missing) profile is always valid.

use std::path::Path;

use serde::Deserialize;

use crate::intent::KeywordSets;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    /// Overrides for the keyword-based intent classifier.
    #[serde(default)]
    pub classifier: Option<KeywordSets>,
}

impl Profile {
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ProfileError> {
        let profile: Profile = toml::from_str(content)?;
        Ok(profile)
    }

    /// The keyword sets to classify with: profile override or defaults.
    pub fn keyword_sets(&self) -> KeywordSets {
        self.classifier.clone().unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profile_uses_defaults() {
        let profile = Profile::from_toml("").unwrap();
        let sets = profile.keyword_sets();
        assert!(sets.image.iter().any(|k| k == "배경"));
        assert!(sets.copy.iter().any(|k| k == "헤드라인"));
    }

    #[test]
    fn test_profile_overrides_keyword_sets() {
        let profile = Profile::from_toml(
            r#"
[classifier]
image = ["시각", "로고"]
copy = ["문장"]
"#,
        )
        .unwrap();
        let sets = profile.keyword_sets();
        assert_eq!(sets.image, vec!["시각", "로고"]);
        assert_eq!(sets.copy, vec!["문장"]);
    }
}
