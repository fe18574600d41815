//! Application configuration

pub mod profile;

use std::env;

use serde::{Deserialize, Serialize};

pub use profile::Profile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the generation backend.
    pub base_url: String,
    /// Bearer credential attached to every request. Obtaining it is an
    /// external concern; we only carry it.
    pub token: Option<String>,
    /// Request timeout. Generation streams run long, so the default is
    /// generous.
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: env::var("PROMOFORGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".into()),
            token: env::var("PROMOFORGE_TOKEN").ok(),
            timeout_secs: env::var("PROMOFORGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        })
    }
}
