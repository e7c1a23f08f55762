//! TOML configuration for the grounding server
//!
//! ```toml
//! [grounding]
//! max_pages = 30
//!
//! [[providers]]
//! id = "gpt"
//! kind = "openai"
//! model = "gpt-4o"
//!
//! [[providers]]
//! id = "claude"
//! kind = "anthropic"
//! model = "claude-sonnet-4-20250514"
//! api_key_env = "CLAUDE_KEY"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use agent_orchestrator::ProviderConfig;
use anyhow::{bail, Context};
use grounding_core::DEFAULT_MAX_PAGES;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grounding: GroundingConfig,
    /// Extraction providers, invoked in this order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingConfig {
    /// Pages searched per lookup
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
        }
    }
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.grounding.max_pages == 0 {
            bail!("grounding.max_pages must be at least 1");
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                bail!("Provider id must not be empty");
            }
            if !seen.insert(provider.id.as_str()) {
                bail!("Duplicate provider id '{}'", provider.id);
            }
            if provider.timeout_secs == 0 {
                bail!("Provider '{}': timeout_secs must be at least 1", provider.id);
            }
        }
        Ok(())
    }
}
