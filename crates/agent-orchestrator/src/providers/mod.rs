//! Provider implementations

pub mod http;

use std::sync::Arc;

pub use http::{HttpProvider, ProviderConfig, ProviderKind};

use crate::error::ProviderError;
use crate::provider::ExtractionProvider;

/// Build one HTTP provider per config entry, in config order
pub fn build_providers(
    configs: &[ProviderConfig],
) -> Result<Vec<Arc<dyn ExtractionProvider>>, ProviderError> {
    configs
        .iter()
        .map(|config| {
            HttpProvider::new(config.clone()).map(|p| Arc::new(p) as Arc<dyn ExtractionProvider>)
        })
        .collect()
}
