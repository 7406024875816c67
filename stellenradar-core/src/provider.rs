//! Trait describing the search-provider capability shared by all backends.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::Listing;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to job-search backends.
pub enum ProviderError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// A required credential is absent. This is the only error class callers
    /// are expected to handle; everything else degrades to empty results.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
    /// Provider returned a payload that could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Capability implemented by every job-search backend, single-source clients
/// and the fan-out composite alike.
pub trait SearchProvider: Send + Sync {
    /// Human-readable provider name, e.g. "Bundesagentur für Arbeit".
    /// Routing prefixes (`provider=<name>::…`) are matched against this.
    fn name(&self) -> &str;

    /// Stable lowercase identifier used as the listing source tag and the
    /// per-source quota key, e.g. "bundesagentur".
    fn source_id(&self) -> &str;

    /// Run a single search and return parsed listings.
    ///
    /// Implementations handle location filtering, localisation, and
    /// pagination internally and never return more than `max_results`
    /// listings.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the backend request fails in a way
    /// that cannot be degraded to an empty result.
    async fn search(
        &self,
        query: &str,
        location: &str,
        max_results: usize,
    ) -> Result<Vec<Listing>, ProviderError>;

    /// Source identifiers that per-source quota accounting should track.
    ///
    /// Empty for single-source providers (no fairness to enforce); the
    /// fan-out composite reports one entry per child.
    fn quota_sources(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this provider interprets routing prefixes itself. When false,
    /// the orchestrator strips any stray prefix before dispatch.
    fn resolves_routing(&self) -> bool {
        false
    }
}
