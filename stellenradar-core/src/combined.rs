//! Fan-out provider that splits a result budget across multiple backends.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::Listing;
use crate::provider::{ProviderError, SearchProvider};
use crate::routing::parse_provider_query;

/// Composite provider that forwards a query to several child providers and
/// merges their results under the shared dedup key.
///
/// A routing prefix (`provider=<name>::…`) restricts the search to the named
/// child; unknown or absent targets run every child. Children execute
/// sequentially and a failing child is logged and skipped, never aborting its
/// siblings.
pub struct CombinedSearchProvider {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl CombinedSearchProvider {
    /// Build a composite over the given child providers, in fan-out order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    /// Child providers in fan-out order.
    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn SearchProvider>] {
        &self.providers
    }
}

#[async_trait]
impl SearchProvider for CombinedSearchProvider {
    fn name(&self) -> &str {
        "Combined"
    }

    fn source_id(&self) -> &str {
        "combined"
    }

    async fn search(
        &self,
        query: &str,
        location: &str,
        max_results: usize,
    ) -> Result<Vec<Listing>, ProviderError> {
        if max_results == 0 || self.providers.is_empty() {
            return Ok(Vec::new());
        }

        let routed = parse_provider_query(query);
        let selected: Vec<&Arc<dyn SearchProvider>> = match routed.target {
            Some(target) if self.providers.iter().any(|child| child.name() == target) => self
                .providers
                .iter()
                .filter(|child| child.name() == target)
                .collect(),
            _ => self.providers.iter().collect(),
        };

        // Ceiling division keeps every child useful on small budgets; combined
        // cost exceeds max_results by at most selected.len() - 1.
        let per_provider = max_results.div_ceil(selected.len());

        let mut merged: Vec<Listing> = Vec::new();
        let mut seen = HashSet::new();

        for provider in selected {
            let batch = match provider.search(routed.query, location, per_provider).await {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::warn!(
                        provider = provider.name(),
                        query = routed.query,
                        error = %err,
                        "child provider failed, skipping"
                    );
                    continue;
                }
            };

            for listing in batch {
                if seen.insert(listing.dedup_key()) {
                    merged.push(listing);
                }
            }
        }

        merged.truncate(max_results);
        Ok(merged)
    }

    fn quota_sources(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|child| child.source_id().to_lowercase())
            .collect()
    }

    fn resolves_routing(&self) -> bool {
        true
    }
}
