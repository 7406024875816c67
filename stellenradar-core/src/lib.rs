//! Core types and orchestration for the stellenradar job-search aggregator.

/// Fan-out provider that merges results from multiple backends.
pub mod combined;
/// Domain models for job listings and apply options.
pub mod model;
/// Concurrent multi-query search with deduplication and early stop.
pub mod orchestrator;
/// Traits describing the search-provider interface.
pub mod provider;
/// Parsing of provider-routing prefixes embedded in query strings.
pub mod routing;

pub use combined::*;
pub use model::*;
pub use orchestrator::*;
pub use provider::*;
pub use routing::*;
