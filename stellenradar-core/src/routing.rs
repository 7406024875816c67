//! Parsing of the `provider=<name>::<query>` routing prefix.
//!
//! The upstream phrase generator may bind a query to one child of a combined
//! provider by prefixing it. Parsing is pure and total: anything that does not
//! match the prefix shape is treated as an untagged query.

const ROUTING_PREFIX: &str = "provider=";
const ROUTING_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A query with its optional routing target, parsed once at the boundary.
pub struct RoutedQuery<'a> {
    /// Provider name the query is bound to, if any.
    pub target: Option<&'a str>,
    /// The query text with any routing prefix removed.
    pub query: &'a str,
}

/// Split an optional `provider=<name>::` prefix off a query string.
///
/// Malformed input (missing separator, empty name, empty query) falls back to
/// an untagged query carrying the original string.
#[must_use]
pub fn parse_provider_query(raw: &str) -> RoutedQuery<'_> {
    let untagged = RoutedQuery {
        target: None,
        query: raw,
    };

    let Some(rest) = raw.strip_prefix(ROUTING_PREFIX) else {
        return untagged;
    };
    let Some((name, query)) = rest.split_once(ROUTING_SEPARATOR) else {
        return untagged;
    };

    let name = name.trim();
    let query = query.trim();
    if name.is_empty() || query.is_empty() {
        return untagged;
    }

    RoutedQuery {
        target: Some(name),
        query,
    }
}
