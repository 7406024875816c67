//! Domain data structures for job listings and application links.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A direct way to apply for a listing (job board, company site, …).
pub struct ApplyOption {
    /// Label of the site hosting the application form, e.g. "Company Website".
    pub source: String,
    /// Direct application URL.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A single normalized job posting returned by a search provider.
pub struct Listing {
    /// Job title.
    pub title: String,
    /// Employer name.
    pub company_name: String,
    /// Human-readable location, e.g. "Berlin, Deutschland".
    pub location: String,
    /// Plain-text description; may be empty when no detail data was available.
    pub description: String,
    /// Canonical link to the posting on its source site.
    pub link: String,
    /// Free-text publication hint as reported by the source, e.g. "3 days ago".
    pub posted_at: String,
    /// Stable identifier of the provider that produced this listing.
    pub source: String,
    /// Ordered application links; providers drop listings where this is empty
    /// and no canonical link exists.
    pub apply_options: Vec<ApplyOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Identity key for deduplication across providers.
///
/// Two listings are considered the same posting when title, company, and
/// location all match. Title + company alone is not enough: the same company
/// frequently posts one role in several cities.
pub struct DedupKey {
    title: String,
    company_name: String,
    location: String,
}

impl Listing {
    /// Identity key of this listing for cross-provider deduplication.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            title: self.title.clone(),
            company_name: self.company_name.clone(),
            location: self.location.clone(),
        }
    }

    /// Whether a reader could actually act on this listing.
    ///
    /// Listings without any apply option and without a canonical link are
    /// discarded by providers before emission.
    #[must_use]
    pub fn has_application_path(&self) -> bool {
        !self.apply_options.is_empty() || !self.link.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(title: &str, company: &str, location: &str) -> Listing {
        Listing {
            title: title.to_owned(),
            company_name: company.to_owned(),
            location: location.to_owned(),
            description: String::new(),
            link: String::from("https://example.com/job"),
            posted_at: String::new(),
            source: String::from("test"),
            apply_options: Vec::new(),
        }
    }

    #[test]
    fn dedup_key_includes_location() {
        let berlin = listing("Dev", "ACME", "Berlin");
        let munich = listing("Dev", "ACME", "München");
        assert_ne!(berlin.dedup_key(), munich.dedup_key());
        assert_eq!(berlin.dedup_key(), listing("Dev", "ACME", "Berlin").dedup_key());
    }

    #[test]
    fn application_path_requires_link_or_option() {
        let mut job = listing("Dev", "ACME", "Berlin");
        assert!(job.has_application_path());

        job.link = String::from("   ");
        assert!(!job.has_application_path());

        job.apply_options.push(ApplyOption {
            source: String::from("Company Website"),
            url: String::from("https://example.com/apply"),
        });
        assert!(job.has_application_path());
    }
}
