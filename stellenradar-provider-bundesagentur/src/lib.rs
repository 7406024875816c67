//! Provider implementation for the Bundesagentur für Arbeit job registry.
//!
//! Talks to the free public REST API of Germany's Federal Employment Agency
//! (API docs: <https://jobsuche.api.bund.dev/>) and falls back to scraping the
//! public detail page when the structured detail endpoint has no data.

mod detail;
mod html;

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;

use stellenradar_core::{ApplyOption, Listing, ProviderError, SearchProvider};

pub use crate::detail::DetailStrategy;

const DEFAULT_BASE_URL: &str = "https://rest.arbeitsagentur.de/jobboerse/jobsuche-service";
const DEFAULT_DETAIL_PAGE_URL: &str = "https://www.arbeitsagentur.de/jobsuche/jobdetail";
const CANONICAL_SEARCH_URL: &str = "https://www.arbeitsagentur.de/jobsuche/suche";

// Public key shipped with the official frontend; not a secret.
const API_KEY: &str = "jobboerse-jobsuche";

// The API accepts up to 100 per page; 50 is the documented safe size.
const PAGE_SIZE: usize = 50;
// Hard ceiling on pagination, regardless of what the count hint promises.
const MAX_PAGES: usize = 20;
const DEFAULT_DAYS_PUBLISHED: u32 = 7;
// angebotsart=1 restricts results to regular employment (no training or
// self-employment offers).
const OFFER_TYPE_JOBS: u8 = 1;
const DEFAULT_DETAIL_WORKERS: usize = 10;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Search endpoint response: a count hint plus the records of one page.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "maxErgebnisse")]
    total_results: u64,
    #[serde(default, rename = "stellenangebote")]
    items: Vec<SearchItem>,
}

/// Single record from the search endpoint.
#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default, rename = "hashId")]
    hash_id: String,
    #[serde(default, rename = "refnr")]
    reference: String,
    #[serde(default, rename = "beruf")]
    profession: String,
    #[serde(default, rename = "titel")]
    title: String,
    #[serde(default, rename = "arbeitgeber")]
    company_name: String,
    #[serde(default, rename = "arbeitsort")]
    workplace: Workplace,
    #[serde(default, rename = "aktuelleVeroeffentlichungsdatum")]
    published_at: String,
}

#[derive(Debug, Default, Deserialize)]
struct Workplace {
    #[serde(default)]
    ort: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    land: String,
}

/// Minimal record data carried from the search page into enrichment.
struct JobStub {
    hash_id: String,
    reference: String,
    title: String,
    company_name: String,
    location: String,
    posted_at: String,
}

/// Job-search provider backed by the Bundesagentur für Arbeit API.
pub struct BundesagenturProvider {
    client: Client,
    base_url: String,
    detail_page_url: String,
    days_published: u32,
    detail_workers: usize,
    strategy: DetailStrategy,
}

impl BundesagenturProvider {
    /// Create a provider with production endpoints and default settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the HTTP client cannot be built.
    pub fn new() -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", HeaderValue::from_static(API_KEY));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent("stellenradar/0.1")
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            detail_page_url: DEFAULT_DETAIL_PAGE_URL.to_owned(),
            days_published: DEFAULT_DAYS_PUBLISHED,
            detail_workers: DEFAULT_DETAIL_WORKERS,
            strategy: DetailStrategy::default(),
        })
    }

    /// Point the API at a different base URL (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Point the HTML fallback at a different detail-page URL (used by tests).
    #[must_use]
    pub fn with_detail_page_url(mut self, detail_page_url: impl Into<String>) -> Self {
        self.detail_page_url = detail_page_url.into();
        self
    }

    /// Select how full posting texts are obtained.
    #[must_use]
    pub fn with_detail_strategy(mut self, strategy: DetailStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restrict search results to listings published within the last `days`.
    #[must_use]
    pub fn with_days_published(mut self, days: u32) -> Self {
        self.days_published = days;
        self
    }

    /// Paginate the search endpoint and collect record stubs.
    ///
    /// Pages are 1-indexed. Stops on an empty page, on reaching
    /// `max_results`, on passing the declared total, or at the hard page
    /// ceiling (with a warning when the budget was not yet satisfied).
    async fn search_stubs(&self, query: &str, location: &str, max_results: usize) -> Vec<JobStub> {
        let page_size = max_results.min(PAGE_SIZE);
        let url = format!("{}/pc/v4/jobs", self.base_url);
        let mut stubs: Vec<JobStub> = Vec::new();
        let mut page = 1_usize;

        while stubs.len() < max_results {
            if page > MAX_PAGES {
                tracing::warn!(
                    query,
                    collected = stubs.len(),
                    max_results,
                    "page ceiling reached before the result budget was satisfied"
                );
                break;
            }

            let mut params = vec![
                ("was", query.to_owned()),
                ("size", page_size.to_string()),
                ("page", page.to_string()),
                ("veroeffentlichtseit", self.days_published.to_string()),
                ("angebotsart", OFFER_TYPE_JOBS.to_string()),
            ];
            if !location.trim().is_empty() {
                params.push(("wo", location.trim().to_owned()));
            }

            let Some(response) = detail::get_with_retry(&self.client, &url, &params).await else {
                break;
            };
            let payload: SearchResponse = match response.json().await {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(query, page, error = %err, "unparseable search page, stopping");
                    break;
                }
            };

            let mut page_stubs = Vec::new();
            for item in payload.items {
                if item.hash_id.is_empty() {
                    tracing::debug!(query, "dropping record without stable identifier");
                    continue;
                }
                page_stubs.push(stub_from_item(item));
            }
            if page_stubs.is_empty() {
                break;
            }
            stubs.extend(page_stubs);

            let declared_total = usize::try_from(payload.total_results).unwrap_or(usize::MAX);
            if declared_total > 0 && stubs.len() >= declared_total {
                break;
            }
            page += 1;
        }

        stubs.truncate(max_results);
        stubs
    }

    /// Fetch details for the whole batch with bounded parallelism and turn
    /// stubs into listings. Workers complete in arbitrary order but are all
    /// joined before returning.
    async fn enrich_stubs(&self, stubs: Vec<JobStub>) -> Vec<Listing> {
        let listings: Vec<Listing> = futures::stream::iter(
            stubs.into_iter().map(|stub| async move {
                let found = self.fetch_detail(&stub).await;
                build_listing(stub, found)
            }),
        )
        .buffer_unordered(self.detail_workers)
        .collect()
        .await;

        listings
            .into_iter()
            .filter(Listing::has_application_path)
            .collect()
    }

    async fn fetch_detail(&self, stub: &JobStub) -> detail::JobDetail {
        // The public page is addressed by reference number; fall back to the
        // hash id for records that lack one.
        let page_ref = if stub.reference.is_empty() {
            stub.hash_id.as_str()
        } else {
            stub.reference.as_str()
        };

        match self.strategy {
            DetailStrategy::StructuredOnly => {
                detail::fetch_detail_json(&self.client, &self.base_url, &stub.hash_id).await
            }
            DetailStrategy::HtmlOnly => {
                detail::fetch_detail_html(&self.client, &self.detail_page_url, page_ref).await
            }
            DetailStrategy::StructuredThenHtml => {
                let found =
                    detail::fetch_detail_json(&self.client, &self.base_url, &stub.hash_id).await;
                if found.is_empty() {
                    detail::fetch_detail_html(&self.client, &self.detail_page_url, page_ref).await
                } else {
                    found
                }
            }
        }
    }
}

#[async_trait]
impl SearchProvider for BundesagenturProvider {
    fn name(&self) -> &str {
        "Bundesagentur für Arbeit"
    }

    fn source_id(&self) -> &str {
        "bundesagentur"
    }

    async fn search(
        &self,
        query: &str,
        location: &str,
        max_results: usize,
    ) -> Result<Vec<Listing>, ProviderError> {
        let query = query.trim();
        if query.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let stubs = self.search_stubs(query, location, max_results).await;
        if stubs.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.enrich_stubs(stubs).await)
    }
}

fn stub_from_item(item: SearchItem) -> JobStub {
    let title = if item.profession.is_empty() {
        if item.title.is_empty() {
            String::from("Unknown")
        } else {
            item.title
        }
    } else {
        item.profession
    };
    let company_name = if item.company_name.is_empty() {
        String::from("Unknown")
    } else {
        item.company_name
    };

    JobStub {
        hash_id: item.hash_id,
        reference: item.reference,
        title,
        company_name,
        location: format_location(&item.workplace),
        posted_at: item.published_at,
    }
}

/// Human-readable location from the workplace record: city, region (when it
/// adds information), country. Empty workplaces default to "Germany".
fn format_location(workplace: &Workplace) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !workplace.ort.is_empty() {
        parts.push(&workplace.ort);
    }
    if !workplace.region.is_empty() && workplace.region != workplace.ort {
        parts.push(&workplace.region);
    }
    if !workplace.land.is_empty() && !parts.contains(&workplace.land.as_str()) {
        parts.push(&workplace.land);
    }
    if parts.is_empty() {
        String::from("Germany")
    } else {
        parts.join(", ")
    }
}

/// Public listing URL on the Arbeitsagentur job board.
fn canonical_link(hash_id: &str) -> String {
    format!("{CANONICAL_SEARCH_URL}?id={hash_id}")
}

/// Merge a search stub with its detail payload into a listing. Detail values
/// win over stub values when present; the canonical apply option is always
/// attached, a partner URL adds a second one.
fn build_listing(stub: JobStub, found: detail::JobDetail) -> Listing {
    let link = canonical_link(&stub.hash_id);

    let mut apply_options = vec![ApplyOption {
        source: String::from("Arbeitsagentur"),
        url: link.clone(),
    }];
    if let Some(external) = normalize_application_url(&found.partner_url) {
        apply_options.push(ApplyOption {
            source: String::from("Company Website"),
            url: external,
        });
    }

    let title = if found.title.trim().is_empty() { stub.title } else { found.title };
    let company_name = if found.company_name.trim().is_empty() {
        stub.company_name
    } else {
        found.company_name
    };
    let description = if found.description.trim().is_empty() {
        format!("{title} at {company_name} in {}", stub.location)
    } else {
        found.description
    };

    Listing {
        title,
        company_name,
        location: stub.location,
        description,
        link,
        posted_at: stub.posted_at,
        source: String::from("bundesagentur"),
        apply_options,
    }
}

/// Bring a partner application URL into absolute `https` form.
///
/// Handles protocol-relative (`//host/path`) and bare-domain (`host/path`)
/// values; empty input yields `None`.
fn normalize_application_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_owned());
    }
    if raw.starts_with("//") {
        return Some(format!("https:{raw}"));
    }
    Some(format!("https://{raw}"))
}
