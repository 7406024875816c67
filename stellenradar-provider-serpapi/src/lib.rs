//! Google Jobs search via the SerpApi aggregation service.
//!
//! Each call costs SerpApi credits, so the client is deliberately frugal: it
//! follows `next_page_token` pagination only until the result budget is met
//! and gives up early on empty pages. Results that only link to job-board
//! aggregators with no real application path are dropped.

pub mod locale;

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use stellenradar_core::{ApplyOption, Listing, ProviderError, SearchProvider};

const DEFAULT_BASE_URL: &str = "https://serpapi.com/search";
const API_KEY_ENV: &str = "SERPAPI_KEY";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_RETRIES: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(2);
const RETRY_JITTER: Duration = Duration::from_millis(250);

/// Job-board aggregators whose apply links lead to scraped reposts rather
/// than a real application form. Matched by substring against the link.
const BLOCKED_PORTALS: &[&str] = &[
    "bebee",
    "trabajo",
    "jooble",
    "adzuna",
    "jobrapido",
    "neuvoo",
    "mitula",
    "trovit",
    "jobomas",
    "jobijoba",
    "talent",
    "jobatus",
    "jobsora",
    "studysmarter",
    "jobilize",
    "learn4good",
    "grabjobs",
    "jobtensor",
    "zycto",
    "terra.do",
    "jobzmall",
    "simplyhired",
];

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs_results: Vec<JobRecord>,
    #[serde(default)]
    serpapi_pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JobRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    share_link: String,
    #[serde(default)]
    apply_options: Vec<WireApplyOption>,
    #[serde(default)]
    job_highlights: Vec<Highlight>,
    #[serde(default)]
    detected_extensions: DetectedExtensions,
}

#[derive(Debug, Default, Deserialize)]
struct WireApplyOption {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Default, Deserialize)]
struct Highlight {
    #[serde(default)]
    items: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectedExtensions {
    #[serde(default)]
    posted_at: String,
}

/// Google Jobs search backed by SerpApi's `google_jobs` engine.
#[derive(Debug, Clone)]
pub struct SerpApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SerpApiProvider {
    /// Build a provider with the given API key.
    ///
    /// # Errors
    ///
    /// [`ProviderError::MissingCredentials`] when the key is blank, or a
    /// network error when the HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(String::from(
                "SerpApi key is not set",
            )));
        }
        let client = Client::builder()
            .user_agent("stellenradar/0.1")
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: String::from(DEFAULT_BASE_URL),
        })
    }

    /// Build a provider from the `SERPAPI_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// [`ProviderError::MissingCredentials`] when the variable is unset or
    /// blank.
    pub fn from_env() -> Result<Self, ProviderError> {
        let key = env::var(API_KEY_ENV).unwrap_or_default();
        Self::new(key)
    }

    /// Override the API endpoint, for tests against a local server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_page(&self, params: &[(&str, String)]) -> Option<SearchResponse> {
        let response = get_with_retry(&self.client, &self.base_url, params).await?;
        match response.json::<SearchResponse>().await {
            Ok(page) => Some(page),
            Err(err) => {
                tracing::warn!(error = %err, "unparseable search payload, stopping pagination");
                None
            }
        }
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    fn name(&self) -> &str {
        "SerpApi (Google Jobs)"
    }

    fn source_id(&self) -> &str {
        "serpapi"
    }

    async fn search(
        &self,
        query: &str,
        location: &str,
        max_results: usize,
    ) -> Result<Vec<Listing>, ProviderError> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let remote = locale::is_remote_only(location);
        let gl_code = locale::infer_gl(location);
        let localised = locale::localise_query(query);

        let mut listings = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut params: Vec<(&str, String)> = vec![
                ("engine", String::from("google_jobs")),
                ("q", localised.clone()),
                ("hl", String::from("en")),
                ("api_key", self.api_key.clone()),
            ];
            if let Some(code) = gl_code {
                params.push(("gl", String::from(code)));
            }
            if !remote && !location.trim().is_empty() {
                params.push(("location", String::from(location)));
            }
            if let Some(token) = &next_token {
                params.push(("next_page_token", token.clone()));
            }

            let Some(page) = self.fetch_page(&params).await else {
                break;
            };

            let page_size = page.jobs_results.len();
            let before = listings.len();
            for record in page.jobs_results {
                if let Some(listing) = build_listing(record, location) {
                    listings.push(listing);
                }
            }
            tracing::debug!(query = %localised, page_size, total = listings.len(), "search page consumed");

            // A page that contributed nothing usable ends the run; every
            // further page costs a paid API call for no expected gain. This
            // also covers pages with no records at all.
            if listings.len() == before {
                break;
            }
            if listings.len() >= max_results {
                break;
            }
            match page.serpapi_pagination.next_page_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        listings.truncate(max_results);
        Ok(listings)
    }
}

/// Whether an apply link points at one of the blocked aggregator portals.
fn is_blocked(url: &str) -> bool {
    let url = url.to_lowercase();
    BLOCKED_PORTALS.iter().any(|portal| url.contains(portal))
}

/// Convert one wire record to a listing, or drop it when every application
/// path is a blocked portal.
fn build_listing(record: JobRecord, fallback_location: &str) -> Option<Listing> {
    let apply_options: Vec<ApplyOption> = record
        .apply_options
        .into_iter()
        .filter(|option| !option.link.trim().is_empty() && !is_blocked(&option.link))
        .map(|option| ApplyOption {
            source: non_empty(option.title, "Unknown"),
            url: option.link,
        })
        .collect();
    if apply_options.is_empty() {
        tracing::debug!(title = %record.title, "dropped record with only blocked apply options");
        return None;
    }

    let description = assemble_description(&record.description, &record.job_highlights);
    let link = if record.share_link.trim().is_empty() {
        apply_options.first().map(|option| option.url.clone()).unwrap_or_default()
    } else {
        record.share_link
    };

    Some(Listing {
        title: non_empty(record.title, "Unknown"),
        company_name: non_empty(record.company_name, "Unknown"),
        location: non_empty(record.location, non_empty_str(fallback_location, "Unknown")),
        description,
        link,
        posted_at: record.detected_extensions.posted_at,
        source: String::from("serpapi"),
        apply_options,
    })
}

/// Plain-text body: the prose description followed by every highlight item,
/// one per line. Records frequently carry both, and the highlights hold the
/// qualification lists readers filter on.
fn assemble_description(description: &str, highlights: &[Highlight]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !description.trim().is_empty() {
        parts.push(description);
    }
    for highlight in highlights {
        parts.extend(highlight.items.iter().map(String::as_str));
    }
    parts.join("\n")
}

fn non_empty(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        String::from(fallback)
    } else {
        value
    }
}

fn non_empty_str<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

/// GET with bounded retry. 429 and 5xx are retried with exponential backoff,
/// other errors give up immediately. The key travels in `params`, so only the
/// bare endpoint is ever logged.
async fn get_with_retry(client: &Client, url: &str, params: &[(&str, String)]) -> Option<Response> {
    for attempt in 0..MAX_RETRIES {
        match client.get(url).query(params).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Some(response);
                }
                if !is_retryable(status) {
                    tracing::debug!(url, status = status.as_u16(), "giving up on client error");
                    return None;
                }
                tracing::warn!(url, status = status.as_u16(), attempt, "transient status, retrying");
            }
            Err(err) => {
                tracing::warn!(url, error = %err, attempt, "network error, retrying");
            }
        }

        if attempt + 1 < MAX_RETRIES {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    tracing::error!(url, attempts = MAX_RETRIES, "request failed after retries");
    None
}

fn backoff_delay(attempt: u32) -> Duration {
    BASE_DELAY * 2_u32.pow(attempt) + RETRY_JITTER
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_is_rejected() {
        let err = SerpApiProvider::new("   ").expect_err("blank key");
        assert!(matches!(err, ProviderError::MissingCredentials(_)));
    }

    #[test]
    fn blocked_portals_match_case_insensitively() {
        assert!(is_blocked("https://de.BeBee.com/job/123"));
        assert!(is_blocked("https://www.simplyhired.de/job/abc"));
        // Bare tokens, so sibling domains of the same portal family match too.
        assert!(is_blocked("https://talent.io/de/jobs/1"));
        assert!(is_blocked("https://trabajo.com.mx/oferta/1"));
        assert!(!is_blocked("https://careers.acme.example/apply"));
    }

    #[test]
    fn record_with_only_blocked_options_is_dropped() {
        let record = JobRecord {
            title: String::from("Dev"),
            apply_options: vec![WireApplyOption {
                title: String::from("bebee.com"),
                link: String::from("https://de.bebee.com/job/1"),
            }],
            ..JobRecord::default()
        };
        assert!(build_listing(record, "Berlin").is_none());
    }

    #[test]
    fn highlights_are_appended_to_the_description() {
        let record = JobRecord {
            title: String::from("Dev"),
            description: String::from("We build radar software."),
            apply_options: vec![WireApplyOption {
                title: String::from("ACME Careers"),
                link: String::from("https://careers.acme.example/1"),
            }],
            job_highlights: vec![
                Highlight {
                    items: vec![String::from("Rust"), String::from("Tokio")],
                },
                Highlight {
                    items: vec![String::from("Hybrid work")],
                },
            ],
            ..JobRecord::default()
        };
        let listing = build_listing(record, "Berlin").expect("listing");
        assert_eq!(
            listing.description,
            "We build radar software.\nRust\nTokio\nHybrid work"
        );
        assert_eq!(listing.location, "Berlin");
        assert_eq!(listing.link, "https://careers.acme.example/1");
    }

    #[test]
    fn highlights_fill_in_for_a_missing_description() {
        let record = JobRecord {
            title: String::from("Dev"),
            apply_options: vec![WireApplyOption {
                title: String::from("ACME Careers"),
                link: String::from("https://careers.acme.example/1"),
            }],
            job_highlights: vec![Highlight {
                items: vec![String::from("Rust"), String::from("Tokio")],
            }],
            ..JobRecord::default()
        };
        let listing = build_listing(record, "Berlin").expect("listing");
        assert_eq!(listing.description, "Rust\nTokio");
    }
}
