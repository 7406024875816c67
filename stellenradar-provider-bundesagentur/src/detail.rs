//! Detail enrichment: structured endpoint, HTML fallback, and retry policy.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::html;

/// Retry ceiling for transient errors on both detail paths and search pages.
pub(crate) const MAX_RETRIES: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(2);
const RETRY_JITTER: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// How to obtain the full posting text for a search result.
pub enum DetailStrategy {
    /// Try the structured detail endpoint; scrape the public page when it
    /// comes back empty.
    #[default]
    StructuredThenHtml,
    /// Structured endpoint only, never touch the public page.
    StructuredOnly,
    /// Scrape the public page directly.
    HtmlOnly,
}

#[derive(Debug, Default, Deserialize)]
/// Posting details, from either the structured endpoint or the embedded
/// page state (both use the same field names).
pub(crate) struct JobDetail {
    #[serde(default, rename = "stellenbeschreibung")]
    pub(crate) description: String,
    #[serde(default, rename = "titel")]
    pub(crate) title: String,
    #[serde(default, rename = "arbeitgeber")]
    pub(crate) company_name: String,
    #[serde(default, rename = "allianzPartnerUrl")]
    pub(crate) partner_url: String,
}

impl JobDetail {
    /// Whether the payload carries nothing worth merging into a listing.
    pub(crate) fn is_empty(&self) -> bool {
        self.description.trim().is_empty()
            && self.title.trim().is_empty()
            && self.company_name.trim().is_empty()
            && self.partner_url.trim().is_empty()
    }
}

/// Fetch the structured detail payload for one record id.
///
/// Degrades to an empty detail on every failure mode: non-retryable status,
/// exhausted retries, or an unparseable body.
pub(crate) async fn fetch_detail_json(client: &Client, base_url: &str, record_id: &str) -> JobDetail {
    let url = format!("{base_url}/pc/v2/jobdetails/{record_id}");
    let Some(response) = get_with_retry(client, &url, &[]).await else {
        return JobDetail::default();
    };
    match response.json::<JobDetail>().await {
        Ok(detail) => detail,
        Err(err) => {
            tracing::warn!(record_id, error = %err, "unparseable detail payload, skipping");
            JobDetail::default()
        }
    }
}

/// Scrape the public detail page and pull the posting out of its embedded
/// client-state blob. Parse failure or a non-200 page yields an empty detail.
pub(crate) async fn fetch_detail_html(client: &Client, page_url: &str, record_ref: &str) -> JobDetail {
    let url = format!("{page_url}/{record_ref}");
    let Some(response) = get_with_retry(client, &url, &[]).await else {
        return JobDetail::default();
    };
    let Ok(body) = response.text().await else {
        return JobDetail::default();
    };

    let state = html::job_detail_state(&body);
    if state.is_empty() {
        return JobDetail::default();
    }
    let mut detail: JobDetail = serde_json::from_value(Value::Object(state)).unwrap_or_default();
    detail.description = html::clean_html_text(&detail.description);
    detail
}

/// GET with bounded retry on transient failures.
///
/// 403/429/5xx and transport errors are retried with exponential backoff plus
/// a fixed jitter; any other non-success status gives up immediately. Returns
/// `None` once the ceiling is exhausted; errors never propagate.
pub(crate) async fn get_with_retry(
    client: &Client,
    url: &str,
    params: &[(&str, String)],
) -> Option<Response> {
    for attempt in 0..MAX_RETRIES {
        let request = if params.is_empty() {
            client.get(url)
        } else {
            client.get(url).query(params)
        };

        match request.send().await {
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
    status == StatusCode::FORBIDDEN
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_with_fixed_jitter() {
        assert_eq!(backoff_delay(0), Duration::from_millis(2250));
        assert_eq!(backoff_delay(1), Duration::from_millis(4250));
        assert_eq!(backoff_delay(2), Duration::from_millis(8250));
    }

    #[test]
    fn retryable_statuses() {
        for code in [403_u16, 429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).expect("valid status");
            assert!(is_retryable(status), "{code} should be retried");
        }
        for code in [400_u16, 401, 404, 410] {
            let status = StatusCode::from_u16(code).expect("valid status");
            assert!(!is_retryable(status), "{code} should give up immediately");
        }
    }

    #[test]
    fn empty_detail_detection() {
        assert!(JobDetail::default().is_empty());
        let detail = JobDetail {
            partner_url: String::from("https://example.com/apply"),
            ..JobDetail::default()
        };
        assert!(!detail.is_empty());
    }
}
