//! Extraction of the client-state JSON blob embedded in public detail pages.
//!
//! The public job-detail page is an Angular application that serializes its
//! server-side state into `<script id="ng-state" type="application/json">`.
//! When the structured detail endpoint has no data, that blob still carries
//! the full posting under its `jobdetail` key.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};

const STATE_SCRIPT_SELECTOR: &str = r#"script#ng-state[type="application/json"]"#;

static BREAK_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</li>|</div>|</h[1-6]>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

/// Parse the first embedded-state script tag into its top-level JSON object.
///
/// Returns an empty object for pages without the tag, non-JSON content, or
/// content whose top level is not an object. Never fails.
pub(crate) fn embedded_state(page: &str) -> Map<String, Value> {
    let document = Html::parse_document(page);
    let Ok(selector) = Selector::parse(STATE_SCRIPT_SELECTOR) else {
        return Map::new();
    };
    let Some(script) = document.select(&selector).next() else {
        return Map::new();
    };

    let raw: String = script.text().collect();
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(state)) => state,
        _ => Map::new(),
    }
}

/// The nested `jobdetail` object from the embedded state, or an empty object.
pub(crate) fn job_detail_state(page: &str) -> Map<String, Value> {
    match embedded_state(page).remove("jobdetail") {
        Some(Value::Object(detail)) => detail,
        _ => Map::new(),
    }
}

/// Turn an HTML description into readable plain text: tags stripped, entities
/// decoded, whitespace collapsed. Block-level closers become line breaks.
pub(crate) fn clean_html_text(raw: &str) -> String {
    let with_breaks = BREAK_TAGS.replace_all(raw, "\n");
    let stripped = ANY_TAG.replace_all(&with_breaks, "");
    let decoded = html_escape::decode_html_entities(stripped.as_ref());

    let mut lines = Vec::new();
    let mut previous_blank = true;
    for line in decoded.lines() {
        let line = SPACE_RUN.replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(line.to_owned());
            previous_blank = false;
        }
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}
