//! Region-code inference and query localisation for Google Jobs.
//!
//! Google Jobs is picky about geography: without a `gl` country code SerpApi
//! defaults to "us" and returns zero European results, and with `gl=de` a
//! query for "Munich" finds nothing while "München" finds plenty. These
//! helpers bridge free-text locations to what the engine expects.

use std::sync::LazyLock;

use regex::Regex;

/// Free-text country and city tokens mapped to Google `gl` codes. Matched in
/// order by substring against the lowercased location.
const GL_CODES: &[(&str, &str)] = &[
    // Countries
    ("germany", "de"),
    ("deutschland", "de"),
    ("france", "fr"),
    ("netherlands", "nl"),
    ("holland", "nl"),
    ("belgium", "be"),
    ("austria", "at"),
    ("österreich", "at"),
    ("switzerland", "ch"),
    ("schweiz", "ch"),
    ("suisse", "ch"),
    ("spain", "es"),
    ("españa", "es"),
    ("italy", "it"),
    ("italia", "it"),
    ("portugal", "pt"),
    ("poland", "pl"),
    ("polska", "pl"),
    ("sweden", "se"),
    ("sverige", "se"),
    ("norway", "no"),
    ("norge", "no"),
    ("denmark", "dk"),
    ("danmark", "dk"),
    ("finland", "fi"),
    ("suomi", "fi"),
    ("ireland", "ie"),
    ("czech republic", "cz"),
    ("czechia", "cz"),
    ("romania", "ro"),
    ("hungary", "hu"),
    ("greece", "gr"),
    ("luxembourg", "lu"),
    ("united kingdom", "uk"),
    ("england", "uk"),
    ("uk", "uk"),
    // Major cities
    ("berlin", "de"),
    ("munich", "de"),
    ("münchen", "de"),
    ("hamburg", "de"),
    ("frankfurt", "de"),
    ("stuttgart", "de"),
    ("düsseldorf", "de"),
    ("köln", "de"),
    ("cologne", "de"),
    ("hannover", "de"),
    ("nürnberg", "de"),
    ("nuremberg", "de"),
    ("leipzig", "de"),
    ("dresden", "de"),
    ("dortmund", "de"),
    ("essen", "de"),
    ("bremen", "de"),
    ("paris", "fr"),
    ("lyon", "fr"),
    ("marseille", "fr"),
    ("toulouse", "fr"),
    ("amsterdam", "nl"),
    ("rotterdam", "nl"),
    ("eindhoven", "nl"),
    ("utrecht", "nl"),
    ("brussels", "be"),
    ("bruxelles", "be"),
    ("antwerp", "be"),
    ("vienna", "at"),
    ("wien", "at"),
    ("graz", "at"),
    ("zurich", "ch"),
    ("zürich", "ch"),
    ("geneva", "ch"),
    ("genève", "ch"),
    ("basel", "ch"),
    ("bern", "ch"),
    ("madrid", "es"),
    ("barcelona", "es"),
    ("rome", "it"),
    ("milan", "it"),
    ("milano", "it"),
    ("lisbon", "pt"),
    ("porto", "pt"),
    ("warsaw", "pl"),
    ("kraków", "pl"),
    ("krakow", "pl"),
    ("wrocław", "pl"),
    ("stockholm", "se"),
    ("gothenburg", "se"),
    ("malmö", "se"),
    ("oslo", "no"),
    ("copenhagen", "dk"),
    ("helsinki", "fi"),
    ("dublin", "ie"),
    ("prague", "cz"),
    ("bucharest", "ro"),
    ("budapest", "hu"),
    ("athens", "gr"),
    ("london", "uk"),
    ("manchester", "uk"),
    ("edinburgh", "uk"),
];

/// English city names mapped to the local spelling Google Jobs indexes.
const CITY_LOCALISE: &[(&str, &str)] = &[
    ("munich", "München"),
    ("cologne", "Köln"),
    ("nuremberg", "Nürnberg"),
    ("hanover", "Hannover"),
    ("dusseldorf", "Düsseldorf"),
    ("vienna", "Wien"),
    ("zurich", "Zürich"),
    ("geneva", "Genève"),
    ("prague", "Praha"),
    ("warsaw", "Warszawa"),
    ("krakow", "Kraków"),
    ("wroclaw", "Wrocław"),
    ("copenhagen", "København"),
    ("athens", "Athína"),
    ("bucharest", "București"),
    ("milan", "Milano"),
    ("rome", "Roma"),
    ("lisbon", "Lisboa"),
    ("brussels", "Bruxelles"),
    ("antwerp", "Antwerpen"),
    ("gothenburg", "Göteborg"),
];

/// English country names mapped to local spelling.
const COUNTRY_LOCALISE: &[(&str, &str)] = &[
    ("germany", "Deutschland"),
    ("austria", "Österreich"),
    ("switzerland", "Schweiz"),
    ("netherlands", "Niederlande"),
    ("czech republic", "Česká republika"),
    ("czechia", "Česko"),
    ("poland", "Polska"),
    ("sweden", "Sverige"),
    ("norway", "Norge"),
    ("denmark", "Danmark"),
    ("finland", "Suomi"),
    ("hungary", "Magyarország"),
    ("romania", "România"),
    ("greece", "Ελλάδα"),
];

/// Tokens that mark a location as remote/worldwide rather than geographic.
const REMOTE_TOKENS: &[&str] = &["remote", "worldwide", "global", "anywhere", "weltweit"];

/// Default region when a location is given but no country can be determined.
const FALLBACK_GL: &str = "de";

static CITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<String> = CITY_LOCALISE
        .iter()
        .map(|(name, _)| regex::escape(name))
        .collect();
    Regex::new(&format!(r"(?i)\b({})\b", names.join("|"))).expect("valid regex")
});

static COUNTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Longest first, so "czech republic" wins over "czechia"-style prefixes.
    let mut names: Vec<&str> = COUNTRY_LOCALISE.iter().map(|(name, _)| *name).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    let escaped: Vec<String> = names.iter().map(|name| regex::escape(name)).collect();
    Regex::new(&format!(r"(?i)\b({})\b", escaped.join("|"))).expect("valid regex")
});

/// True when the location names only remote-like scopes ("Remote",
/// "weltweit", …) and therefore carries no geography at all.
#[must_use]
pub fn is_remote_only(location: &str) -> bool {
    let words: Vec<String> = location
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|ch| ch.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect();
    !words.is_empty() && words.iter().all(|word| REMOTE_TOKENS.contains(&word.as_str()))
}

/// Infer a Google `gl` country code from a free-form location.
///
/// Returns `None` for purely remote searches so the caller can omit the
/// parameter entirely; falls back to Germany when a location is given but
/// unrecognized.
#[must_use]
pub fn infer_gl(location: &str) -> Option<&'static str> {
    if is_remote_only(location) {
        return None;
    }
    let location = location.to_lowercase();
    for (name, code) in GL_CODES {
        if location.contains(name) {
            return Some(code);
        }
    }
    Some(FALLBACK_GL)
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    let key = key.to_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, local)| *local)
}

/// Replace English city and country names in a query with their local
/// spelling. Whole-word, case-insensitive; cities first, then countries.
#[must_use]
pub fn localise_query(query: &str) -> String {
    let with_cities = CITY_PATTERN.replace_all(query, |caps: &regex::Captures<'_>| {
        let matched = caps.get(0).map_or("", |found| found.as_str());
        lookup(CITY_LOCALISE, matched).unwrap_or(matched).to_owned()
    });
    COUNTRY_PATTERN
        .replace_all(&with_cities, |caps: &regex::Captures<'_>| {
            let matched = caps.get(0).map_or("", |found| found.as_str());
            lookup(COUNTRY_LOCALISE, matched).unwrap_or(matched).to_owned()
        })
        .into_owned()
}
