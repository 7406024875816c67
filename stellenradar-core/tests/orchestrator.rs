//! End-to-end orchestrator behavior against scripted in-memory providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stellenradar_core::{
    ApplyOption, CombinedSearchProvider, Listing, ProviderError, SearchAllOptions, SearchProvider,
    search_all_queries,
};

fn listing(title: &str, company: &str, location: &str, source: &str) -> Listing {
    Listing {
        title: title.to_owned(),
        company_name: company.to_owned(),
        location: location.to_owned(),
        description: String::new(),
        link: format!("https://example.com/{title}"),
        posted_at: String::new(),
        source: source.to_owned(),
        apply_options: vec![ApplyOption {
            source: String::from("Company Website"),
            url: String::from("https://example.com/apply"),
        }],
    }
}

/// Scripted provider: returns a fixed result set per call, optionally unique
/// per invocation, and records every keyword it was asked to search.
struct ScriptedProvider {
    name: &'static str,
    source_id: &'static str,
    fixed: Vec<Listing>,
    fresh_per_call: usize,
    delay: Duration,
    calls: AtomicUsize,
    keywords: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn fixed(name: &'static str, source_id: &'static str, fixed: Vec<Listing>) -> Arc<Self> {
        Arc::new(Self {
            name,
            source_id,
            fixed,
            fresh_per_call: 0,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            keywords: Mutex::new(Vec::new()),
        })
    }

    /// Provider that invents `fresh_per_call` brand-new unique listings on
    /// every search call.
    fn generative(name: &'static str, source_id: &'static str, fresh_per_call: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            source_id,
            fixed: Vec::new(),
            fresh_per_call,
            delay: Duration::from_millis(30),
            calls: AtomicUsize::new(0),
            keywords: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn keywords(&self) -> Vec<String> {
        self.keywords.lock().expect("keywords lock").clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn source_id(&self) -> &str {
        self.source_id
    }

    async fn search(
        &self,
        query: &str,
        _location: &str,
        max_results: usize,
    ) -> Result<Vec<Listing>, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.keywords
            .lock()
            .expect("keywords lock")
            .push(query.to_owned());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut results = self.fixed.clone();
        for index in 0..self.fresh_per_call {
            results.push(listing(
                &format!("{} role {call}-{index}", self.source_id),
                &format!("{} Co", self.source_id),
                "Berlin",
                self.source_id,
            ));
        }
        results.truncate(max_results);
        Ok(results)
    }
}

fn queries(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|text| (*text).to_owned()).collect()
}

#[tokio::test]
async fn deduplicates_across_queries_and_providers() {
    // Child A supplies 2 listings; child B supplies 3 of which one collides
    // with A by (title, company, location). Expected unique count: 4.
    let registry = ScriptedProvider::fixed(
        "Bundesagentur für Arbeit",
        "bundesagentur",
        vec![
            listing("Python Developer", "ACME", "Berlin", "bundesagentur"),
            listing("Data Engineer", "Initech", "Berlin", "bundesagentur"),
        ],
    );
    let aggregator = ScriptedProvider::fixed(
        "SerpApi (Google Jobs)",
        "serpapi",
        vec![
            listing("Python Developer", "ACME", "Berlin", "serpapi"),
            listing("Backend Engineer", "Globex", "Berlin", "serpapi"),
            listing("Platform Engineer", "Hooli", "Berlin", "serpapi"),
        ],
    );
    let combined: Arc<dyn SearchProvider> = Arc::new(CombinedSearchProvider::new(vec![
        registry as Arc<dyn SearchProvider>,
        aggregator as Arc<dyn SearchProvider>,
    ]));

    let results = search_all_queries(
        &queries(&[
            "Python Developer",
            "provider=SerpApi (Google Jobs)::Backend Engineer",
        ]),
        combined,
        SearchAllOptions {
            jobs_per_query: 10,
            min_unique_jobs: 0,
            ..SearchAllOptions::default()
        },
    )
    .await;

    assert_eq!(results.len(), 4);
}

#[tokio::test]
async fn strips_routing_prefix_for_single_source_provider() {
    let provider = ScriptedProvider::fixed(
        "Bundesagentur für Arbeit",
        "bundesagentur",
        vec![listing("Dev", "ACME", "Berlin", "bundesagentur")],
    );

    let _ = search_all_queries(
        &queries(&["provider=Bundesagentur für Arbeit::Backend Engineer"]),
        Arc::clone(&provider) as Arc<dyn SearchProvider>,
        SearchAllOptions {
            min_unique_jobs: 0,
            ..SearchAllOptions::default()
        },
    )
    .await;

    assert_eq!(provider.keywords(), vec!["Backend Engineer"]);
}

#[tokio::test]
async fn progress_counts_are_non_decreasing() {
    let provider = ScriptedProvider::generative("Bundesagentur für Arbeit", "bundesagentur", 3);
    let seen: Arc<Mutex<Vec<(usize, usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let results = search_all_queries(
        &queries(&["a", "b", "c", "d", "e", "f"]),
        provider as Arc<dyn SearchProvider>,
        SearchAllOptions {
            min_unique_jobs: 0,
            on_progress: Some(Arc::new(move |completed, total, unique| {
                sink.lock().expect("progress lock").push((completed, total, unique));
            })),
            ..SearchAllOptions::default()
        },
    )
    .await;

    let snapshots = seen.lock().expect("progress lock").clone();
    assert_eq!(snapshots.len(), 6);
    for pair in snapshots.windows(2) {
        assert!(pair[1].0 >= pair[0].0, "completed count regressed: {pair:?}");
        assert!(pair[1].2 >= pair[0].2, "unique count regressed: {pair:?}");
    }
    assert_eq!(snapshots.last().map(|snap| snap.1), Some(6));
    assert_eq!(results.len(), 18);
}

#[tokio::test]
async fn jobs_found_batches_cover_the_final_result() {
    let provider = ScriptedProvider::generative("Bundesagentur für Arbeit", "bundesagentur", 2);
    let batches: Arc<Mutex<Vec<Listing>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&batches);

    let results = search_all_queries(
        &queries(&["a", "b", "c"]),
        provider as Arc<dyn SearchProvider>,
        SearchAllOptions {
            min_unique_jobs: 0,
            on_jobs_found: Some(Arc::new(move |batch: &[Listing]| {
                sink.lock().expect("batch lock").extend(batch.iter().cloned());
            })),
            ..SearchAllOptions::default()
        },
    )
    .await;

    let streamed = batches.lock().expect("batch lock");
    assert_eq!(streamed.len(), results.len());
}

#[tokio::test]
async fn early_stop_skips_pending_queries() {
    let provider = ScriptedProvider::generative("Bundesagentur für Arbeit", "bundesagentur", 10);
    let many: Vec<String> = (0..100).map(|index| format!("query {index}")).collect();

    let results = search_all_queries(
        &many,
        Arc::clone(&provider) as Arc<dyn SearchProvider>,
        SearchAllOptions {
            jobs_per_query: 10,
            min_unique_jobs: 5,
            ..SearchAllOptions::default()
        },
    )
    .await;

    assert!(results.len() >= 5);
    // The pool runs 5 tasks at a time; after the threshold is reached the
    // queued tasks bail out without searching.
    assert!(
        provider.call_count() <= 20,
        "expected early stop, saw {} calls",
        provider.call_count()
    );
}

#[tokio::test]
async fn quota_floor_keeps_slow_source_in_the_run() {
    // Source A can satisfy any global minimum on its own; source B drips 5
    // listings per query. With both tracked, the run must not stop before B
    // has contributed its floor of 30.
    let registry = ScriptedProvider::generative("Bundesagentur für Arbeit", "bundesagentur", 60);
    let aggregator = ScriptedProvider::generative("SerpApi (Google Jobs)", "serpapi", 5);
    let combined: Arc<dyn SearchProvider> = Arc::new(CombinedSearchProvider::new(vec![
        registry as Arc<dyn SearchProvider>,
        Arc::clone(&aggregator) as Arc<dyn SearchProvider>,
    ]));

    let many: Vec<String> = (0..20).map(|index| format!("query {index}")).collect();
    let results = search_all_queries(
        &many,
        combined,
        SearchAllOptions {
            jobs_per_query: 200,
            min_unique_jobs: 10,
            ..SearchAllOptions::default()
        },
    )
    .await;

    let from_aggregator = results
        .iter()
        .filter(|job| job.source == "serpapi")
        .count();
    assert!(from_aggregator >= 30, "slow source stopped at {from_aggregator} listings");
}

#[tokio::test]
async fn zero_minimum_disables_quota_and_early_stop() {
    let registry = ScriptedProvider::generative("Bundesagentur für Arbeit", "bundesagentur", 40);
    let aggregator = ScriptedProvider::fixed("SerpApi (Google Jobs)", "serpapi", Vec::new());
    let combined: Arc<dyn SearchProvider> = Arc::new(CombinedSearchProvider::new(vec![
        Arc::clone(&registry) as Arc<dyn SearchProvider>,
        aggregator as Arc<dyn SearchProvider>,
    ]));

    let many: Vec<String> = (0..8).map(|index| format!("query {index}")).collect();
    let _ = search_all_queries(
        &many,
        combined,
        SearchAllOptions {
            jobs_per_query: 80,
            min_unique_jobs: 0,
            ..SearchAllOptions::default()
        },
    )
    .await;

    // No early stop: every query reached the provider even though the unique
    // count blew past any plausible threshold after the first one.
    assert_eq!(registry.call_count(), 8);
}

#[tokio::test]
async fn empty_query_list_returns_empty() {
    let provider = ScriptedProvider::fixed("Bundesagentur für Arbeit", "bundesagentur", Vec::new());
    let results = search_all_queries(
        &[],
        provider as Arc<dyn SearchProvider>,
        SearchAllOptions::default(),
    )
    .await;
    assert!(results.is_empty());
}
