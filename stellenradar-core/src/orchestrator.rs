//! Concurrent fan-out of a phrase list against the active provider.
//!
//! Each query becomes one task on a bounded worker pool. Results are merged
//! into a shared, mutex-guarded accumulation map keyed by the listing dedup
//! key; the run stops early once enough unique listings exist and every
//! tracked source has met its quota floor.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::model::{DedupKey, Listing};
use crate::provider::SearchProvider;
use crate::routing::parse_provider_query;

/// Upper bound on concurrently running query tasks.
const MAX_WORKERS: usize = 5;

/// Per-source quota floor: with a fan-out provider active, every source must
/// contribute at least this many unique listings before early stop is allowed.
const MIN_JOBS_PER_SOURCE: usize = 30;

/// Progress callback: `(completed_queries, total_queries, unique_listings)`.
///
/// Because queries run in parallel, the completed count reflects finish
/// order, not the original query index. Successive calls report
/// non-decreasing completed and unique counts.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, usize) + Send + Sync>;

/// Invoked with each batch of newly discovered unique listings as soon as a
/// query completes, so callers can start downstream work before the whole
/// run finishes.
pub type JobsFoundCallback = Arc<dyn Fn(&[Listing]) + Send + Sync>;

/// Options for [`search_all_queries`].
pub struct SearchAllOptions {
    /// Result budget handed to the provider for each query.
    pub jobs_per_query: usize,
    /// Free-text target location passed through to the provider.
    pub location: String,
    /// Stop early once this many unique listings exist (0 disables early
    /// stop and all per-source quota logic).
    pub min_unique_jobs: usize,
    /// Optional progress callback, invoked outside the state lock.
    pub on_progress: Option<ProgressCallback>,
    /// Optional new-listings callback, invoked outside the state lock.
    pub on_jobs_found: Option<JobsFoundCallback>,
}

impl Default for SearchAllOptions {
    fn default() -> Self {
        Self {
            jobs_per_query: 10,
            location: String::new(),
            min_unique_jobs: 50,
            on_progress: None,
            on_jobs_found: None,
        }
    }
}

/// Accumulation state shared by one orchestrator invocation.
#[derive(Default)]
struct RunState {
    listings: Vec<Listing>,
    seen: HashSet<DedupKey>,
    source_counts: HashMap<String, usize>,
    completed: usize,
}

fn lock_state(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn source_key(listing: &Listing) -> String {
    if listing.source.trim().is_empty() {
        String::from("unknown")
    } else {
        listing.source.to_lowercase()
    }
}

/// Search all queries against `provider`, deduplicate globally, and return
/// the collected listings.
///
/// Queries run concurrently on a pool of `min(5, queries.len())` workers.
/// Dedup collisions are first-writer-wins in completion order. Failed
/// queries are logged and contribute nothing; the returned list is always
/// valid, possibly empty.
pub async fn search_all_queries(
    queries: &[String],
    provider: Arc<dyn SearchProvider>,
    options: SearchAllOptions,
) -> Vec<Listing> {
    let total = queries.len();
    if total == 0 {
        return Vec::new();
    }

    // With a fan-out provider active, raise the early-stop threshold so that
    // one fast source cannot end the run before slower sources reach their
    // quota floor. A zero threshold disables quota logic entirely.
    let quota_sources = provider.quota_sources();
    let mut min_unique_jobs = options.min_unique_jobs;
    if !quota_sources.is_empty() && min_unique_jobs > 0 {
        min_unique_jobs = min_unique_jobs.max(MIN_JOBS_PER_SOURCE * quota_sources.len());
    }

    let semaphore = Arc::new(Semaphore::new(MAX_WORKERS.min(total)));
    let early_stop = Arc::new(AtomicBool::new(false));
    let mut tasks = JoinSet::new();

    for query in queries {
        let query = query.clone();
        let provider = Arc::clone(&provider);
        let semaphore = Arc::clone(&semaphore);
        let early_stop = Arc::clone(&early_stop);
        let location = options.location.clone();
        let jobs_per_query = options.jobs_per_query;

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return Vec::new();
            };
            // Cancellation is best-effort: queued tasks that have not started
            // their search yet bail out here after an early stop.
            if early_stop.load(Ordering::SeqCst) {
                return Vec::new();
            }

            // Fan-out providers resolve routing themselves; for single-source
            // providers a stray prefix must not leak into the keyword search.
            let keyword = if provider.resolves_routing() {
                query.as_str()
            } else {
                parse_provider_query(&query).query
            };

            match provider.search(keyword, &location, jobs_per_query).await {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::error!(query = keyword, error = %err, "search query failed");
                    Vec::new()
                }
            }
        });
    }

    let state = Mutex::new(RunState::default());

    while let Some(joined) = tasks.join_next().await {
        let batch = match joined {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!(error = %err, "search task failed");
                Vec::new()
            }
        };

        // After an early stop only drain the pool; no further results are
        // accepted and no further callbacks fire.
        if early_stop.load(Ordering::SeqCst) {
            continue;
        }

        let mut new_batch = Vec::new();
        let progress = {
            let mut run = lock_state(&state);
            for listing in batch {
                if run.seen.insert(listing.dedup_key()) {
                    *run.source_counts.entry(source_key(&listing)).or_insert(0) += 1;
                    run.listings.push(listing.clone());
                    new_batch.push(listing);
                }
            }
            run.completed += 1;

            let quota_met = quota_sources.iter().all(|source| {
                run.source_counts.get(source).copied().unwrap_or(0) >= MIN_JOBS_PER_SOURCE
            });
            if min_unique_jobs > 0 && run.listings.len() >= min_unique_jobs && quota_met {
                early_stop.store(true, Ordering::SeqCst);
            }

            (run.completed, total, run.listings.len())
        };

        // Callbacks run outside the lock so they cannot stall merging.
        if let Some(on_progress) = &options.on_progress {
            on_progress(progress.0, progress.1, progress.2);
        }
        if !new_batch.is_empty()
            && let Some(on_jobs_found) = &options.on_jobs_found
        {
            on_jobs_found(&new_batch);
        }
    }

    let state = state.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());

    if !state.source_counts.is_empty() {
        let mut counts: Vec<_> = state.source_counts.iter().collect();
        counts.sort_by_key(|(source, _)| (*source).clone());
        let summary = counts
            .iter()
            .map(|(source, count)| format!("{source}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(location = %options.location, %summary, "search source counts");

        let mut missing: Vec<_> = quota_sources
            .iter()
            .filter(|source| {
                state.source_counts.get(*source).copied().unwrap_or(0) < MIN_JOBS_PER_SOURCE
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            let missing_list = missing.join(", ");
            tracing::warn!(
                location = %options.location,
                sources = %missing_list,
                required = MIN_JOBS_PER_SOURCE,
                "provider quota not reached"
            );
        }
    }

    state.listings
}
