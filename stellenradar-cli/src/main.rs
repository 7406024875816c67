//! Command line front end: fan a phrase list out over the configured job
//! sources and print the deduplicated listings.

#![expect(clippy::print_stdout, reason = "the result report is the program output")]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use stellenradar_core::{
    CombinedSearchProvider, Listing, SearchAllOptions, SearchProvider, search_all_queries,
};
use stellenradar_provider_bundesagentur::BundesagenturProvider;
use stellenradar_provider_serpapi::SerpApiProvider;

#[derive(Debug, Parser)]
#[command(name = "stellenradar", about = "Search job listings across sources.")]
struct Cli {
    /// Search phrases, each run as its own query.
    #[arg(required = true)]
    queries: Vec<String>,

    /// Target location, free text. Remote-only tokens widen the search.
    #[arg(long, default_value = "Berlin, Germany")]
    location: String,

    /// Result budget per query.
    #[arg(long, default_value_t = 10)]
    jobs_per_query: usize,

    /// Stop once this many unique listings exist. 0 runs every query to the
    /// end.
    #[arg(long, default_value_t = 50)]
    min_unique_jobs: usize,

    /// SerpApi key; when set, Google Jobs results are searched alongside the
    /// Bundesagentur registry.
    #[arg(long, env = "SERPAPI_KEY", hide_env_values = true)]
    serpapi_key: Option<String>,
}

/// Choose the active provider from the available credentials. The registry
/// needs none; Google Jobs joins the fan-out only when a key is present.
fn build_provider(serpapi_key: Option<&str>) -> Result<Arc<dyn SearchProvider>> {
    let registry = BundesagenturProvider::new()?;
    match serpapi_key {
        Some(key) if !key.trim().is_empty() => {
            let serpapi = SerpApiProvider::new(key)?;
            tracing::info!("searching Bundesagentur and Google Jobs");
            Ok(Arc::new(CombinedSearchProvider::new(vec![
                Arc::new(registry),
                Arc::new(serpapi),
            ])))
        }
        _ => {
            tracing::info!("no SerpApi key, searching Bundesagentur only");
            Ok(Arc::new(registry))
        }
    }
}

fn print_listing(index: usize, listing: &Listing) {
    println!("{index:>3}. {} - {} ({})", listing.title, listing.company_name, listing.location);
    if !listing.posted_at.is_empty() {
        println!("     posted: {}", listing.posted_at);
    }
    println!("     {}", listing.link);
    for option in &listing.apply_options {
        println!("     apply via {}: {}", option.source, option.url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let provider = build_provider(cli.serpapi_key.as_deref())?;

    let total = cli.queries.len();
    let options = SearchAllOptions {
        jobs_per_query: cli.jobs_per_query,
        location: cli.location.clone(),
        min_unique_jobs: cli.min_unique_jobs,
        on_progress: Some(Arc::new(move |completed, _, unique| {
            tracing::info!(completed, total, unique, "query finished");
        })),
        on_jobs_found: None,
    };

    let listings = search_all_queries(&cli.queries, provider, options).await;

    if listings.is_empty() {
        println!("No listings found.");
        return Ok(());
    }
    for (index, listing) in listings.iter().enumerate() {
        print_listing(index + 1, listing);
    }
    println!("\n{} unique listings.", listings.len());
    Ok(())
}
