//! Farewatch - cheapest airfare quotes around a pair of travel dates
//!
//! Bootstraps the local reference data on every start, then runs the
//! requested command and prints its result as JSON on stdout.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, error};

use farewatch::aggregator::QuoteAggregator;
use farewatch::cli::{Cli, Command};
use farewatch::clock::{Clock, SystemClock};
use farewatch::config::resolve_api_key;
use farewatch::data::{QuoteProvider, SkyscannerClient, SkyscannerConfig};
use farewatch::logging;
use farewatch::rate_limit::{RateLimitConfig, RateLimiter};
use farewatch::reference::ReferenceDataCache;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = cli.settings();
    // Reject bad search dates before touching the provider
    let search = match &cli.command {
        Command::Search(args) => Some((args.to_request(settings.scope.clone())?, args.aggregator_config())),
        _ => None,
    };

    let store = settings.store()?;
    debug!(dir = %store.dir().display(), "using reference store");
    let api_key = resolve_api_key(&store, settings.api_key.as_deref())?;

    let provider: Arc<dyn QuoteProvider> = Arc::new(SkyscannerClient::new(
        SkyscannerConfig::new(api_key)
            .with_timeout(settings.timeout)
            .with_locale(settings.scope.locale.clone()),
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = RateLimiter::new(RateLimitConfig::default(), Arc::clone(&clock));
    let cache = ReferenceDataCache::new(
        Arc::clone(&provider),
        store,
        limiter,
        settings.scope.clone(),
    );

    if let Err(e) = cache.bootstrap().await {
        error!(error = %e, "reference data bootstrap failed");
        if let Some(body) = e.provider_diagnostic() {
            eprintln!("{}", pretty_diagnostic(body));
        }
        return Err(e.into());
    }

    if let Some((request, config)) = search {
        let aggregator = QuoteAggregator::new(provider, clock, config);
        return print_json(&aggregator.search(&request).await);
    }

    match cli.command {
        Command::Countries => print_json(&cache.countries().await),
        Command::Airports => print_json(&cache.airports().await),
        Command::Currencies => print_json(&cache.currencies().await),
        Command::Bootstrap | Command::Search(_) => print_json(&cache.snapshot().await),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Re-indents a JSON error body, passing anything else through
fn pretty_diagnostic(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| body.to_string())
}
