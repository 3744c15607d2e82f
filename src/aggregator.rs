//! Cheapest-quote search across a window of nearby travel dates
//!
//! A search expands the seed dates into a [`DateWindow`], issues one browse-quotes
//! call per (depart, return) combination and reduces each response to a single
//! [`Quote`]. Failures stay local to their date pair: the batch always contains
//! one quote per pair.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::data::provider::{Carrier, QuoteCandidate};
use crate::data::{
    BrowseQuery, BrowseQuotes, CheapQuoteBatch, DirectFlag, MarketScope, ProviderError,
    Quote, QuoteProvider, QuoteStatus,
};
use crate::window::DateWindow;

/// Message for pairs whose depart date is after the return date
pub const DATE_NOT_AVAILABLE: &str = "Date not available";

/// Message for pairs the provider rejected
pub const PROVIDER_ERROR: &str = "Error returned from provider";

/// Message for pairs whose request never reached the provider
pub const CONNECTION_ERROR: &str = "Connection error";

/// Days searched on each side of the seed dates when none is given
pub const DEFAULT_DAY_RANGE: u32 = 1;

/// Largest day range accepted from the command line
pub const MAX_DAY_RANGE: u32 = 30;

/// Parameters of one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub scope: MarketScope,
    pub place_from: String,
    pub place_to: String,
    pub depart: NaiveDate,
    pub return_date: NaiveDate,
    /// Skip candidates that are not direct flights
    pub direct_only: bool,
    pub day_range: u32,
}

/// Backoff settings for retrying connection failures
///
/// Non-success statuses are well-formed rejections and are never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    pub retry: RetryConfig,
    /// Date-pair queries in flight at once
    pub concurrency: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            concurrency: 1,
        }
    }
}

/// Cheapest surviving candidate of one browse-quotes response
#[derive(Debug, Clone, PartialEq)]
pub struct Cheapest {
    pub price: f64,
    pub direct: bool,
    /// Outbound and inbound carrier ids, deduplicated
    pub carrier_ids: BTreeSet<i64>,
}

/// Picks the minimum-price candidate
///
/// Non-direct candidates are skipped when `direct_only` is set. Only a strictly
/// lower price replaces the current minimum, so the first of equally cheap
/// candidates is kept.
pub fn select_cheapest(candidates: &[QuoteCandidate], direct_only: bool) -> Option<Cheapest> {
    let mut best: Option<Cheapest> = None;

    for candidate in candidates {
        if direct_only && !candidate.direct {
            continue;
        }
        let is_lower = best
            .as_ref()
            .map_or(true, |b| candidate.min_price < b.price);
        if is_lower {
            best = Some(Cheapest {
                price: candidate.min_price,
                direct: candidate.direct,
                carrier_ids: candidate
                    .outbound_leg
                    .carrier_ids
                    .iter()
                    .chain(candidate.inbound_leg.carrier_ids.iter())
                    .copied()
                    .collect(),
            });
        }
    }

    best
}

/// Looks up display names for `ids`, in directory order
///
/// Scanning stops as soon as every id has been matched.
pub fn resolve_carrier_names(directory: &[Carrier], ids: &BTreeSet<i64>) -> Vec<String> {
    let mut names = Vec::with_capacity(ids.len());
    for carrier in directory {
        if names.len() == ids.len() {
            break;
        }
        if ids.contains(&carrier.carrier_id) {
            names.push(carrier.name.clone());
        }
    }
    names
}

/// Runs searches against a [`QuoteProvider`]
pub struct QuoteAggregator {
    provider: Arc<dyn QuoteProvider>,
    clock: Arc<dyn Clock>,
    config: AggregatorConfig,
}

impl QuoteAggregator {
    pub fn new(provider: Arc<dyn QuoteProvider>, clock: Arc<dyn Clock>, config: AggregatorConfig) -> Self {
        Self {
            provider,
            clock,
            config,
        }
    }

    /// Searches every depart/return combination of the request's date window
    ///
    /// Quotes come back depart-major: outer order over depart dates, inner over
    /// return dates, both ascending.
    pub async fn search(&self, request: &SearchRequest) -> CheapQuoteBatch {
        let window = DateWindow::expand(
            request.depart,
            request.return_date,
            request.day_range,
            self.clock.today(),
        );
        info!(
            from = %request.place_from,
            to = %request.place_to,
            departs = window.departs().len(),
            returns = window.returns().len(),
            pairs = window.pair_count(),
            "searching date window"
        );

        let quotes = stream::iter(window.pairs())
            .map(|(depart, return_date)| self.cheapest_quote_for(request, depart, return_date))
            .buffered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        CheapQuoteBatch { quotes }
    }

    /// Cheapest quote for a single date pair
    pub async fn cheapest_quote_for(
        &self,
        request: &SearchRequest,
        depart: NaiveDate,
        return_date: NaiveDate,
    ) -> Quote {
        if depart > return_date {
            return Quote::with_message(QuoteStatus::Ok, DATE_NOT_AVAILABLE, depart, return_date);
        }

        let query = BrowseQuery {
            scope: request.scope.clone(),
            place_from: request.place_from.clone(),
            place_to: request.place_to.clone(),
            depart,
            return_date,
        };

        match self.browse_with_retry(&query).await {
            Ok(response) => build_quote(&response, request, depart, return_date),
            Err(err) if err.is_connection() => {
                warn!(%depart, %return_date, error = %err, "provider unreachable");
                Quote::with_message(QuoteStatus::Error, CONNECTION_ERROR, depart, return_date)
            }
            Err(err) => {
                warn!(%depart, %return_date, error = %err, "provider rejected quote request");
                Quote::with_message(QuoteStatus::Error, PROVIDER_ERROR, depart, return_date)
            }
        }
    }

    async fn browse_with_retry(&self, query: &BrowseQuery) -> Result<BrowseQuotes, ProviderError> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match self.provider.browse_quotes(query).await {
                Err(err) if err.is_connection() && attempt < retry.max_retries => {
                    let delay = retry.backoff(attempt);
                    debug!(attempt = attempt + 1, ?delay, "retrying after connection error");
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn build_quote(
    response: &BrowseQuotes,
    request: &SearchRequest,
    depart: NaiveDate,
    return_date: NaiveDate,
) -> Quote {
    let cheapest = select_cheapest(&response.quotes, request.direct_only);

    let (price, carriers, is_direct) = match cheapest {
        Some(best) => {
            let symbol = response
                .currencies
                .first()
                .map(|c| c.symbol.as_str())
                .unwrap_or_default();
            (
                Some(format!("{}{}", symbol, best.price)),
                resolve_carrier_names(&response.carriers, &best.carrier_ids),
                DirectFlag::from(best.direct),
            )
        }
        None => (None, Vec::new(), DirectFlag::Unknown),
    };

    Quote {
        status: QuoteStatus::Ok,
        price,
        carriers: Some(carriers),
        is_direct: Some(is_direct),
        place_from: Some(request.place_from.clone()),
        place_to: Some(request.place_to.clone()),
        depart,
        return_date,
        message: None,
    }
}
