//! Locally cached reference data: countries, airports and currencies
//!
//! The cache is constructed once at startup and bootstrapped explicitly. Each
//! collection is loaded from the [`DocumentStore`] when present and fetched from
//! the provider only when the local copy is empty.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{DocumentStore, StoreError};
use crate::data::{Airport, Country, Currency, MarketScope, PlaceRecord, ProviderError, QuoteProvider};
use crate::rate_limit::RateLimiter;

/// Collection holding [`Country`] records
pub const COUNTRIES: &str = "countries";
/// Collection holding [`Airport`] records
pub const AIRPORTS: &str = "airports";
/// Collection holding [`Currency`] records
pub const CURRENCIES: &str = "currencies";

/// Place identifiers of exactly this length denote an airport ("LHR-sky")
const AIRPORT_PLACE_ID_LEN: usize = 7;

/// Length of an IATA code
const IATA_LEN: usize = 3;

/// Errors that abort a bootstrap
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A reference-data call to the provider did not succeed
    #[error("provider call {operation} failed: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: ProviderError,
    },

    /// Reading or writing the local store failed
    #[error("reference store error: {0}")]
    Store(#[from] StoreError),
}

impl BootstrapError {
    fn provider(operation: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| BootstrapError::Provider { operation, source }
    }

    /// Raw response body returned by the provider, when there was one
    pub fn provider_diagnostic(&self) -> Option<&str> {
        match self {
            BootstrapError::Provider {
                source: ProviderError::Status { body, .. },
                ..
            } => Some(body),
            _ => None,
        }
    }
}

/// All reference data as last loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceData {
    pub countries: Vec<Country>,
    pub airports: Vec<Airport>,
    pub currencies: Vec<Currency>,
}

/// Sole owner and writer of the Country, Airport and Currency collections
///
/// The in-memory snapshot sits behind a read/write lock. Bootstrap holds the
/// write lock for its whole run, so readers see either the state before it or
/// the state after it.
pub struct ReferenceDataCache {
    provider: Arc<dyn QuoteProvider>,
    store: DocumentStore,
    limiter: RateLimiter,
    scope: MarketScope,
    snapshot: RwLock<ReferenceData>,
}

impl ReferenceDataCache {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        store: DocumentStore,
        limiter: RateLimiter,
        scope: MarketScope,
    ) -> Self {
        Self {
            provider,
            store,
            limiter,
            scope,
            snapshot: RwLock::new(ReferenceData::default()),
        }
    }

    /// Loads or fetches every collection, in dependency order
    pub async fn bootstrap(&self) -> Result<ReferenceData, BootstrapError> {
        let mut snapshot = self.snapshot.write().await;

        let countries = self.countries_from_store_or_provider().await?;
        info!(count = countries.len(), "got country information");

        let names: Vec<String> = countries.iter().map(|c| c.name.clone()).collect();
        let airports = self.airports_from_store_or_provider(&names).await?;
        info!(count = airports.len(), "got airport information");

        let currencies = self.currencies_from_store_or_provider().await?;
        info!(count = currencies.len(), "got currency information");

        *snapshot = ReferenceData {
            countries,
            airports,
            currencies,
        };
        Ok((*snapshot).clone())
    }

    /// Returns persisted countries, fetching and storing them on first run
    pub async fn load_or_bootstrap_countries(&self) -> Result<Vec<Country>, BootstrapError> {
        let mut snapshot = self.snapshot.write().await;
        let countries = self.countries_from_store_or_provider().await?;
        snapshot.countries = countries.clone();
        Ok(countries)
    }

    /// Returns persisted airports, resolving them per country on first run
    pub async fn load_or_bootstrap_airports(
        &self,
        country_names: &[String],
    ) -> Result<Vec<Airport>, BootstrapError> {
        let mut snapshot = self.snapshot.write().await;
        let airports = self.airports_from_store_or_provider(country_names).await?;
        snapshot.airports = airports.clone();
        Ok(airports)
    }

    /// Returns persisted currencies, fetching and storing them on first run
    pub async fn load_or_bootstrap_currencies(&self) -> Result<Vec<Currency>, BootstrapError> {
        let mut snapshot = self.snapshot.write().await;
        let currencies = self.currencies_from_store_or_provider().await?;
        snapshot.currencies = currencies.clone();
        Ok(currencies)
    }

    pub async fn snapshot(&self) -> ReferenceData {
        self.snapshot.read().await.clone()
    }

    pub async fn countries(&self) -> Vec<Country> {
        self.snapshot.read().await.countries.clone()
    }

    pub async fn airports(&self) -> Vec<Airport> {
        self.snapshot.read().await.airports.clone()
    }

    pub async fn currencies(&self) -> Vec<Currency> {
        self.snapshot.read().await.currencies.clone()
    }

    async fn countries_from_store_or_provider(&self) -> Result<Vec<Country>, BootstrapError> {
        let stored: Vec<Country> = self.store.read_all(COUNTRIES)?;
        if !stored.is_empty() {
            return Ok(stored);
        }

        info!("getting country information from provider");
        self.limiter.acquire().await;
        let countries = self
            .provider
            .list_countries()
            .await
            .map_err(BootstrapError::provider("list_countries"))?;
        self.store.insert_many(COUNTRIES, &countries)?;
        Ok(countries)
    }

    async fn airports_from_store_or_provider(
        &self,
        country_names: &[String],
    ) -> Result<Vec<Airport>, BootstrapError> {
        let stored: Vec<Airport> = self.store.read_all(AIRPORTS)?;
        if !stored.is_empty() {
            return Ok(stored);
        }

        info!(countries = country_names.len(), "getting airport information from provider");
        let mut resolved: Vec<Airport> = Vec::new();
        for (i, name) in country_names.iter().enumerate() {
            self.limiter.acquire().await;
            let places = self
                .provider
                .lookup_places(&self.scope, name)
                .await
                .map_err(BootstrapError::provider("lookup_places"))?;

            let airports: Vec<Airport> = places
                .iter()
                .filter_map(|place| airport_from_place(place, name))
                .collect();
            debug!(
                country = %name,
                progress = i + 1,
                total = country_names.len(),
                airports = airports.len(),
                "resolved places"
            );

            for airport in airports {
                upsert_by_key(&mut resolved, airport, |a: &Airport| a.iata.clone());
            }
        }

        // Nothing is persisted until every lookup has succeeded
        self.store.insert_many(AIRPORTS, &resolved)?;
        Ok(resolved)
    }

    async fn currencies_from_store_or_provider(&self) -> Result<Vec<Currency>, BootstrapError> {
        let stored: Vec<Currency> = self.store.read_all(CURRENCIES)?;
        if !stored.is_empty() {
            return Ok(stored);
        }

        info!("getting currency information from provider");
        let currencies = self
            .provider
            .list_currencies()
            .await
            .map_err(BootstrapError::provider("list_currencies"))?;
        let mut unique: Vec<Currency> = Vec::with_capacity(currencies.len());
        for currency in currencies {
            upsert_by_key(&mut unique, currency, |c: &Currency| c.code.clone());
        }
        self.store.insert_many(CURRENCIES, &unique)?;
        Ok(unique)
    }
}

/// Replaces the record sharing `record`'s key, or appends it
fn upsert_by_key<T, K, F>(records: &mut Vec<T>, record: T, key: F)
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let wanted = key(&record);
    match records.iter_mut().find(|r| key(&**r) == wanted) {
        Some(slot) => *slot = record,
        None => records.push(record),
    }
}

/// Keeps only airport-level places located in the queried country
///
/// A country-name lookup also matches homonymous places abroad, so the
/// returned country must equal the query exactly.
fn airport_from_place(place: &PlaceRecord, country_name: &str) -> Option<Airport> {
    if place.place_id.chars().count() != AIRPORT_PLACE_ID_LEN || place.country_name != country_name {
        return None;
    }
    Some(Airport {
        place_name: place.place_name.clone(),
        country_name: place.country_name.clone(),
        iata: place.place_id.chars().take(IATA_LEN).collect(),
    })
}
