//! Flight-data provider abstraction
//!
//! The aggregator and the reference cache only talk to a [`QuoteProvider`]. The
//! wire types below mirror the provider's JSON closely enough to deserialize the
//! fields we use; anything else in the payload is ignored.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use super::{Country, Currency};

/// Errors reported by a provider call
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect failure, timeout)
    #[error("connection error: {0}")]
    Connection(Arc<reqwest::Error>),

    /// The response body was not the expected JSON
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// The configured endpoint cannot be turned into a request URL
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),
}

impl ProviderError {
    /// Only transport failures are worth retrying
    pub fn is_connection(&self) -> bool {
        matches!(self, ProviderError::Connection(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Connection(Arc::new(err))
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

/// Market, currency and locale that scope a provider query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketScope {
    pub market: String,
    pub currency: String,
    pub locale: String,
}

impl Default for MarketScope {
    fn default() -> Self {
        Self {
            market: "US".to_string(),
            currency: "USD".to_string(),
            locale: "en-US".to_string(),
        }
    }
}

/// One browse-quotes request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseQuery {
    pub scope: MarketScope,
    pub place_from: String,
    pub place_to: String,
    pub depart: NaiveDate,
    pub return_date: NaiveDate,
}

/// A place-lookup match
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaceRecord {
    pub place_id: String,
    pub place_name: String,
    pub country_name: String,
}

/// Browse-quotes response body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BrowseQuotes {
    #[serde(default)]
    pub quotes: Vec<QuoteCandidate>,
    #[serde(default)]
    pub carriers: Vec<Carrier>,
    #[serde(default)]
    pub currencies: Vec<Currency>,
}

/// A priced itinerary returned by browse-quotes
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteCandidate {
    pub min_price: f64,
    pub direct: bool,
    #[serde(default)]
    pub outbound_leg: Leg,
    #[serde(default)]
    pub inbound_leg: Leg,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Leg {
    #[serde(default)]
    pub carrier_ids: Vec<i64>,
}

/// Entry of the carrier directory included in browse-quotes responses
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Carrier {
    pub carrier_id: i64,
    pub name: String,
}

/// The four provider operations the system relies on
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Every country the provider knows about
    async fn list_countries(&self) -> Result<Vec<Country>, ProviderError>;

    /// Free-text place lookup scoped to a market
    async fn lookup_places(
        &self,
        scope: &MarketScope,
        query: &str,
    ) -> Result<Vec<PlaceRecord>, ProviderError>;

    /// Every currency the provider can price in
    async fn list_currencies(&self) -> Result<Vec<Currency>, ProviderError>;

    /// Cached quotes for one origin/destination/date tuple
    async fn browse_quotes(&self, query: &BrowseQuery) -> Result<BrowseQuotes, ProviderError>;
}
