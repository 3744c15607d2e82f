//! Core data models for farewatch
//!
//! Reference records (countries, airports, currencies) are persisted with the
//! provider's own field names. Quotes are produced per search and never stored.

pub mod provider;
pub mod skyscanner;

pub use provider::{
    BrowseQuery, BrowseQuotes, MarketScope, PlaceRecord, ProviderError, QuoteProvider,
};
pub use skyscanner::{SkyscannerClient, SkyscannerConfig};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// A country known to the provider, unique by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Country {
    /// Market code, e.g. "US"
    #[serde(default)]
    pub code: String,
    /// Display name used for place lookups
    pub name: String,
}

/// An airport resolved from a country's place lookup, unique by IATA code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Airport {
    pub place_name: String,
    pub country_name: String,
    /// Always three characters
    pub iata: String,
}

/// A currency, unique by ISO code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Currency {
    pub code: String,
    pub symbol: String,
}

/// Outcome of a single date-pair query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuoteStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Whether the cheapest surviving candidate is a direct flight
///
/// Serializes as a JSON boolean, or `"N/A"` when no candidate survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectFlag {
    Direct,
    Indirect,
    Unknown,
}

impl From<bool> for DirectFlag {
    fn from(direct: bool) -> Self {
        if direct {
            DirectFlag::Direct
        } else {
            DirectFlag::Indirect
        }
    }
}

impl Serialize for DirectFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DirectFlag::Direct => serializer.serialize_bool(true),
            DirectFlag::Indirect => serializer.serialize_bool(false),
            DirectFlag::Unknown => serializer.serialize_str("N/A"),
        }
    }
}

/// Cheapest quote found for one (depart, return) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub status: QuoteStatus,
    /// Currency symbol immediately followed by the amount, e.g. "$90"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Carrier display names, in the provider's directory order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carriers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_direct: Option<DirectFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_to: Option<String>,
    pub depart: NaiveDate,
    #[serde(rename = "return")]
    pub return_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Quote {
    /// A quote carrying only a status and a diagnostic message
    pub fn with_message(
        status: QuoteStatus,
        message: impl Into<String>,
        depart: NaiveDate,
        return_date: NaiveDate,
    ) -> Self {
        Self {
            status,
            price: None,
            carriers: None,
            is_direct: None,
            place_from: None,
            place_to: None,
            depart,
            return_date,
            message: Some(message.into()),
        }
    }
}

/// Quotes for every date pair of a search, depart-major
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheapQuoteBatch {
    #[serde(rename = "flight_info_group")]
    pub quotes: Vec<Quote>,
}

impl CheapQuoteBatch {
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
