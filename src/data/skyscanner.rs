//! RapidAPI flight-search client
//!
//! Implements [`QuoteProvider`] over the provider's reference, autosuggest and
//! browse-quotes endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::provider::{BrowseQuery, BrowseQuotes, MarketScope, PlaceRecord, ProviderError, QuoteProvider};
use super::{Country, Currency};

/// Base URL of the provider's API services
const DEFAULT_BASE_URL: &str =
    "https://skyscanner-skyscanner-flight-search-v1.p.rapidapi.com/apiservices";

/// Value of the `x-rapidapi-host` header
const DEFAULT_HOST: &str = "skyscanner-skyscanner-flight-search-v1.p.rapidapi.com";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Date format used in browse-quotes paths
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Connection settings for [`SkyscannerClient`]
#[derive(Debug, Clone)]
pub struct SkyscannerConfig {
    /// Static RapidAPI credential
    pub api_key: String,
    pub base_url: String,
    pub host: String,
    pub timeout: Duration,
    /// Locale for the country list endpoint
    pub locale: String,
}

impl SkyscannerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
            locale: "en-US".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CountriesResponse {
    countries: Vec<Country>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlacesResponse {
    #[serde(default)]
    places: Vec<PlaceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CurrenciesResponse {
    currencies: Vec<Currency>,
}

/// HTTP client for the flight-search provider
#[derive(Debug, Clone)]
pub struct SkyscannerClient {
    http: Client,
    config: SkyscannerConfig,
}

impl SkyscannerClient {
    pub fn new(config: SkyscannerConfig) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Builds an endpoint URL, percent-encoding each path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", self.config.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        debug!(url = %url, "provider request");

        let response = self
            .http
            .get(url)
            .query(query)
            .header("x-rapidapi-host", &self.config.host)
            .header("x-rapidapi-key", &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl QuoteProvider for SkyscannerClient {
    async fn list_countries(&self) -> Result<Vec<Country>, ProviderError> {
        let url = self.endpoint(&["reference", "v1.0", "countries", &self.config.locale])?;
        let response: CountriesResponse = self.get_json(url, &[]).await?;
        Ok(response.countries)
    }

    async fn lookup_places(
        &self,
        scope: &MarketScope,
        query: &str,
    ) -> Result<Vec<PlaceRecord>, ProviderError> {
        let url = self.endpoint(&[
            "autosuggest",
            "v1.0",
            &scope.market,
            &scope.currency,
            &scope.locale,
            "",
        ])?;
        let response: PlacesResponse = self.get_json(url, &[("query", query)]).await?;
        Ok(response.places)
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, ProviderError> {
        let url = self.endpoint(&["reference", "v1.0", "currencies"])?;
        let response: CurrenciesResponse = self.get_json(url, &[]).await?;
        Ok(response.currencies)
    }

    async fn browse_quotes(&self, query: &BrowseQuery) -> Result<BrowseQuotes, ProviderError> {
        let depart = query.depart.format(DATE_FORMAT).to_string();
        let return_date = query.return_date.format(DATE_FORMAT).to_string();
        let url = self.endpoint(&[
            "browsequotes",
            "v1.0",
            &query.scope.market,
            &query.scope.currency,
            &query.scope.locale,
            &query.place_from,
            &query.place_to,
            &depart,
            &return_date,
        ])?;
        self.get_json(url, &[]).await
    }
}
