//! End-to-end tests against a mocked provider
//!
//! Bootstraps reference data into a temporary store, then runs searches through
//! the real HTTP client.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

use farewatch::aggregator::{AggregatorConfig, QuoteAggregator, SearchRequest, DATE_NOT_AVAILABLE};
use farewatch::cache::DocumentStore;
use farewatch::clock::{Clock, ManualClock};
use farewatch::data::{MarketScope, QuoteProvider, SkyscannerClient, SkyscannerConfig};
use farewatch::rate_limit::{RateLimitConfig, RateLimiter};
use farewatch::reference::{ReferenceDataCache, AIRPORTS};

const BROWSE_BODY: &str = r#"{
    "Quotes": [
        {"MinPrice": 120.0, "Direct": false, "OutboundLeg": {"CarrierIds": [2]}, "InboundLeg": {"CarrierIds": [2]}},
        {"MinPrice": 90.0, "Direct": false, "OutboundLeg": {"CarrierIds": [1]}, "InboundLeg": {"CarrierIds": [3]}},
        {"MinPrice": 150.0, "Direct": true, "OutboundLeg": {"CarrierIds": [2]}, "InboundLeg": {"CarrierIds": [2]}}
    ],
    "Carriers": [
        {"CarrierId": 1, "Name": "Alpha Air"},
        {"CarrierId": 2, "Name": "Beta Jet"},
        {"CarrierId": 3, "Name": "Gamma Wings"}
    ],
    "Currencies": [{"Code": "USD", "Symbol": "$"}]
}"#;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn provider(server: &MockServer) -> Arc<dyn QuoteProvider> {
    let config = SkyscannerConfig::new("it-key")
        .with_base_url(format!("{}/apiservices", server.base_url()))
        .with_timeout(Duration::from_secs(2));
    Arc::new(SkyscannerClient::new(config).unwrap())
}

fn reference_cache(server: &MockServer, dir: &TempDir, clock: Arc<dyn Clock>) -> ReferenceDataCache {
    ReferenceDataCache::new(
        provider(server),
        DocumentStore::with_dir(dir.path().to_path_buf()),
        RateLimiter::new(RateLimitConfig::default(), clock),
        MarketScope::default(),
    )
}

fn request(depart: &str, return_date: &str, day_range: u32, direct_only: bool) -> SearchRequest {
    SearchRequest {
        scope: MarketScope::default(),
        place_from: "SFO-sky".to_string(),
        place_to: "JFK-sky".to_string(),
        depart: date(depart),
        return_date: date(return_date),
        direct_only,
        day_range,
    }
}

#[tokio::test]
async fn test_bootstrap_persists_reference_data_once() {
    let server = MockServer::start_async().await;
    let countries = server
        .mock_async(|when, then| {
            when.method(GET).path("/apiservices/reference/v1.0/countries/en-US");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"Countries": [{"Code": "FR", "Name": "France"}]}"#);
        })
        .await;
    let places = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/apiservices/autosuggest/v1.0/US/USD/en-US/")
                .query_param("query", "France");
            then.status(200).header("content-type", "application/json").body(
                r#"{"Places": [
                    {"PlaceId": "CDG-sky", "PlaceName": "Paris Charles de Gaulle", "CountryName": "France"},
                    {"PlaceId": "PARI-sky", "PlaceName": "Paris", "CountryName": "France"},
                    {"PlaceId": "FRA-sky", "PlaceName": "Frankfurt", "CountryName": "Germany"}
                ]}"#,
            );
        })
        .await;
    let currencies = server
        .mock_async(|when, then| {
            when.method(GET).path("/apiservices/reference/v1.0/currencies");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"Currencies": [{"Code": "EUR", "Symbol": "€"}, {"Code": "USD", "Symbol": "$"}]}"#);
        })
        .await;

    let dir = TempDir::new().unwrap();
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(date("2026-06-01")));

    let data = reference_cache(&server, &dir, Arc::clone(&clock))
        .bootstrap()
        .await
        .unwrap();

    assert_eq!(data.countries.len(), 1);
    assert_eq!(data.airports.len(), 1);
    assert_eq!(data.airports[0].iata, "CDG");
    assert_eq!(data.currencies.len(), 2);

    let stored: Vec<Value> = DocumentStore::with_dir(dir.path().to_path_buf())
        .read_all(AIRPORTS)
        .unwrap();
    assert_eq!(
        stored,
        vec![json!({"PlaceName": "Paris Charles de Gaulle", "CountryName": "France", "Iata": "CDG"})]
    );

    // A fresh cache over the same store makes no provider calls
    let again = reference_cache(&server, &dir, clock).bootstrap().await.unwrap();
    assert_eq!(again, data);
    countries.assert_hits_async(1).await;
    places.assert_hits_async(1).await;
    currencies.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_bootstrap_failure_carries_provider_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/apiservices/reference/v1.0/countries/en-US");
            then.status(403).body(r#"{"message":"You are not subscribed to this API."}"#);
        })
        .await;

    let dir = TempDir::new().unwrap();
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(date("2026-06-01")));

    let err = reference_cache(&server, &dir, clock).bootstrap().await.unwrap_err();

    assert_eq!(
        err.provider_diagnostic(),
        Some(r#"{"message":"You are not subscribed to this API."}"#)
    );
}

#[tokio::test]
async fn test_search_single_pair_json_shape() {
    let server = MockServer::start_async().await;
    let browse = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/apiservices/browsequotes/v1.0/US/USD/en-US/SFO-sky/JFK-sky/2026-07-10/2026-07-17");
            then.status(200).header("content-type", "application/json").body(BROWSE_BODY);
        })
        .await;

    let clock = Arc::new(ManualClock::new(date("2026-06-01")));
    let aggregator = QuoteAggregator::new(provider(&server), clock, AggregatorConfig::default());

    let batch = aggregator.search(&request("2026-07-10", "2026-07-17", 0, false)).await;

    browse.assert_async().await;
    assert_eq!(
        serde_json::to_value(&batch).unwrap(),
        json!({
            "flight_info_group": [{
                "status": "OK",
                "price": "$90",
                "carriers": ["Alpha Air", "Gamma Wings"],
                "is_direct": false,
                "place_from": "SFO-sky",
                "place_to": "JFK-sky",
                "depart": "2026-07-10",
                "return": "2026-07-17"
            }]
        })
    );
}

#[tokio::test]
async fn test_search_direct_only_picks_direct_flight() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/browsequotes/");
            then.status(200).header("content-type", "application/json").body(BROWSE_BODY);
        })
        .await;

    let clock = Arc::new(ManualClock::new(date("2026-06-01")));
    let aggregator = QuoteAggregator::new(provider(&server), clock, AggregatorConfig::default());

    let batch = aggregator.search(&request("2026-07-10", "2026-07-17", 0, true)).await;

    let quote = &batch.quotes[0];
    assert_eq!(quote.price.as_deref(), Some("$150"));
    assert_eq!(quote.carriers, Some(vec!["Beta Jet".to_string()]));
}

#[tokio::test]
async fn test_search_window_skips_inverted_pairs() {
    let server = MockServer::start_async().await;
    let browse = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/browsequotes/");
            then.status(200).header("content-type", "application/json").body(BROWSE_BODY);
        })
        .await;

    let clock = Arc::new(ManualClock::new(date("2026-06-01")));
    let config = AggregatorConfig {
        concurrency: 3,
        ..AggregatorConfig::default()
    };
    let aggregator = QuoteAggregator::new(provider(&server), clock, config);

    let batch = aggregator.search(&request("2026-07-10", "2026-07-10", 1, false)).await;

    assert_eq!(batch.len(), 9);
    let inverted: Vec<(NaiveDate, NaiveDate)> = batch
        .quotes
        .iter()
        .filter(|q| q.message.as_deref() == Some(DATE_NOT_AVAILABLE))
        .map(|q| (q.depart, q.return_date))
        .collect();
    assert_eq!(
        inverted,
        vec![
            (date("2026-07-10"), date("2026-07-09")),
            (date("2026-07-11"), date("2026-07-09")),
            (date("2026-07-11"), date("2026-07-10")),
        ]
    );
    browse.assert_hits_async(6).await;
}

#[tokio::test]
async fn test_search_provider_error_is_contained() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/browsequotes/");
            then.status(429).body(r#"{"message":"Too many requests"}"#);
        })
        .await;

    let clock = Arc::new(ManualClock::new(date("2026-06-01")));
    let aggregator = QuoteAggregator::new(provider(&server), clock, AggregatorConfig::default());

    let batch = aggregator.search(&request("2026-07-10", "2026-07-17", 0, false)).await;

    assert_eq!(
        serde_json::to_value(&batch).unwrap(),
        json!({
            "flight_info_group": [{
                "status": "ERROR",
                "depart": "2026-07-10",
                "return": "2026-07-17",
                "message": "Error returned from provider"
            }]
        })
    );
}
