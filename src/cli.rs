//! Command-line interface parsing for farewatch
//!
//! This module handles parsing of CLI arguments using clap: global provider
//! settings plus one subcommand per operation (bootstrap, reference listings,
//! and the cheapest-quote search).

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::aggregator::{
    AggregatorConfig, RetryConfig, SearchRequest, DEFAULT_DAY_RANGE, MAX_DAY_RANGE,
};
use crate::config::{Settings, API_KEY_ENV};
use crate::data::MarketScope;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A date argument is not in YYYY-MM-DD form
    #[error("Invalid date: '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The seed depart date is after the seed return date
    #[error("Depart date {depart} is after return date {return_date}")]
    DepartAfterReturn {
        depart: NaiveDate,
        return_date: NaiveDate,
    },

    /// Concurrency must allow at least one request
    #[error("Invalid concurrency: '{0}'. Expected a number of at least 1")]
    InvalidConcurrency(String),
}

/// Farewatch - find the cheapest airfare around your travel dates
#[derive(Parser, Debug)]
#[command(name = "farewatch")]
#[command(about = "Cheapest airfare quotes across a window of nearby travel dates")]
#[command(version)]
pub struct Cli {
    /// RapidAPI key for the flight-search provider (remembered for later runs)
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Directory for cached reference data
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Sales market code
    #[arg(long, default_value = "US", global = true)]
    pub market: String,

    /// Currency code prices are quoted in
    #[arg(long, default_value = "USD", global = true)]
    pub currency: String,

    /// Locale for provider queries
    #[arg(long, default_value = "en-US", global = true)]
    pub locale: String,

    /// Timeout for each provider request, in seconds
    #[arg(long, default_value_t = 10, global = true)]
    pub timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Populate the local reference data from the provider if it is missing
    Bootstrap,
    /// List known countries (markets)
    Countries,
    /// List known airports
    Airports,
    /// List known currencies
    Currencies,
    /// Find the cheapest quote for every date pair around the given dates
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Origin place id, e.g. SFO-sky
    #[arg(long = "from", value_name = "PLACE")]
    pub place_from: String,

    /// Destination place id, e.g. JFK-sky
    #[arg(long = "to", value_name = "PLACE")]
    pub place_to: String,

    /// Seed depart date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub depart: NaiveDate,

    /// Seed return date (YYYY-MM-DD)
    #[arg(long = "return", value_parser = parse_date_arg)]
    pub return_date: NaiveDate,

    /// Only consider direct flights
    #[arg(long)]
    pub direct_only: bool,

    /// Days to search before and after the seed dates
    #[arg(
        long,
        default_value_t = DEFAULT_DAY_RANGE,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_DAY_RANGE))
    )]
    pub day_range: u32,

    /// Retries per date pair after a connection failure
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Date-pair queries in flight at once
    #[arg(long, default_value_t = 1, value_parser = parse_concurrency_arg)]
    pub concurrency: usize,
}

/// Parses a YYYY-MM-DD date argument
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CliError::InvalidDate(s.to_string()))
}

fn parse_concurrency_arg(s: &str) -> Result<usize, CliError> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CliError::InvalidConcurrency(s.to_string())),
    }
}

impl Cli {
    /// Settings shared by every command
    pub fn settings(&self) -> Settings {
        Settings {
            api_key: self.api_key.clone(),
            data_dir: self.data_dir.clone(),
            scope: self.scope(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn scope(&self) -> MarketScope {
        MarketScope {
            market: self.market.clone(),
            currency: self.currency.clone(),
            locale: self.locale.clone(),
        }
    }
}

impl SearchArgs {
    /// Builds the search request, rejecting a depart date after the return date
    pub fn to_request(&self, scope: MarketScope) -> Result<SearchRequest, CliError> {
        if self.depart > self.return_date {
            return Err(CliError::DepartAfterReturn {
                depart: self.depart,
                return_date: self.return_date,
            });
        }
        Ok(SearchRequest {
            scope,
            place_from: self.place_from.clone(),
            place_to: self.place_to.clone(),
            depart: self.depart,
            return_date: self.return_date,
            direct_only: self.direct_only,
            day_range: self.day_range,
        })
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            retry: RetryConfig {
                max_retries: self.retries,
                ..RetryConfig::default()
            },
            concurrency: self.concurrency,
        }
    }
}
