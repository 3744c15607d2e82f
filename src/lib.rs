//! Farewatch library
//!
//! Exposes the reference-data cache, date-window expansion and quote
//! aggregation so the binary and integration tests share one implementation.

pub mod aggregator;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod logging;
pub mod rate_limit;
pub mod reference;
pub mod window;
