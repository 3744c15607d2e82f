//! Local persistence for reference data
//!
//! Countries, airports, currencies and the stored API profile each live in their
//! own JSON collection file under the data directory.

mod store;

pub use store::{DocumentStore, StoreError};
