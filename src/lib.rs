//! Forum search
//!
//! Keeps an Elasticsearch index in step with a forum's discussions and
//! comments, and answers relevance queries against it.
//!
//! - [`indexing`]: resumable windowed bulk scans and event-driven sync
//! - [`search`]: query building, engine clients and result merging
//! - [`seeders`]: per-content-type conversion of forum rows into documents
//! - [`state`]: forum store and checkpoint store seams

pub mod config;
pub mod error;
pub mod indexing;
pub mod models;
pub mod search;
pub mod seeders;
pub mod state;
pub mod telemetry;

pub use error::{AppError, Result};
