//! fxreshape core: daily forex archive ingestion and series loading.
//!
//! - Domain types (bars, raw rows, instrument pip factors)
//! - Archive fetcher over a pluggable source (Forexite by default)
//! - Reshape engine fanning daily archives into per-instrument files
//! - Memoized series loader with timezone correction and resampling
//! - Trend overlay indicators and their cache

pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;

pub use config::{ConfigError, PipelineConfig};
