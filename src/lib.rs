//! Listening-mood analytics: turns a play history and per-track audio
//! features into daily metrics, a personal baseline, and heuristic insights.
//!
//! The pipeline (`enrich` -> `aggregate` -> `baseline` -> `detect`) is pure
//! and deterministic; [`analysis::analyze`] runs it end to end.

pub mod analysis;
pub mod baseline;
pub mod config;
pub mod enrich;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod patterns;
pub mod persona;
pub mod report;
pub mod summary;

#[cfg(test)]
mod fixtures;

pub use analysis::{analyze, Analysis};
pub use baseline::baseline;
pub use enrich::enrich;
pub use metrics::aggregate;
pub use patterns::detect;
