//! SolarCost Analyzer library
//!
//! Time-of-use cost analysis for solar households: interval readings are
//! classified into billing periods, priced, aggregated into a usage summary,
//! and turned into recommendations.

pub mod analysis;
pub mod core;
pub mod db;
pub mod ingest;
pub mod pricing;
pub mod report;
