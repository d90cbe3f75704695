// src/config/mod.rs
//! Runtime configuration: scoring constants, session policies and the similarity oracle.

pub mod oracle;
pub mod scoring;

pub use oracle::OracleConfig;
pub use scoring::{AggregationPolicy, ContinuePolicy, ScoringConfig};
