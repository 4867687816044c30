//! QueryOptim Analyzer - Query plans, EXPLAIN parsing and optimization hints
//!
//! This crate provides functionality for:
//! - A unified query plan tree model
//! - Parsing PostgreSQL `EXPLAIN (FORMAT JSON)` output
//! - Detecting plan problems and recommending indexes
//! - The `AnalysisResult` handed from a backend to the workbench

pub mod explain;
pub mod fixture;
pub mod result;
pub mod suggestions;

pub use explain::*;
pub use fixture::{DEMO_QUERY, demo_plan, demo_result};
pub use result::*;
pub use suggestions::*;
