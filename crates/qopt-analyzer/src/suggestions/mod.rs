//! Query Analysis Suggestions Module
//!
//! Identifies full table scans, missing indexes, expensive joins and large
//! sorts in a query plan and turns them into actionable recommendations.

mod analyzer;

pub use analyzer::*;
