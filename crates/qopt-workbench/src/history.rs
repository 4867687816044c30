//! Analysis history

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use uuid::Uuid;

/// A single completed analysis
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisHistoryEntry {
    /// Unique identifier
    pub id: Uuid,

    /// The submitted SQL, verbatim
    pub sql: String,

    /// When the analysis finished
    pub analyzed_at: DateTime<Utc>,

    /// Time from submit to completion in milliseconds
    pub duration_ms: u64,

    /// Planner cost of the analyzed query
    pub cost_estimate: Option<f64>,

    /// Error message if failed
    pub error: Option<String>,
}

impl AnalysisHistoryEntry {
    pub fn success(sql: String, duration_ms: u64, cost_estimate: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sql,
            analyzed_at: Utc::now(),
            duration_ms,
            cost_estimate: Some(cost_estimate),
            error: None,
        }
    }

    pub fn failure(sql: String, duration_ms: u64, error: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sql,
            analyzed_at: Utc::now(),
            duration_ms,
            cost_estimate: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Bounded analysis history, most recent first
#[derive(Debug)]
pub struct AnalysisHistory {
    entries: VecDeque<AnalysisHistoryEntry>,
    max_entries: usize,
}

impl AnalysisHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn add(&mut self, entry: AnalysisHistoryEntry) {
        tracing::debug!(
            entry_id = %entry.id,
            success = entry.is_success(),
            duration_ms = entry.duration_ms,
            "adding analysis to history"
        );
        self.entries.push_front(entry);
        self.entries.truncate(self.max_entries);
    }

    pub fn entries(&self) -> impl Iterator<Item = &AnalysisHistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&AnalysisHistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
