//! The analyze trigger and the backend call behind it

use std::sync::Arc;
use std::time::Duration;

use qopt_analyzer::AnalysisResult;
use qopt_core::{QoptError, Result};
use tokio::time::Instant;

use crate::backend::AnalysisBackend;
use crate::message::Message;
use crate::task::{Scheduler, TaskHandle};

pub const IDLE_LABEL: &str = "Analyze Query →";
pub const BUSY_LABEL: &str = "Analyzing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Analyzing { ticket: u64 },
}

/// The analyze button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerControl {
    pub enabled: bool,
    pub label: &'static str,
}

impl TriggerControl {
    fn idle() -> Self {
        Self {
            enabled: true,
            label: IDLE_LABEL,
        }
    }

    fn busy() -> Self {
        Self {
            enabled: false,
            label: BUSY_LABEL,
        }
    }
}

/// A finished analysis handed back to the workbench
#[derive(Debug)]
pub struct CompletedAnalysis {
    pub sql: String,
    pub elapsed: Duration,
    pub outcome: Result<AnalysisResult>,
}

struct InFlight {
    ticket: u64,
    sql: String,
    started: Instant,
    task: TaskHandle,
}

/// `Idle -> Analyzing -> Idle`
///
/// The trigger is disabled for exactly as long as the controller is
/// analyzing. Each submission gets a ticket; completions carrying any other
/// ticket are discarded.
pub struct AnalysisController {
    backend: Arc<dyn AnalysisBackend>,
    timeout: Duration,
    in_flight: Option<InFlight>,
    next_ticket: u64,
}

impl AnalysisController {
    pub fn new(backend: Arc<dyn AnalysisBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            in_flight: None,
            next_ticket: 1,
        }
    }

    pub fn state(&self) -> AnalysisState {
        match &self.in_flight {
            Some(in_flight) => AnalysisState::Analyzing {
                ticket: in_flight.ticket,
            },
            None => AnalysisState::Idle,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn trigger(&self) -> TriggerControl {
        if self.is_analyzing() {
            TriggerControl::busy()
        } else {
            TriggerControl::idle()
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Starts analyzing `query` and returns its ticket
    ///
    /// Blank input is rejected with `EmptyInput` and a second submission
    /// while one is running with `AnalysisInFlight`. Neither changes state.
    pub fn submit(&mut self, query: &str, scheduler: &Scheduler) -> Result<u64> {
        if query.trim().is_empty() {
            return Err(QoptError::EmptyInput);
        }
        if self.is_analyzing() {
            return Err(QoptError::AnalysisInFlight);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let backend = Arc::clone(&self.backend);
        let timeout = self.timeout;
        let sql = query.to_string();
        let task = scheduler.spawn(async move {
            let outcome = match tokio::time::timeout(timeout, backend.submit_query(&sql)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(QoptError::Timeout(format!(
                    "analysis did not finish within {}ms",
                    timeout.as_millis()
                ))),
            };
            Message::AnalysisFinished { ticket, outcome }
        });

        tracing::info!(ticket, backend = self.backend.name(), "analysis started");
        self.in_flight = Some(InFlight {
            ticket,
            sql: query.to_string(),
            started: Instant::now(),
            task,
        });
        Ok(ticket)
    }

    /// Returns to `Idle` if `ticket` is the running analysis
    pub fn complete(
        &mut self,
        ticket: u64,
        outcome: Result<AnalysisResult>,
    ) -> Option<CompletedAnalysis> {
        match &self.in_flight {
            Some(in_flight) if in_flight.ticket == ticket => {}
            _ => {
                tracing::debug!(ticket, "discarding stale analysis result");
                return None;
            }
        }
        let in_flight = self.in_flight.take()?;
        let elapsed = in_flight.started.elapsed();
        tracing::info!(
            ticket,
            elapsed_ms = elapsed.as_millis() as u64,
            success = outcome.is_ok(),
            "analysis finished"
        );

        Some(CompletedAnalysis {
            sql: in_flight.sql,
            elapsed,
            outcome,
        })
    }

    /// Abandons the running analysis, if any
    pub fn cancel(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::debug!(ticket = in_flight.ticket, "cancelling analysis");
            in_flight.task.cancel();
        }
    }
}
