//! Composition root
//!
//! The workbench owns every component and is the only place their state
//! changes. User events and task completions arrive as [`Message`]s and are
//! applied one at a time by [`Workbench::dispatch`].

use std::sync::Arc;
use std::time::Duration;

use qopt_analyzer::AnalysisResult;
use qopt_core::{QoptError, Result, Severity};
use tokio::sync::mpsc;

use crate::backend::AnalysisBackend;
use crate::clipboard::{ClipboardHelper, ClipboardWriter, CopyTarget};
use crate::config::WorkbenchConfig;
use crate::controller::{AnalysisController, CompletedAnalysis};
use crate::history::{AnalysisHistory, AnalysisHistoryEntry};
use crate::input_stats::{InputStats, InputStatsTracker};
use crate::message::Message;
use crate::notifications::{NotificationCenter, NotificationId};
use crate::renderer::ResultRenderer;
use crate::task::Scheduler;
use crate::view_router::ViewRouter;

pub const ANALYSIS_COMPLETE: &str = "Analysis complete!";

pub struct Workbench {
    config: WorkbenchConfig,
    query: String,
    router: ViewRouter,
    input: InputStatsTracker,
    controller: AnalysisController,
    renderer: ResultRenderer,
    notifications: NotificationCenter,
    clipboard: ClipboardHelper,
    history: AnalysisHistory,
    result: Option<AnalysisResult>,
    scheduler: Scheduler,
    inbox: mpsc::UnboundedReceiver<Message>,
    torn_down: bool,
}

impl Workbench {
    pub fn new(
        config: WorkbenchConfig,
        backend: Arc<dyn AnalysisBackend>,
        clipboard: Arc<dyn ClipboardWriter>,
    ) -> Result<Self> {
        config.validate()?;
        let (scheduler, inbox) = Scheduler::new();

        tracing::info!(
            backend = backend.name(),
            views = config.views.len(),
            staged_reveal = config.staged_reveal,
            "initializing workbench"
        );

        Ok(Self {
            router: ViewRouter::new(&config.views)?,
            input: InputStatsTracker::new(),
            controller: AnalysisController::new(backend, config.timings.analysis_timeout()),
            renderer: ResultRenderer::new(&config),
            notifications: NotificationCenter::from_timings(&config.timings),
            clipboard: ClipboardHelper::new(clipboard, config.timings.copy_feedback()),
            history: AnalysisHistory::new(config.history_limit),
            query: String::new(),
            result: None,
            scheduler,
            inbox,
            torn_down: false,
            config,
        })
    }

    /// Applies one message. Must run inside a tokio runtime.
    pub fn dispatch(&mut self, message: Message) {
        if self.torn_down {
            tracing::debug!(kind = message.kind(), "ignoring message after teardown");
            return;
        }
        tracing::trace!(kind = message.kind(), "dispatch");

        match message {
            Message::InputChanged(text) => self.set_query(text),
            Message::Submit => self.submit(),
            Message::KeyPressed(key) => {
                if key.is_submit_shortcut() {
                    self.submit();
                }
            }
            Message::Navigate(view) => {
                if let Err(err) = self.router.activate(&view) {
                    tracing::warn!(%err, "ignoring navigation");
                }
            }
            Message::Copy(target) => self.copy(target),
            Message::AnalysisFinished { ticket, outcome } => {
                if let Some(completed) = self.controller.complete(ticket, outcome) {
                    self.finish_analysis(completed);
                }
            }
            Message::MetricRevealed { generation, metric } => {
                self.renderer.reveal(generation, metric, &self.scheduler);
            }
            Message::MetricSettled { generation, metric } => {
                self.renderer.settle(generation, metric);
            }
            Message::NotificationDismissed(id) => {
                self.notifications.dismiss(id, &self.scheduler);
            }
            Message::NotificationExpired(id) => {
                self.notifications.expire(id);
            }
            Message::CopyFinished { target, outcome } => {
                if let Err(err) = self.clipboard.finish(target, outcome, &self.scheduler) {
                    self.notify(err.to_string(), Severity::Error);
                }
            }
            Message::CopyFeedbackElapsed { target, generation } => {
                self.clipboard.revert(target, generation);
            }
        }
    }

    /// Waits for the next task message and applies it
    ///
    /// Returns false once nothing is queued and no task is pending.
    pub async fn step(&mut self) -> bool {
        if let Ok(message) = self.inbox.try_recv() {
            self.dispatch(message);
            return true;
        }
        if self.scheduler.pending() == 0 {
            return false;
        }

        let received = tokio::select! {
            message = self.inbox.recv() => message,
            () = self.scheduler.idle() => None,
        };
        // The last task may have sent its message just before going idle
        match received.or_else(|| self.inbox.try_recv().ok()) {
            Some(message) => {
                self.dispatch(message);
                true
            }
            None => false,
        }
    }

    /// Runs until every timer and task has finished
    pub async fn settle(&mut self) {
        while self.step().await {}
    }

    /// Drives the inbox for at most `duration` of (possibly paused) time
    pub async fn run_for(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        let _ = tokio::time::timeout_at(deadline, self.settle()).await;
    }

    /// Runs until `predicate` holds or there is nothing left to run
    pub async fn run_until<F>(&mut self, mut predicate: F) -> bool
    where
        F: FnMut(&Self) -> bool,
    {
        loop {
            if predicate(&*self) {
                return true;
            }
            if !self.step().await {
                return predicate(&*self);
            }
        }
    }

    /// Cancels every pending timer and task. Later messages are ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        tracing::info!(pending = self.scheduler.pending(), "tearing down workbench");
        self.controller.cancel();
        self.scheduler.cancel_all();
        self.torn_down = true;
    }

    pub fn notify(&mut self, message: impl Into<String>, severity: Severity) -> NotificationId {
        self.notifications.notify(message, severity, &self.scheduler)
    }

    fn set_query(&mut self, text: String) {
        let stats = self.input.on_input_changed(&text);
        tracing::trace!(lines = stats.line_count, chars = stats.char_count, "input changed");
        self.query = text;
    }

    fn submit(&mut self) {
        match self.controller.submit(&self.query, &self.scheduler) {
            Ok(_) => {}
            Err(QoptError::AnalysisInFlight) => {
                tracing::debug!("analysis already running; ignoring submit");
            }
            Err(err @ QoptError::EmptyInput) => {
                self.notify(err.to_string(), Severity::Warning);
            }
            Err(err) => {
                self.notify(err.to_string(), Severity::Error);
            }
        }
    }

    fn finish_analysis(&mut self, completed: CompletedAnalysis) {
        let duration_ms = completed.elapsed.as_millis() as u64;
        match completed.outcome {
            Ok(result) => {
                self.renderer.render(&result, &self.scheduler);
                self.history.add(AnalysisHistoryEntry::success(
                    completed.sql,
                    duration_ms,
                    result.cost_estimate,
                ));
                self.result = Some(result);
                self.notify(ANALYSIS_COMPLETE, Severity::Success);
            }
            Err(err) => {
                tracing::error!(%err, "analysis failed");
                self.history.add(AnalysisHistoryEntry::failure(
                    completed.sql,
                    duration_ms,
                    err.to_string(),
                ));
                self.notify(err.to_string(), Severity::Error);
            }
        }
    }

    fn copy(&mut self, target: CopyTarget) {
        match self.renderer.copy_text(target) {
            Some(text) => self.clipboard.copy(target, text, &self.scheduler),
            None => tracing::debug!(copy_target = target.as_str(), "nothing to copy"),
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    /// The current contents of the query editor
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn input_stats(&self) -> InputStats {
        self.input.stats()
    }

    pub fn input(&self) -> &InputStatsTracker {
        &self.input
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    pub fn controller(&self) -> &AnalysisController {
        &self.controller
    }

    pub fn renderer(&self) -> &ResultRenderer {
        &self.renderer
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn clipboard(&self) -> &ClipboardHelper {
        &self.clipboard
    }

    pub fn history(&self) -> &AnalysisHistory {
        &self.history
    }

    /// The most recent successful analysis
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for Workbench {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
    }
}
