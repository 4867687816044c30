//! Copy buttons and the clipboard writers behind them

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use parking_lot::Mutex;
use qopt_core::{QoptError, Result};

use crate::message::Message;
use crate::task::Scheduler;

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "✓";

/// Destination for copied text
#[async_trait]
pub trait ClipboardWriter: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// In-process clipboard for headless runs and tests
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    deny: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that rejects every write
    pub fn denying() -> Self {
        let clipboard = Self::default();
        clipboard.set_denied(true);
        clipboard
    }

    pub fn set_denied(&self, deny: bool) {
        self.deny.store(deny, Ordering::Release);
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

#[async_trait]
impl ClipboardWriter for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if self.deny.load(Ordering::Acquire) {
            return Err(QoptError::ClipboardDenied(
                "clipboard write was rejected".into(),
            ));
        }
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

/// Writes to the terminal's clipboard with an OSC 52 escape sequence
pub struct Osc52Clipboard {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Osc52Clipboard {
    /// Common terminal limit on the base64 payload
    pub const MAX_PAYLOAD: usize = 74_994;

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl ClipboardWriter for Osc52Clipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        let sequence = osc52_sequence(text, Self::MAX_PAYLOAD)?;
        let mut writer = self.writer.lock();
        writer
            .write_all(sequence.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| QoptError::ClipboardDenied(e.to_string()))
    }
}

/// `ESC ] 52 ; c ; <base64> BEL`
pub fn osc52_sequence(text: &str, max_payload: usize) -> Result<String> {
    let encoded = STANDARD.encode(text.as_bytes());
    if encoded.len() > max_payload {
        return Err(QoptError::ClipboardDenied(format!(
            "OSC 52 payload too large ({} > {})",
            encoded.len(),
            max_payload
        )));
    }
    Ok(format!("\x1b]52;c;{encoded}\x07"))
}

/// Which code block a copy button belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyTarget {
    OptimizedQuery,
    IndexStatements,
}

impl CopyTarget {
    pub const ALL: [CopyTarget; 2] = [Self::OptimizedQuery, Self::IndexStatements];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OptimizedQuery => "optimized_query",
            Self::IndexStatements => "index_statements",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyButton {
    pub label: &'static str,
    /// Bumped on every successful copy so an older revert timer is ignored
    generation: u64,
}

impl Default for CopyButton {
    fn default() -> Self {
        Self {
            label: COPY_LABEL,
            generation: 0,
        }
    }
}

impl CopyButton {
    pub fn is_confirmed(&self) -> bool {
        self.label == COPIED_LABEL
    }
}

pub struct ClipboardHelper {
    writer: Arc<dyn ClipboardWriter>,
    buttons: HashMap<CopyTarget, CopyButton>,
    feedback: Duration,
}

impl ClipboardHelper {
    pub fn new(writer: Arc<dyn ClipboardWriter>, feedback: Duration) -> Self {
        let buttons = CopyTarget::ALL
            .into_iter()
            .map(|target| (target, CopyButton::default()))
            .collect();
        Self {
            writer,
            buttons,
            feedback,
        }
    }

    /// Starts an asynchronous write; the outcome arrives as `CopyFinished`
    pub fn copy(&self, target: CopyTarget, text: String, scheduler: &Scheduler) {
        tracing::debug!(copy_target = target.as_str(), chars = text.chars().count(), "copying");
        let writer = Arc::clone(&self.writer);
        scheduler.spawn(async move {
            let outcome = writer.write_text(&text).await;
            Message::CopyFinished { target, outcome }
        });
    }

    /// Applies a finished write. Failures are handed back untouched and the
    /// button keeps its label.
    pub fn finish(
        &mut self,
        target: CopyTarget,
        outcome: Result<()>,
        scheduler: &Scheduler,
    ) -> Result<()> {
        outcome?;
        let button = self.buttons.entry(target).or_default();
        button.label = COPIED_LABEL;
        button.generation += 1;
        scheduler.after(
            self.feedback,
            Message::CopyFeedbackElapsed {
                target,
                generation: button.generation,
            },
        );
        Ok(())
    }

    /// Restores the "Copy" label unless a newer copy has happened since
    pub fn revert(&mut self, target: CopyTarget, generation: u64) -> bool {
        match self.buttons.get_mut(&target) {
            Some(button) if button.generation == generation => {
                button.label = COPY_LABEL;
                true
            }
            _ => false,
        }
    }

    pub fn button(&self, target: CopyTarget) -> CopyButton {
        self.buttons.get(&target).cloned().unwrap_or_default()
    }
}
