//! Typed messages dispatched to the workbench
//!
//! User events and task completions share one inbox so the workbench can
//! apply them strictly in order.

use qopt_analyzer::{AnalysisResult, MetricKind};
use qopt_core::Result;

use crate::clipboard::CopyTarget;
use crate::notifications::NotificationId;

#[derive(Debug)]
pub enum Message {
    /// The query buffer was replaced with new text
    InputChanged(String),
    /// The analyze trigger was activated
    Submit,
    KeyPressed(KeyPress),
    /// A navigation item was selected
    Navigate(String),
    Copy(CopyTarget),

    AnalysisFinished {
        ticket: u64,
        outcome: Result<AnalysisResult>,
    },
    MetricRevealed {
        generation: u64,
        metric: MetricKind,
    },
    MetricSettled {
        generation: u64,
        metric: MetricKind,
    },
    NotificationDismissed(NotificationId),
    NotificationExpired(NotificationId),
    CopyFinished {
        target: CopyTarget,
        outcome: Result<()>,
    },
    CopyFeedbackElapsed {
        target: CopyTarget,
        generation: u64,
    },
}

impl Message {
    /// Short name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputChanged(_) => "input_changed",
            Self::Submit => "submit",
            Self::KeyPressed(_) => "key_pressed",
            Self::Navigate(_) => "navigate",
            Self::Copy(_) => "copy",
            Self::AnalysisFinished { .. } => "analysis_finished",
            Self::MetricRevealed { .. } => "metric_revealed",
            Self::MetricSettled { .. } => "metric_settled",
            Self::NotificationDismissed(_) => "notification_dismissed",
            Self::NotificationExpired(_) => "notification_expired",
            Self::CopyFinished { .. } => "copy_finished",
            Self::CopyFeedbackElapsed { .. } => "copy_feedback_elapsed",
        }
    }

    /// True for messages that originate from the user rather than a task
    pub fn is_user_event(&self) -> bool {
        matches!(
            self,
            Self::InputChanged(_)
                | Self::Submit
                | Self::KeyPressed(_)
                | Self::Navigate(_)
                | Self::Copy(_)
        )
    }
}

/// A key event from the query editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Ctrl+Enter submits the query
    pub fn is_submit_shortcut(&self) -> bool {
        self.ctrl && self.key == "Enter"
    }
}
