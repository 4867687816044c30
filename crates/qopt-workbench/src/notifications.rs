//! Stacked, auto-dismissing user notifications

use std::time::Duration;

use chrono::{DateTime, Utc};
use qopt_core::Severity;

use crate::config::Timings;
use crate::message::Message;
use crate::task::Scheduler;

pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPhase {
    Visible,
    /// Exit transition running; removed once it finishes
    Leaving,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub phase: NotificationPhase,
}

/// Notifications in arrival order, oldest first
///
/// Each entry owns its own pair of timers: dismissal after the display
/// duration, removal after the exit duration. Later notifications never
/// shorten or cancel earlier ones.
#[derive(Debug)]
pub struct NotificationCenter {
    entries: Vec<Notification>,
    next_id: NotificationId,
    display: Duration,
    exit: Duration,
}

impl NotificationCenter {
    pub fn new(display: Duration, exit: Duration) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            display,
            exit,
        }
    }

    pub fn from_timings(timings: &Timings) -> Self {
        Self::new(timings.notification_display(), timings.notification_exit())
    }

    pub fn notify(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        scheduler: &Scheduler,
    ) -> NotificationId {
        let id = self.next_id;
        self.next_id += 1;
        let message = message.into();

        match severity {
            Severity::Error => tracing::error!(id, %message, "notification"),
            Severity::Warning => tracing::warn!(id, %message, "notification"),
            Severity::Info | Severity::Success => {
                tracing::info!(id, %severity, %message, "notification")
            }
        }

        self.entries.push(Notification {
            id,
            message,
            severity,
            created_at: Utc::now(),
            phase: NotificationPhase::Visible,
        });
        scheduler.after(self.display, Message::NotificationDismissed(id));
        id
    }

    /// Starts the exit transition and schedules removal
    pub fn dismiss(&mut self, id: NotificationId, scheduler: &Scheduler) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if entry.phase == NotificationPhase::Leaving {
            return false;
        }
        entry.phase = NotificationPhase::Leaving;
        scheduler.after(self.exit, Message::NotificationExpired(id));
        true
    }

    pub fn expire(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// All entries still on screen, including those leaving
    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
