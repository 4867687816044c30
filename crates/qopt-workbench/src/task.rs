//! Cancellable tasks that report back to the workbench inbox
//!
//! Every timer and backend call is spawned through a [`Scheduler`]. A task
//! resolves to a [`Message`] which is sent to the workbench inbox; it never
//! touches component state itself. Cancelling the scheduler (or a single
//! [`TaskHandle`]) guarantees the message is never delivered.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::message::Message;

pub struct Scheduler {
    outbox: mpsc::UnboundedSender<Message>,
    root: CancellationToken,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Scheduler {
    /// Creates a scheduler and the inbox its tasks deliver to
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let scheduler = Self {
            outbox,
            root: CancellationToken::new(),
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        };
        (scheduler, inbox)
    }

    /// Delivers `message` once `delay` has elapsed
    pub fn after(&self, delay: Duration, message: Message) -> TaskHandle {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            message
        })
    }

    /// Runs `future` on the current runtime and delivers its output
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = Message> + Send + 'static,
    {
        let token = self.root.child_token();
        let task_token = token.clone();
        let outbox = self.outbox.clone();
        let guard = PendingGuard::new(Arc::clone(&self.pending), Arc::clone(&self.idle));

        let join = tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                biased;
                () = task_token.cancelled() => {}
                message = future => {
                    // Cancellation may land while the future is resolving
                    if !task_token.is_cancelled() {
                        let _ = outbox.send(message);
                    }
                }
            }
        });

        TaskHandle { token, join }
    }

    /// Number of tasks that have not finished or been cancelled yet
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Resolves once no tasks are pending
    pub async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Cancels every outstanding task. Later spawns are cancelled immediately.
    pub fn cancel_all(&self) {
        if !self.root.is_cancelled() {
            tracing::debug!(pending = self.pending(), "cancelling scheduled tasks");
        }
        self.root.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.root.is_cancelled()
    }
}

/// Handle to a single scheduled task. Dropping it does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl PendingGuard {
    fn new(pending: Arc<AtomicUsize>, idle: Arc<Notify>) -> Self {
        pending.fetch_add(1, Ordering::AcqRel);
        Self { pending, idle }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn test_after_delivers_message_once_elapsed() {
        let (scheduler, mut inbox) = Scheduler::new();
        scheduler.after(Duration::from_millis(300), Message::Submit);

        assert_eq!(scheduler.pending(), 1);
        assert!(inbox.try_recv().is_err());

        let start = tokio::time::Instant::now();
        let message = inbox.recv().await.unwrap();
        assert!(matches!(message, Message::Submit));
        assert!(start.elapsed() >= Duration::from_millis(300));

        scheduler.idle().await;
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_never_delivers() {
        let (scheduler, mut inbox) = Scheduler::new();
        let handle = scheduler.after(Duration::from_millis(100), Message::Submit);
        handle.cancel();

        scheduler.idle().await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(handle.is_cancelled());
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_pending_and_future_tasks() {
        let (scheduler, mut inbox) = Scheduler::new();
        scheduler.after(Duration::from_millis(100), Message::Submit);
        scheduler.after(Duration::from_millis(200), Message::Submit);

        scheduler.cancel_all();
        scheduler.after(Duration::from_millis(10), Message::Submit);
        scheduler.idle().await;

        assert!(scheduler.is_cancelled());
        assert_eq!(scheduler.pending(), 0);
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_with_nothing_pending_returns_immediately() {
        let (scheduler, _inbox) = Scheduler::new();
        scheduler.idle().await;
        assert_eq!(scheduler.pending(), 0);
    }
}
