//! Clock & Context (C1): monotonic time, cancellation tokens, deadline
//! propagation.
//!
//! Every suspension point in the runtime (engine calls, job persistence,
//! snapshot writes) takes a `Context` so a cycle-level deadline can cascade
//! down to a single engine call without each component reimplementing
//! cancellation plumbing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Wall-clock source. A trait so tests can swap in a fixed clock without
/// sleeping real time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock, used everywhere outside tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fixed clock for deterministic tests; `advance` moves it forward.
#[derive(Debug, Clone)]
pub struct FixedClock {
    inner: Arc<std::sync::Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(start)),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.inner.lock().expect("fixed clock mutex poisoned");
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock().expect("fixed clock mutex poisoned")
    }
}

/// A cooperative cancellation token. Cloning shares the same underlying
/// signal; any clone can cancel, all clones observe it.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<std::sync::atomic::AtomicBool>,
    notify: Arc<Notify>,
    /// When set, this token is also considered cancelled once the parent
    /// is. Cancelling *this* token never reaches back up to the parent.
    parent: Option<Arc<CancellationToken>>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            parent: None,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Resolves once this token or any ancestor has been cancelled. A
    /// no-op future if already cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        match &self.parent {
            Some(parent) => {
                tokio::select! {
                    () = self.notify.notified() => {},
                    () = parent.cancelled() => {},
                }
            }
            None => self.notify.notified().await,
        }
    }

    /// Returns a child scope linked to this token: cancelling the child
    /// never cancels the parent, but cancelling the parent is always
    /// observed by the child, including while the child's own future is
    /// already in flight.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancelled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            parent: Some(Arc::new(self.clone())),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A deadline-bearing execution context passed to every suspension point.
#[derive(Debug, Clone)]
pub struct Context {
    deadline: Instant,
    token: CancellationToken,
}

impl Context {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            token: CancellationToken::new(),
        }
    }

    /// Derives a step-level context from a cycle-level one, clamping the
    /// step deadline to whatever remains of the parent deadline.
    #[must_use]
    pub fn derive(&self, step_timeout: Duration) -> Self {
        let step_deadline = Instant::now() + step_timeout;
        Self {
            deadline: step_deadline.min(self.deadline),
            token: self.token.child(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
