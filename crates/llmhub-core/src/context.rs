use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call execution context
///
/// Carries the caller's cancellation signal and an optional deadline.
/// Adapters race every outbound exchange against both, so dropping a
/// call or letting its deadline pass aborts the network operation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

/// Reason a call stopped before completing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The caller cancelled the context
    Cancelled,
    /// The context deadline passed
    DeadlineExceeded,
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("request cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

impl std::error::Error for Interrupted {}

impl RequestContext {
    /// Context with no deadline and a fresh cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing cancellation token, e.g. one tied to a server shutdown
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set a deadline relative to now
    ///
    /// A timeout too large to represent as an instant sets no deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Set an absolute deadline, keeping the earlier one if already set
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        self
    }

    /// Derive a context that is cancelled with this one but can be cancelled on its own
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
        }
    }

    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Drive `future` to completion unless the context is cancelled or expires first
    ///
    /// The future is dropped when interrupted, which aborts any I/O it owns.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if cancellation or the deadline wins the race
    pub async fn run<F>(&self, future: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
            () = sleep_until(self.deadline) => Err(Interrupted::DeadlineExceeded),
            output = future => Ok(output),
        }
    }

    /// Owned future resolving when this context is cancelled or expires
    ///
    /// Used to guard long-lived streams that outlive the borrow of the context.
    pub fn interrupted(&self) -> Pin<Box<dyn Future<Output = Interrupted> + Send>> {
        let token = self.cancellation.clone();
        let deadline = self.deadline;

        Box::pin(async move {
            tokio::select! {
                biased;
                () = token.cancelled_owned() => Interrupted::Cancelled,
                () = sleep_until(deadline) => Interrupted::DeadlineExceeded,
            }
        })
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
