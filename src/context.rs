//! Cancellation and deadline context for service calls.
//!
//! Every lookup on [`GeocodeService`](crate::service::GeocodeService) takes a
//! [`Context`]. A cancelled context, or one whose deadline has passed, makes
//! the call fail fast with [`GeocodeError::NilContext`] before the provider
//! is contacted. Cache file I/O and storage sync are not gated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{GeocodeError, Result};

/// A cloneable cancellation handle with an optional deadline.
///
/// Clones share the cancellation flag, so cancelling any clone cancels all.
///
/// # Example
///
/// ```
/// use geocode::Context;
/// use std::time::Duration;
///
/// let ctx = Context::with_timeout(Duration::from_secs(5));
/// assert!(ctx.check().is_ok());
///
/// ctx.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A context with no deadline that is never cancelled unless asked.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left before the deadline. `None` means no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Cancelled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Fail with [`GeocodeError::NilContext`] when the context is done.
    pub fn check(&self) -> Result<()> {
        if self.is_done() {
            return Err(GeocodeError::NilContext);
        }
        Ok(())
    }
}
