//! Per-call cancellation and deadline.
//!
//! Operations check the context before issuing a dataplane call. Once the
//! call is in flight it is not aborted here; cancelling the underlying
//! request is the dataplane client's job.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{LcpError, LcpResult};

/// Cancellation token plus optional deadline for one or more operations.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// Context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Context bound to an externally owned token (e.g. daemon shutdown).
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Returns a copy of this context that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the context was cancelled or its deadline has passed.
    pub fn check(&self, operation: &'static str) -> LcpResult<()> {
        if self.token.is_cancelled() {
            return Err(LcpError::Cancelled { operation });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(LcpError::DeadlineExceeded { operation });
            }
        }
        Ok(())
    }
}
