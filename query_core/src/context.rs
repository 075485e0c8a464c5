use crate::errors::QueryError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation carrier for one execution call
///
/// The deadline is fixed when the context is created, so it bounds the whole
/// attempt sequence, backoff sleeps included.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    deadline: Option<(Instant, Duration)>,
    cancel: Option<CancellationToken>,
}

impl ExecContext {
    pub fn new(timeout: Option<Duration>, cancel: Option<CancellationToken>) -> Self {
        Self {
            deadline: timeout.map(|t| (Instant::now() + t, t)),
            cancel,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.deadline.map(|(_, t)| t)
    }

    /// Error to surface if the caller has already given up
    pub fn check(&self) -> Result<(), QueryError> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return Err(cancelled());
            }
        }
        if let Some((at, timeout)) = self.deadline {
            if Instant::now() >= at {
                return Err(QueryError::DeadlineExceeded { timeout });
            }
        }
        Ok(())
    }

    /// Run one attempt, aborting it when the deadline passes or the token fires
    pub async fn guard<T, F>(&self, fut: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, QueryError>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = wait_cancelled(self.cancel.as_ref()) => Err(cancelled()),
            _ = wait_deadline(self.deadline) => Err(self.deadline_error()),
            result = fut => result,
        }
    }

    /// Backoff sleep; returns early with the abort reason
    pub async fn sleep(&self, delay: Duration) -> Result<(), QueryError> {
        self.guard(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }

    fn deadline_error(&self) -> QueryError {
        QueryError::DeadlineExceeded {
            timeout: self.timeout().unwrap_or_default(),
        }
    }
}

fn cancelled() -> QueryError {
    QueryError::Cancelled("operation cancelled by caller".to_string())
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn wait_deadline(deadline: Option<(Instant, Duration)>) {
    match deadline {
        Some((at, _)) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
