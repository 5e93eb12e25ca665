use std::future::Future;
use std::sync::Mutex;

use tokio::task::AbortHandle;

use crate::error::{AppError, AppResult};

/// Runs at most one task of a kind at a time: starting a new one aborts the
/// one still in flight, whose caller gets `AppError::Superseded`.
#[derive(Default)]
pub struct LatestOnly {
    in_flight: Mutex<Option<AbortHandle>>,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, T>(&self, task: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::spawn(task);

        {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| AppError::Internal("Search slot lock poisoned".to_string()))?;
            if let Some(previous) = in_flight.replace(handle.abort_handle()) {
                previous.abort();
            }
        }

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Search superseded by a newer one");
                Err(AppError::Superseded)
            }
            Err(e) => Err(AppError::Internal(format!("Search task failed: {}", e))),
        }
    }
}
