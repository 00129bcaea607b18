//! BatchedFusionScheduler lifecycle and submission API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::info;

use crate::batch::types::GenerationRequest;
use crate::config::BatchConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::{GenerationBackend, GenerationInput};

use super::stats::{SchedulerStats, SchedulerStatsInternal};
use super::worker::worker_loop;

/// Groups concurrent clause generations by exact expert signature.
///
/// Requests whose supports are equal share one `generate_batch` call;
/// overlapping but unequal supports never do. A queue is released when it
/// reaches the smallest `max_batch_size` among its members or any member has
/// waited its own `max_wait`, whichever comes first.
pub struct BatchedFusionScheduler {
    request_tx: mpsc::Sender<GenerationRequest>,
    config: BatchConfig,
    stats: Arc<SchedulerStatsInternal>,
    is_running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchedFusionScheduler {
    /// Spawn the worker task on the current tokio runtime.
    ///
    /// # Errors
    /// - `EngineError::ConfigError` if `config` is invalid
    /// - `EngineError::InternalError` if called outside a tokio runtime
    pub fn start(backend: Arc<dyn GenerationBackend>, config: BatchConfig) -> EngineResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            EngineError::InternalError {
                message: format!("scheduler requires a tokio runtime: {}", e),
            }
        })?;

        let (request_tx, request_rx) = mpsc::channel(config.request_buffer_size);
        let stats = Arc::new(SchedulerStatsInternal::default());
        let is_running = Arc::new(AtomicBool::new(true));
        let shutdown_notify = Arc::new(Notify::new());
        let batch_semaphore = Arc::new(Semaphore::new(config.max_concurrent_batches));

        let worker = runtime.spawn(worker_loop(
            backend,
            request_rx,
            Arc::clone(&shutdown_notify),
            Arc::clone(&stats),
            batch_semaphore,
            Duration::from_millis(config.poll_interval_ms),
            config.max_concurrent_batches,
        ));

        info!(
            max_batch_size = config.max_batch_size,
            max_wait_ms = config.max_wait_ms,
            max_concurrent_batches = config.max_concurrent_batches,
            "Started batch scheduler"
        );

        Ok(Self {
            request_tx,
            config,
            stats,
            is_running,
            shutdown_notify,
            worker: Mutex::new(Some(worker)),
        })
    }

    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Submit with the configured batch size and wait.
    ///
    /// # Errors
    /// See [`BatchedFusionScheduler::submit_with`].
    pub async fn submit(&self, input: GenerationInput) -> EngineResult<String> {
        self.submit_with(
            input,
            self.config.max_batch_size,
            Duration::from_millis(self.config.max_wait_ms),
        )
        .await
    }

    /// Queue one clause for generation and wait for its output.
    ///
    /// Dropping the returned future detaches the request without affecting
    /// other members of its batch.
    ///
    /// # Errors
    /// - `EngineError::InternalError` if the scheduler is shut down
    /// - `EngineError::BatchDispatchError` (shared) if the backend failed the batch
    pub async fn submit_with(
        &self,
        input: GenerationInput,
        max_batch_size: usize,
        max_wait: Duration,
    ) -> EngineResult<String> {
        if !self.is_running() {
            return Err(EngineError::InternalError {
                message: "scheduler is shut down".to_string(),
            });
        }

        let (request, rx) = GenerationRequest::new(input, max_batch_size, max_wait);
        self.stats.inc_requests_submitted();
        self.request_tx
            .send(request)
            .await
            .map_err(|_| EngineError::InternalError {
                message: "failed to submit request: scheduler channel closed".to_string(),
            })?;

        rx.await.map_err(|_| EngineError::InternalError {
            message: "request was dropped before completion".to_string(),
        })?
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }

    /// Stop accepting requests, dispatch everything queued and wait for
    /// in-flight batches.
    pub async fn shutdown(&self) {
        if !self.is_running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("Shutting down batch scheduler");
        self.shutdown_notify.notify_one();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl Drop for BatchedFusionScheduler {
    fn drop(&mut self) {
        if self.is_running.swap(false, Ordering::AcqRel) {
            self.shutdown_notify.notify_one();
        }
    }
}
