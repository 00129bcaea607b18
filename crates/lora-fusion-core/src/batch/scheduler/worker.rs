//! Scheduler worker loop and batch dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify, Semaphore};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

use crate::batch::types::{Batch, GenerationRequest, SignatureQueue};
use crate::traits::GenerationBackend;
use crate::types::ExpertSignature;

use super::stats::SchedulerStatsInternal;

type Queues = HashMap<ExpertSignature, SignatureQueue>;

// ============================================================================
// WORKER LOOP
// ============================================================================

/// Owns every signature queue; callers only reach it through `request_rx`.
pub(crate) async fn worker_loop(
    backend: Arc<dyn GenerationBackend>,
    mut request_rx: mpsc::Receiver<GenerationRequest>,
    shutdown_notify: Arc<Notify>,
    stats: Arc<SchedulerStatsInternal>,
    batch_semaphore: Arc<Semaphore>,
    poll_interval: Duration,
    max_concurrent_batches: usize,
) {
    let mut queues: Queues = HashMap::new();
    let mut poll_timer = interval(poll_interval);
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_notify.notified() => {
                request_rx.close();
                while let Ok(request) = request_rx.try_recv() {
                    enqueue(&mut queues, request);
                }
                flush_all_queues(&mut queues, &backend, &stats, &batch_semaphore).await;
                break;
            }

            maybe_request = request_rx.recv() => {
                let Some(request) = maybe_request else {
                    flush_all_queues(&mut queues, &backend, &stats, &batch_semaphore).await;
                    break;
                };
                let signature = request.signature().clone();
                enqueue(&mut queues, request);
                check_and_dispatch(&mut queues, &signature, &backend, &stats, &batch_semaphore);
                stats.set_queue_depth(queue_depth(&queues));
            }

            _ = poll_timer.tick() => {
                let signatures: Vec<ExpertSignature> = queues.keys().cloned().collect();
                for signature in &signatures {
                    check_and_dispatch(&mut queues, signature, &backend, &stats, &batch_semaphore);
                }
                queues.retain(|_, q| !q.is_empty());
                stats.set_queue_depth(queue_depth(&queues));
            }
        }
    }

    // Wait out batches still inside the backend
    if let Ok(permits) = batch_semaphore
        .acquire_many(max_concurrent_batches as u32)
        .await
    {
        drop(permits);
    }
    stats.set_queue_depth(0);
    debug!("Scheduler worker stopped");
}

fn enqueue(queues: &mut Queues, request: GenerationRequest) {
    let signature = request.signature().clone();
    queues
        .entry(signature.clone())
        .or_insert_with(|| SignatureQueue::new(signature))
        .push(request);
}

fn queue_depth(queues: &Queues) -> usize {
    queues.values().map(SignatureQueue::len).sum()
}

// ============================================================================
// QUEUE PROCESSING
// ============================================================================

/// Dispatch one batch from `signature`'s queue if it is due and a permit is
/// free. Otherwise the queue waits for the next poll.
fn check_and_dispatch(
    queues: &mut Queues,
    signature: &ExpertSignature,
    backend: &Arc<dyn GenerationBackend>,
    stats: &Arc<SchedulerStatsInternal>,
    batch_semaphore: &Arc<Semaphore>,
) {
    let Some(queue) = queues.get_mut(signature) else {
        return;
    };

    stats.add_requests_detached(queue.prune_detached() as u64);
    if !queue.should_flush() {
        return;
    }

    let permit = match Arc::clone(batch_semaphore).try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => return,
    };

    if let Some(batch) = queue.drain_batch() {
        let backend = Arc::clone(backend);
        let stats = Arc::clone(stats);
        tokio::spawn(async move {
            let _permit = permit;
            process_batch(batch, &backend, &stats).await;
        });
    }
}

// ============================================================================
// BATCH PROCESSING
// ============================================================================

/// Send one batch through the backend and distribute the outputs.
pub(crate) async fn process_batch(
    mut batch: Batch,
    backend: &Arc<dyn GenerationBackend>,
    stats: &Arc<SchedulerStatsInternal>,
) {
    stats.add_requests_detached(batch.prune_detached() as u64);
    if batch.is_empty() {
        debug!(batch_id = %batch.id, "Every member detached, discarding batch");
        stats.inc_batches_discarded();
        return;
    }

    let batch_size = batch.len();
    stats.record_dispatch(batch_size);
    stats.batch_started();
    debug!(
        batch_id = %batch.id,
        signature = %batch.signature,
        batch_size,
        waited_us = batch.assembled_at.elapsed().as_micros() as u64,
        "Dispatching batch"
    );

    let outcome = backend.generate_batch(&batch.signature, &batch.inputs).await;
    stats.batch_finished();

    match outcome {
        Ok(outputs) if outputs.len() == batch_size => {
            let delivered = batch.complete(outputs);
            stats.add_requests_completed(batch_size as u64);
            stats.add_requests_detached((batch_size - delivered) as u64);
        }
        Ok(outputs) => {
            error!(
                batch_id = %batch.id,
                batch_size,
                outputs = outputs.len(),
                "Backend returned wrong number of outputs"
            );
            batch.complete(outputs);
            stats.add_requests_failed(batch_size as u64);
        }
        Err(e) => {
            error!(batch_id = %batch.id, batch_size, error = %e, "Batch dispatch failed");
            batch.fail(e.to_string());
            stats.add_requests_failed(batch_size as u64);
        }
    }
}

// ============================================================================
// FLUSH OPERATIONS
// ============================================================================

/// Dispatch everything still queued (used during shutdown).
async fn flush_all_queues(
    queues: &mut Queues,
    backend: &Arc<dyn GenerationBackend>,
    stats: &Arc<SchedulerStatsInternal>,
    batch_semaphore: &Arc<Semaphore>,
) {
    for queue in queues.values_mut() {
        stats.add_requests_detached(queue.prune_detached() as u64);
        while !queue.is_empty() {
            let permit = match batch_semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    queue.cancel_all("scheduler stopped before dispatch");
                    break;
                }
            };
            if let Some(batch) = queue.drain_batch() {
                process_batch(batch, backend, stats).await;
            }
            drop(permit);
        }
    }
    queues.clear();
}
