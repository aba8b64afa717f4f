//! Bounded-concurrency probe engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ProbeError, Result};
use crate::types::{Event, LinkRecord, ProbeResult};

use super::{Prober, classify};

/// Probes every record exactly once with at most `concurrency_limit` requests
/// in flight.
///
/// Each probe runs in its own task holding one semaphore permit for the
/// duration of its request. Results land in a slot per input position, so the
/// returned vector is in input order regardless of completion order.
pub struct ProbeEngine {
    prober: Arc<dyn Prober>,
    concurrency_limit: usize,
    keep_server_errors: bool,
    event_tx: Option<broadcast::Sender<Event>>,
}

/// State shared by every probe task of one run
struct ProbeTaskContext {
    prober: Arc<dyn Prober>,
    keep_server_errors: bool,
    completed: AtomicUsize,
    total: usize,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl ProbeTaskContext {
    async fn run(&self, record: LinkRecord) -> ProbeResult {
        let outcome = self.prober.probe(&record.url).await;
        let result = classify(record, outcome, self.keep_server_errors);

        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        match &result.error {
            Some(error) => tracing::debug!(
                url = %result.record.url,
                completed,
                total = self.total,
                error = %error,
                "probe failed"
            ),
            None => tracing::debug!(
                url = %result.record.url,
                completed,
                total = self.total,
                status = %result.status,
                working = result.is_working,
                "probe finished"
            ),
        }

        if let Some(tx) = &self.event_tx {
            tx.send(Event::ProbeCompleted {
                completed,
                total: self.total,
                url: result.record.url.clone(),
                working: result.is_working,
            })
            .ok();
        }

        result
    }
}

impl ProbeEngine {
    /// Create an engine around a prober
    ///
    /// A `concurrency_limit` of zero is treated as one.
    pub fn new(prober: Arc<dyn Prober>, concurrency_limit: usize, keep_server_errors: bool) -> Self {
        Self {
            prober,
            concurrency_limit: concurrency_limit.max(1),
            keep_server_errors,
            event_tx: None,
        }
    }

    /// Publish a [`Event::ProbeCompleted`] on `tx` as each probe finishes
    pub fn with_events(mut self, tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Probe all records, returning one result per record in input order
    ///
    /// Per-URL failures are captured in the results. The only error is
    /// [`Error::Cancelled`]: once `cancel` fires no new probe starts, in-flight
    /// probes are aborted and no results are returned.
    pub async fn probe_all(
        &self,
        records: &[LinkRecord],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProbeResult>> {
        let total = records.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let ctx = Arc::new(ProbeTaskContext {
            prober: Arc::clone(&self.prober),
            keep_server_errors: self.keep_server_errors,
            completed: AtomicUsize::new(0),
            total,
            event_tx: self.event_tx.clone(),
        });

        tracing::info!(
            total,
            concurrency = self.concurrency_limit,
            "starting probes"
        );

        let mut slots: Vec<Option<ProbeResult>> = vec![None; total];
        let mut abort_handles = Vec::with_capacity(total);
        let mut in_flight = FuturesUnordered::new();

        for (slot, record) in records.iter().enumerate() {
            // Acquire before spawning so at most `concurrency_limit` tasks exist.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    abort_all(&abort_handles);
                    return Err(Error::Cancelled);
                }
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|_| Error::Other("probe semaphore closed".to_string()))?
                }
            };

            let ctx = Arc::clone(&ctx);
            let record = record.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                ctx.run(record).await
            });
            abort_handles.push(handle.abort_handle());
            in_flight.push(async move { (slot, handle.await) });

            // Collect whatever already finished so the set does not grow with the playlist.
            while let Some(Some((slot, joined))) = in_flight.next().now_or_never() {
                store(&mut slots, slot, joined);
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    abort_all(&abort_handles);
                    return Err(Error::Cancelled);
                }
                next = in_flight.next() => match next {
                    Some((slot, joined)) => store(&mut slots, slot, joined),
                    None => break,
                }
            }
        }

        let results: Vec<ProbeResult> = slots
            .into_iter()
            .zip(records)
            .map(|(slot, record)| {
                slot.unwrap_or_else(|| {
                    classify(
                        record.clone(),
                        Err(ProbeError::Request("probe task did not complete".to_string())),
                        false,
                    )
                })
            })
            .collect();

        let working = results.iter().filter(|r| r.is_working).count();
        tracing::info!(
            total,
            working,
            non_working = total - working,
            "probes finished"
        );

        Ok(results)
    }
}

fn store(
    slots: &mut [Option<ProbeResult>],
    slot: usize,
    joined: std::result::Result<ProbeResult, tokio::task::JoinError>,
) {
    match joined {
        Ok(result) => slots[slot] = Some(result),
        Err(e) => tracing::error!(slot, error = %e, "probe task panicked"),
    }
}

fn abort_all(handles: &[tokio::task::AbortHandle]) {
    for handle in handles {
        handle.abort();
    }
    tracing::warn!("probing cancelled");
}
