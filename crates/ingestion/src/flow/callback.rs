//! Callback-to-poll adapter
//!
//! Analysis libraries push results through a callback from their own
//! threads. `CallbackFlowChannel` buffers those deliveries in a bounded
//! queue and exposes them through the non-blocking `poll_results`.

use std::sync::{Arc, OnceLock};

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use contracts::{FlowCallback, FlowDelivery, FlowResult, FlowResultChannel, VisError};
use tracing::{error, trace, warn};

use crate::stats::ChannelStats;

/// Flow result channel fed by a callback
pub struct CallbackFlowChannel {
    tx: Sender<FlowResult>,
    rx: Receiver<FlowResult>,
    fatal: Arc<OnceLock<String>>,
    stats: Arc<ChannelStats>,
}

impl CallbackFlowChannel {
    /// Create a channel buffering up to `capacity` undelivered results
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx,
            rx,
            fatal: Arc::new(OnceLock::new()),
            stats: Arc::new(ChannelStats::new()),
        }
    }

    /// Callback to hand to the analysis library.
    ///
    /// When the queue is full the newest delivery is dropped and counted.
    /// A fatal delivery is never dropped.
    pub fn callback(&self) -> FlowCallback {
        let tx = self.tx.clone();
        let fatal = self.fatal.clone();
        let stats = self.stats.clone();

        Arc::new(move |delivery| match delivery {
            FlowDelivery::Result(result) => match tx.try_send(result) {
                Ok(()) => {
                    stats.record_received();
                }
                Err(TrySendError::Full(result)) => {
                    stats.record_dropped();
                    metrics::counter!("tfvis_flow_results_dropped_total").increment(1);
                    trace!(frame_id = result.frame_id.get(), "flow result dropped (queue full)");
                }
                Err(TrySendError::Closed(_)) => {
                    trace!("flow result channel closed");
                }
            },
            FlowDelivery::Fatal(message) => {
                error!(error = %message, "analysis library reported a fatal error");
                let _ = fatal.set(message);
            }
        })
    }

    /// Get stats reference
    pub fn stats(&self) -> Arc<ChannelStats> {
        self.stats.clone()
    }

    /// Number of results waiting to be polled
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl FlowResultChannel for CallbackFlowChannel {
    /// Drain queued results.
    ///
    /// Results queued before a fatal error are still handed out; the
    /// error is returned by the first poll that finds the queue empty.
    fn poll_results(&mut self) -> Result<Vec<FlowResult>, VisError> {
        let mut results = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(result) => results.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if results.is_empty() {
            if let Some(message) = self.fatal.get() {
                return Err(VisError::analysis_unavailable(message.clone()));
            }
        }

        Ok(results)
    }

    fn stop(&mut self) {
        if self.rx.close() {
            warn!(pending = self.rx.len(), "flow result channel closed");
        }
    }
}
