//! Delivery confirmation for dispatched messages
//!
//! The watcher walks the pending set once per pass, asking the destination
//! chain whether each message has been processed, and sleeps between passes.
//! The whole loop runs inside one `tokio::time::timeout`, so the deadline
//! covers every check and every sleep:
//!
//! ```text
//! Tracking --(all delivered)--> AllDelivered
//!     \------(deadline)-------> TimedOut
//! ```

use std::time::Duration;

use alloy_primitives::{hex, B256};
use tracing::{error, info, warn, Instrument};

use crate::error::{RelayError, Result};
use crate::protocol::BridgeMessage;
use crate::spans;
use crate::traits::DeliveryChecker;

/// A message between dispatch and delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightTransfer {
    pub message: BridgeMessage,
    pub origin_chain: String,
    pub destination_chain: String,
}

impl InFlightTransfer {
    pub fn id(&self) -> B256 {
        self.message.id
    }
}

/// Summary of a batch that was fully delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Message IDs in the order their delivery was observed.
    pub delivered: Vec<B256>,
    /// Number of passes over the pending set.
    pub passes: u32,
}

#[derive(Debug, Clone)]
pub struct DeliveryWatcher<D> {
    checker: D,
}

impl<D: DeliveryChecker> DeliveryWatcher<D> {
    pub fn new(checker: D) -> Self {
        Self { checker }
    }

    /// Waits until every transfer is delivered.
    ///
    /// Fails with [`RelayError::TimedOut`] listing the still-pending message
    /// IDs once `timeout` elapses. A failed check is logged and the message
    /// stays pending.
    pub async fn await_all_delivered(
        &self,
        transfers: Vec<InFlightTransfer>,
        per_check_delay: Duration,
        timeout: Duration,
    ) -> Result<DeliveryReport> {
        let span = spans::await_delivery(
            transfers.len(),
            timeout.as_secs(),
            per_check_delay.as_secs(),
        );

        let mut pending = transfers;
        let mut report = DeliveryReport::default();

        let polled = tokio::time::timeout(
            timeout,
            self.poll_until_delivered(&mut pending, &mut report, per_check_delay),
        )
        .instrument(span.clone())
        .await;

        match polled {
            Ok(()) => {
                info!(
                    parent: &span,
                    delivered = report.delivered.len(),
                    passes = report.passes,
                    event = "all_messages_delivered"
                );
                Ok(report)
            }
            Err(_) => {
                let pending: Vec<B256> = pending.iter().map(InFlightTransfer::id).collect();
                span.in_scope(|| {
                    spans::record_error_with_context(
                        "DeliveryTimeout",
                        &format!("{} message(s) not delivered", pending.len()),
                        Some(&format!("Timeout: {} seconds", timeout.as_secs())),
                    )
                });
                error!(
                    parent: &span,
                    pending = pending.len(),
                    timeout_secs = timeout.as_secs(),
                    event = "delivery_timeout"
                );
                Err(RelayError::TimedOut { timeout, pending })
            }
        }
    }

    async fn poll_until_delivered(
        &self,
        pending: &mut Vec<InFlightTransfer>,
        report: &mut DeliveryReport,
        per_check_delay: Duration,
    ) {
        while !pending.is_empty() {
            report.passes += 1;

            // Entries leave the set only once their delivery is confirmed, so
            // cancellation at any await leaves `pending` accurate.
            let mut i = 0;
            while i < pending.len() {
                let transfer = &pending[i];
                match self.checker.is_delivered(transfer).await {
                    Ok(true) => {
                        info!(
                            message_id = %hex::encode(transfer.id()),
                            origin_chain = %transfer.origin_chain,
                            destination_chain = %transfer.destination_chain,
                            event = "message_delivered"
                        );
                        let delivered = pending.remove(i);
                        report.delivered.push(delivered.id());
                    }
                    Ok(false) => {
                        info!(
                            message_id = %hex::encode(transfer.id()),
                            origin_chain = %transfer.origin_chain,
                            destination_chain = %transfer.destination_chain,
                            event = "message_pending"
                        );
                        i += 1;
                    }
                    Err(e) => {
                        warn!(
                            message_id = %hex::encode(transfer.id()),
                            destination_chain = %transfer.destination_chain,
                            error = %e,
                            event = "delivery_check_failed"
                        );
                        i += 1;
                    }
                }
            }

            if pending.is_empty() {
                break;
            }
            tokio::time::sleep(per_check_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_transfer, FakeDeliveryChecker};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_delivered_on_different_passes() {
        let checker = FakeDeliveryChecker::new();
        let first = sample_transfer(1);
        let second = sample_transfer(2);
        checker.deliver_on_check(first.id(), 1);
        checker.deliver_on_check(second.id(), 3);

        let start = Instant::now();
        let report = DeliveryWatcher::new(checker.clone())
            .await_all_delivered(
                vec![first.clone(), second.clone()],
                Duration::from_secs(5),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert_eq!(report.passes, 3);
        assert_eq!(report.delivered, vec![first.id(), second.id()]);
        assert_eq!(checker.check_count(first.id()), 1);
        assert_eq!(checker.check_count(second.id()), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_returns_immediately() {
        let report = DeliveryWatcher::new(FakeDeliveryChecker::new())
            .await_all_delivered(vec![], Duration::from_secs(5), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_pending_ids() {
        let checker = FakeDeliveryChecker::new();
        let delivered = sample_transfer(1);
        let stuck = sample_transfer(2);
        checker.deliver_on_check(delivered.id(), 1);

        let start = Instant::now();
        let result = DeliveryWatcher::new(checker.clone())
            .await_all_delivered(
                vec![delivered, stuck.clone()],
                Duration::from_secs(5),
                Duration::from_secs(30),
            )
            .await;

        match result {
            Err(RelayError::TimedOut { timeout, pending }) => {
                assert_eq!(timeout, Duration::from_secs(30));
                assert_eq!(pending, vec![stuck.id()]);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert!(checker.check_count(stuck.id()) >= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_checks_stay_pending() {
        let checker = FakeDeliveryChecker::new();
        let transfer = sample_transfer(1);
        checker.fail_checks(transfer.id(), 2);
        checker.deliver_on_check(transfer.id(), 3);

        let report = DeliveryWatcher::new(checker.clone())
            .await_all_delivered(
                vec![transfer.clone()],
                Duration::from_secs(5),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert_eq!(report.passes, 3);
        assert_eq!(report.delivered, vec![transfer.id()]);
    }
}
