//! # Payment Gateway Adapter
//!
//! Outbound charge/refund calls to an external gateway, plus inbound webhook
//! verification and idempotent application.
//!
//! ## Webhook Idempotence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   gateway ──► WebhookEvent { reference, sequence, status, amount, sig } │
//! │                                                                         │
//! │   1. verify signature          (fail  -> log, drop, no state change)    │
//! │   2. resolve reference         (miss  -> log, drop)                     │
//! │   3. check amount              (drift -> log, drop)                     │
//! │   4. sequence > last applied?  (no    -> duplicate/out-of-date, drop)   │
//! │   5. adopt status, record seq  (yes   -> emit WebhookAction)            │
//! │                                                                         │
//! │   Sequences are gateway-authoritative: a strictly newer event carries   │
//! │   the gateway's current view, so the record adopts its status even      │
//! │   when intermediate events were lost or reordered. Replays and          │
//! │   reorderings converge on the same final record state.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Policy
//! Charge attempts that time out are retried with exponential backoff until
//! the configured budget runs out. Explicit gateway rejections are permanent
//! and never retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use warung_core::{
    CoreError, new_id, PaymentMethod, PaymentRecord, PaymentStatus,
};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Gateway Driver Trait
// =============================================================================

/// Successful charge initiation at the gateway.
#[derive(Debug, Clone)]
pub struct GatewayCharge {
    /// Gateway-assigned reference. Later webhooks key on this.
    pub gateway_reference: String,
}

/// Failure modes of an outbound gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response within the call timeout. Retryable.
    #[error("gateway call timed out")]
    Timeout,

    /// The gateway explicitly declined. Permanent.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
}

/// Outbound side of the gateway integration.
///
/// Production wires the real gateway client here; tests wire a scripted fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initiates a charge for the full order total.
    async fn charge(&self, order_id: &str, amount_minor: i64)
        -> Result<GatewayCharge, GatewayError>;

    /// Initiates a refund against a captured charge.
    async fn refund(&self, gateway_reference: &str, amount_minor: i64)
        -> Result<(), GatewayError>;
}

// =============================================================================
// Webhooks
// =============================================================================

/// Settlement status carried by a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Captured,
    Refunded,
    Failed,
}

impl std::fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookStatus::Captured => write!(f, "captured"),
            WebhookStatus::Refunded => write!(f, "refunded"),
            WebhookStatus::Failed => write!(f, "failed"),
        }
    }
}

/// An inbound settlement notification from the gateway.
///
/// `sequence` increases monotonically per reference on the gateway side; the
/// adapter uses it to make replays and reorderings no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub gateway_reference: String,
    pub sequence: u64,
    pub status: WebhookStatus,
    pub amount_minor: i64,
    pub signature: String,
}

/// Authenticity check for inbound webhooks.
pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, event: &WebhookEvent) -> bool;
}

/// Shared-key verifier: a keyed digest over the event's settlement fields.
pub struct SharedKeyVerifier {
    key: String,
}

impl SharedKeyVerifier {
    pub fn new(key: impl Into<String>) -> Self {
        SharedKeyVerifier { key: key.into() }
    }

    /// Computes the signature for an event's fields. The test harness uses
    /// this to forge valid webhooks against the same key.
    pub fn sign(&self, reference: &str, sequence: u64, status: WebhookStatus, amount: i64) -> String {
        // FNV-1a over the canonical field string. Not cryptographic; the
        // gateway contract only requires a shared-secret integrity check.
        let material = format!("{reference}:{sequence}:{status}:{amount}:{}", self.key);
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in material.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        format!("{hash:016x}")
    }
}

impl WebhookVerifier for SharedKeyVerifier {
    fn verify(&self, event: &WebhookEvent) -> bool {
        self.sign(
            &event.gateway_reference,
            event.sequence,
            event.status,
            event.amount_minor,
        ) == event.signature
    }
}

/// What the order engine must do after a webhook was verified and deduped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Funds captured: confirm the order (consume stock, transition to Paid).
    ConfirmPayment { order_id: String },
    /// Refund settled: re-credit stock and transition to Refunded.
    CompleteRefund { order_id: String },
    /// Refund settled before the capture event was observed. The capture is
    /// implied: confirm the order, then complete the refund in one step.
    SettleAndRefund { order_id: String },
    /// Charge failed at the gateway; the order stays AwaitingPayment for a
    /// retry or the expiry sweep.
    MarkFailed { order_id: String },
}

// =============================================================================
// Adapter
// =============================================================================

/// Owns payment records and mediates all gateway traffic.
///
/// One record per order. Webhook application serializes on the record's own
/// mutex, so bursts for different references never contend.
pub struct GatewayAdapter {
    driver: Arc<dyn PaymentGateway>,
    verifier: Arc<dyn WebhookVerifier>,
    call_timeout: Duration,
    retry_budget: Duration,
    records: RwLock<HashMap<String, Arc<Mutex<PaymentRecord>>>>,
    by_reference: RwLock<HashMap<String, String>>,
}

impl GatewayAdapter {
    pub fn new(
        driver: Arc<dyn PaymentGateway>,
        verifier: Arc<dyn WebhookVerifier>,
        call_timeout: Duration,
        retry_budget: Duration,
    ) -> Self {
        GatewayAdapter {
            driver,
            verifier,
            call_timeout,
            retry_budget,
            records: RwLock::new(HashMap::new()),
            by_reference: RwLock::new(HashMap::new()),
        }
    }

    async fn record(&self, order_id: &str) -> Option<Arc<Mutex<PaymentRecord>>> {
        self.records.read().await.get(order_id).cloned()
    }

    async fn install_record(&self, record: PaymentRecord) {
        let order_id = record.order_id.clone();
        let reference = record.gateway_reference.clone();
        self.records
            .write()
            .await
            .insert(order_id.clone(), Arc::new(Mutex::new(record)));
        self.by_reference.write().await.insert(reference, order_id);
    }

    /// Rejects re-initiation when a prior payment already settled or is in a
    /// refund flow. A Pending or Failed record may be charged again.
    async fn guard_reinitiation(&self, order_id: &str) -> EngineResult<()> {
        if let Some(existing) = self.record(order_id).await {
            let record = existing.lock().await;
            match record.status {
                PaymentStatus::Captured
                | PaymentStatus::Refunded
                | PaymentStatus::PendingRefund => {
                    return Err(EngineError::PaymentAlreadySettled {
                        order_id: order_id.to_string(),
                    });
                }
                PaymentStatus::Pending | PaymentStatus::Failed => {}
            }
        }
        Ok(())
    }

    /// Initiates a gateway charge, retrying timeouts with exponential backoff
    /// within the configured budget.
    ///
    /// On success a Pending record is installed keyed by the gateway's
    /// reference; capture happens later via webhook.
    pub async fn initiate_charge(
        &self,
        order_id: &str,
        amount_minor: i64,
    ) -> EngineResult<PaymentRecord> {
        self.guard_reinitiation(order_id).await?;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.retry_budget))
            .build();

        let charge = backoff::future::retry(policy, || async {
            match tokio::time::timeout(
                self.call_timeout,
                self.driver.charge(order_id, amount_minor),
            )
            .await
            {
                Ok(Ok(charge)) => Ok(charge),
                Ok(Err(GatewayError::Rejected(reason))) => {
                    Err(backoff::Error::permanent(CoreError::GatewayRejected { reason }))
                }
                Ok(Err(GatewayError::Timeout)) | Err(_) => {
                    debug!(order_id, "Charge attempt timed out, backing off");
                    Err(backoff::Error::transient(CoreError::GatewayTimeout {
                        timeout_secs: self.call_timeout.as_secs(),
                    }))
                }
            }
        })
        .await
        .map_err(EngineError::from)?;

        let now = chrono::Utc::now();
        let record = PaymentRecord {
            order_id: order_id.to_string(),
            gateway_reference: charge.gateway_reference.clone(),
            method: PaymentMethod::Gateway,
            amount_minor,
            status: PaymentStatus::Pending,
            last_webhook_sequence: 0,
            created_at: now,
            updated_at: now,
        };
        info!(
            order_id,
            gateway_reference = %record.gateway_reference,
            amount_minor,
            "Gateway charge initiated"
        );
        self.install_record(record.clone()).await;
        Ok(record)
    }

    /// Records a cash tender. Cash captures synchronously at the drawer, so
    /// the record is born Captured.
    pub async fn record_cash_payment(
        &self,
        order_id: &str,
        amount_minor: i64,
    ) -> EngineResult<PaymentRecord> {
        self.guard_reinitiation(order_id).await?;
        let now = chrono::Utc::now();
        let record = PaymentRecord {
            order_id: order_id.to_string(),
            gateway_reference: format!("CASH-{}", new_id()),
            method: PaymentMethod::Cash,
            amount_minor,
            status: PaymentStatus::Captured,
            last_webhook_sequence: 0,
            created_at: now,
            updated_at: now,
        };
        info!(order_id, amount_minor, "Cash payment captured");
        self.install_record(record.clone()).await;
        Ok(record)
    }

    /// Initiates a refund for a captured payment.
    ///
    /// Cash refunds settle at the drawer and go straight to Refunded. Gateway
    /// refunds move the record to PendingRefund on a successful initiation;
    /// final settlement arrives by webhook. A single attempt, no retries: a
    /// failed initiation leaves the payment Captured and the caller reports
    /// [`CoreError::RefundFailed`].
    pub async fn initiate_refund(&self, order_id: &str) -> EngineResult<PaymentRecord> {
        let record = self
            .record(order_id)
            .await
            .ok_or_else(|| CoreError::PaymentNotFound(order_id.to_string()))?;
        let mut record = record.lock().await;

        if record.status != PaymentStatus::Captured {
            return Err(EngineError::from(CoreError::RefundFailed {
                order_id: order_id.to_string(),
                reason: format!("payment is {:?}, refunds require Captured", record.status),
            }));
        }

        match record.method {
            PaymentMethod::Cash => {
                record.status = PaymentStatus::Refunded;
                record.updated_at = chrono::Utc::now();
                info!(order_id, "Cash refund settled at drawer");
            }
            PaymentMethod::Gateway => {
                let call = tokio::time::timeout(
                    self.call_timeout,
                    self.driver
                        .refund(&record.gateway_reference, record.amount_minor),
                )
                .await;
                match call {
                    Ok(Ok(())) => {
                        record.status = PaymentStatus::PendingRefund;
                        record.updated_at = chrono::Utc::now();
                        info!(
                            order_id,
                            gateway_reference = %record.gateway_reference,
                            "Gateway refund initiated, awaiting settlement webhook"
                        );
                    }
                    Ok(Err(err)) => {
                        warn!(order_id, error = %err, "Gateway refund rejected");
                        return Err(EngineError::from(CoreError::RefundFailed {
                            order_id: order_id.to_string(),
                            reason: err.to_string(),
                        }));
                    }
                    Err(_) => {
                        warn!(order_id, "Gateway refund call timed out");
                        return Err(EngineError::from(CoreError::RefundFailed {
                            order_id: order_id.to_string(),
                            reason: "gateway call timed out".into(),
                        }));
                    }
                }
            }
        }
        Ok(record.clone())
    }

    /// Verifies, dedupes and applies an inbound webhook.
    ///
    /// Returns the action the order engine must take, or `None` when the
    /// event was dropped (bad signature, unknown reference, amount drift) or
    /// was a duplicate/out-of-date delivery. Dropping is deliberate: webhook
    /// endpoints must ack everything they can safely ignore.
    pub async fn apply_webhook(&self, event: &WebhookEvent) -> EngineResult<Option<WebhookAction>> {
        if !self.verifier.verify(event) {
            warn!(
                gateway_reference = %event.gateway_reference,
                sequence = event.sequence,
                "Webhook signature verification failed, dropping"
            );
            return Ok(None);
        }

        let order_id = match self
            .by_reference
            .read()
            .await
            .get(&event.gateway_reference)
            .cloned()
        {
            Some(order_id) => order_id,
            None => {
                warn!(
                    gateway_reference = %event.gateway_reference,
                    "Webhook for unknown reference, dropping"
                );
                return Ok(None);
            }
        };
        let record = self
            .record(&order_id)
            .await
            .ok_or_else(|| CoreError::PaymentNotFound(order_id.clone()))?;
        let mut record = record.lock().await;

        if event.amount_minor != record.amount_minor {
            warn!(
                order_id,
                expected = record.amount_minor,
                got = event.amount_minor,
                "Webhook amount drift, dropping"
            );
            return Ok(None);
        }

        if event.sequence <= record.last_webhook_sequence {
            debug!(
                order_id,
                sequence = event.sequence,
                last_applied = record.last_webhook_sequence,
                "Duplicate or out-of-date webhook, no-op"
            );
            return Ok(None);
        }
        record.last_webhook_sequence = event.sequence;
        record.updated_at = chrono::Utc::now();

        // The newest sequence carries the gateway's current view of the
        // settlement, so the record adopts its status. Earlier events that
        // were lost or reordered arrive with stale sequences and no-op above.
        let action = match (event.status, record.status) {
            (WebhookStatus::Captured, PaymentStatus::Pending | PaymentStatus::Failed) => {
                record.status = PaymentStatus::Captured;
                Some(WebhookAction::ConfirmPayment {
                    order_id: order_id.clone(),
                })
            }
            (WebhookStatus::Refunded, PaymentStatus::Captured | PaymentStatus::PendingRefund) => {
                record.status = PaymentStatus::Refunded;
                Some(WebhookAction::CompleteRefund {
                    order_id: order_id.clone(),
                })
            }
            // The refund settled before its capture event arrived. The
            // capture is implied by the refund, so the engine must run both
            // steps to land on the same state as the in-order delivery.
            (WebhookStatus::Refunded, PaymentStatus::Pending | PaymentStatus::Failed) => {
                record.status = PaymentStatus::Refunded;
                Some(WebhookAction::SettleAndRefund {
                    order_id: order_id.clone(),
                })
            }
            (WebhookStatus::Failed, PaymentStatus::Pending) => {
                record.status = PaymentStatus::Failed;
                Some(WebhookAction::MarkFailed {
                    order_id: order_id.clone(),
                })
            }
            // Same status again, or a regression a sane gateway never emits
            // (Captured or Failed after a refund): keep the record, ack the
            // event.
            (status, current) => {
                debug!(order_id, ?status, ?current, "Webhook does not advance record");
                None
            }
        };
        Ok(action)
    }

    /// The payment record for an order, if one exists.
    pub async fn payment(&self, order_id: &str) -> Option<PaymentRecord> {
        let record = self.record(order_id).await?;
        let record = record.lock().await;
        Some(record.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted gateway: behaves per the mode set by the test.
    struct ScriptedGateway {
        mode: std::sync::Mutex<Mode>,
        charges: std::sync::Mutex<u32>,
    }

    #[derive(Clone, Copy)]
    enum Mode {
        Accept,
        Timeout,
        Reject,
    }

    impl ScriptedGateway {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(ScriptedGateway {
                mode: std::sync::Mutex::new(mode),
                charges: std::sync::Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn charge(
            &self,
            order_id: &str,
            _amount_minor: i64,
        ) -> Result<GatewayCharge, GatewayError> {
            *self.charges.lock().unwrap() += 1;
            match *self.mode.lock().unwrap() {
                Mode::Accept => Ok(GatewayCharge {
                    gateway_reference: format!("REF-{order_id}"),
                }),
                Mode::Timeout => Err(GatewayError::Timeout),
                Mode::Reject => Err(GatewayError::Rejected("card declined".into())),
            }
        }

        async fn refund(
            &self,
            _gateway_reference: &str,
            _amount_minor: i64,
        ) -> Result<(), GatewayError> {
            match *self.mode.lock().unwrap() {
                Mode::Accept => Ok(()),
                Mode::Timeout => Err(GatewayError::Timeout),
                Mode::Reject => Err(GatewayError::Rejected("not refundable".into())),
            }
        }
    }

    fn adapter(driver: Arc<ScriptedGateway>) -> (GatewayAdapter, SharedKeyVerifier) {
        let verifier = Arc::new(SharedKeyVerifier::new("test-key"));
        (
            GatewayAdapter::new(
                driver,
                verifier,
                Duration::from_millis(200),
                Duration::from_millis(600),
            ),
            SharedKeyVerifier::new("test-key"),
        )
    }

    fn signed(
        signer: &SharedKeyVerifier,
        reference: &str,
        sequence: u64,
        status: WebhookStatus,
        amount: i64,
    ) -> WebhookEvent {
        WebhookEvent {
            gateway_reference: reference.into(),
            sequence,
            status,
            amount_minor: amount,
            signature: signer.sign(reference, sequence, status, amount),
        }
    }

    #[tokio::test]
    async fn charge_installs_a_pending_record() {
        let (adapter, _signer) = adapter(ScriptedGateway::new(Mode::Accept));
        let record = adapter.initiate_charge("ord-1", 25_000).await.unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.gateway_reference, "REF-ord-1");
    }

    #[tokio::test]
    async fn rejection_is_permanent_and_not_retried() {
        let driver = ScriptedGateway::new(Mode::Reject);
        let (adapter, _signer) = adapter(driver.clone());
        let err = adapter.initiate_charge("ord-1", 25_000).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::GatewayRejected { .. })
        ));
        assert_eq!(*driver.charges.lock().unwrap(), 1);
        assert!(adapter.payment("ord-1").await.is_none());
    }

    #[tokio::test]
    async fn timeouts_are_retried_until_the_budget_runs_out() {
        let driver = ScriptedGateway::new(Mode::Timeout);
        let (adapter, _signer) = adapter(driver.clone());
        let err = adapter.initiate_charge("ord-1", 25_000).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(*driver.charges.lock().unwrap() > 1);
    }

    #[tokio::test]
    async fn double_charge_after_capture_is_rejected() {
        let (adapter, signer) = adapter(ScriptedGateway::new(Mode::Accept));
        adapter.initiate_charge("ord-1", 25_000).await.unwrap();
        let event = signed(&signer, "REF-ord-1", 1, WebhookStatus::Captured, 25_000);
        adapter.apply_webhook(&event).await.unwrap();

        let err = adapter.initiate_charge("ord-1", 25_000).await.unwrap_err();
        assert!(matches!(err, EngineError::PaymentAlreadySettled { .. }));
    }

    #[tokio::test]
    async fn webhook_replay_is_a_no_op() {
        let (adapter, signer) = adapter(ScriptedGateway::new(Mode::Accept));
        adapter.initiate_charge("ord-1", 25_000).await.unwrap();

        let event = signed(&signer, "REF-ord-1", 1, WebhookStatus::Captured, 25_000);
        let first = adapter.apply_webhook(&event).await.unwrap();
        assert!(matches!(first, Some(WebhookAction::ConfirmPayment { .. })));

        // Same event again, and a lower sequence with a different status.
        assert!(adapter.apply_webhook(&event).await.unwrap().is_none());
        let stale = signed(&signer, "REF-ord-1", 1, WebhookStatus::Failed, 25_000);
        assert!(adapter.apply_webhook(&stale).await.unwrap().is_none());
        assert_eq!(
            adapter.payment("ord-1").await.unwrap().status,
            PaymentStatus::Captured
        );
    }

    #[tokio::test]
    async fn out_of_order_delivery_converges() {
        let (adapter, signer) = adapter(ScriptedGateway::new(Mode::Accept));
        adapter.initiate_charge("ord-1", 25_000).await.unwrap();

        // Gateway emitted 1:Captured, 2:Refunded, 3:Refunded(final); we see
        // 3 first, then 1, then 2.
        let e3 = signed(&signer, "REF-ord-1", 3, WebhookStatus::Refunded, 25_000);
        let e1 = signed(&signer, "REF-ord-1", 1, WebhookStatus::Captured, 25_000);
        let e2 = signed(&signer, "REF-ord-1", 2, WebhookStatus::Refunded, 25_000);

        // seq 3 arrives while Pending: the record adopts the refund and asks
        // the engine to settle and refund in one step. The stragglers are
        // out-of-date and no-op.
        assert!(matches!(
            adapter.apply_webhook(&e3).await.unwrap(),
            Some(WebhookAction::SettleAndRefund { .. })
        ));
        assert!(adapter.apply_webhook(&e1).await.unwrap().is_none());
        assert!(adapter.apply_webhook(&e2).await.unwrap().is_none());

        // Same terminal record state as the in-order delivery [1, 2, 3].
        let record = adapter.payment("ord-1").await.unwrap();
        assert_eq!(record.status, PaymentStatus::Refunded);
        assert_eq!(record.last_webhook_sequence, 3);
    }

    #[tokio::test]
    async fn bad_signature_is_dropped() {
        let (adapter, _signer) = adapter(ScriptedGateway::new(Mode::Accept));
        adapter.initiate_charge("ord-1", 25_000).await.unwrap();

        let forged = WebhookEvent {
            gateway_reference: "REF-ord-1".into(),
            sequence: 1,
            status: WebhookStatus::Captured,
            amount_minor: 25_000,
            signature: "deadbeefdeadbeef".into(),
        };
        assert!(adapter.apply_webhook(&forged).await.unwrap().is_none());
        assert_eq!(
            adapter.payment("ord-1").await.unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn amount_drift_is_dropped() {
        let (adapter, signer) = adapter(ScriptedGateway::new(Mode::Accept));
        adapter.initiate_charge("ord-1", 25_000).await.unwrap();
        let drifted = signed(&signer, "REF-ord-1", 1, WebhookStatus::Captured, 99_000);
        assert!(adapter.apply_webhook(&drifted).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cash_refund_settles_immediately() {
        let (adapter, _signer) = adapter(ScriptedGateway::new(Mode::Accept));
        adapter.record_cash_payment("ord-1", 12_000).await.unwrap();
        let record = adapter.initiate_refund("ord-1").await.unwrap();
        assert_eq!(record.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn gateway_refund_timeout_leaves_payment_captured() {
        let driver = ScriptedGateway::new(Mode::Accept);
        let (adapter, signer) = adapter(driver.clone());
        adapter.initiate_charge("ord-1", 25_000).await.unwrap();
        let capture = signed(&signer, "REF-ord-1", 1, WebhookStatus::Captured, 25_000);
        adapter.apply_webhook(&capture).await.unwrap();

        *driver.mode.lock().unwrap() = Mode::Timeout;
        let err = adapter.initiate_refund("ord-1").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::RefundFailed { .. })
        ));
        assert_eq!(
            adapter.payment("ord-1").await.unwrap().status,
            PaymentStatus::Captured
        );
    }
}
