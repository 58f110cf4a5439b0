//! # Order Engine
//!
//! The coordinator: every terminal-facing operation enters here, gets scoped
//! against the registry, runs the order state machine, and touches inventory
//! and payments in the required atomic units.
//!
//! ## Atomic Unit of Confirmation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  confirm payment (cashier, cash drawer, or gateway webhook)             │
//! │                                                                         │
//! │    lock(order)                                                          │
//! │      require AwaitingPayment + a Captured payment record                │
//! │      resolve recipe consumption from the catalog                        │
//! │      ledger.apply(-consumption)      ── all-or-nothing                  │
//! │      order.transition(Paid)                                             │
//! │      publish OrderStatusChanged + PaymentCaptured                       │
//! │    unlock(order)                                                        │
//! │                                                                         │
//! │  Insufficient stock fails BEFORE the transition: payment stays          │
//! │  Captured, order stays AwaitingPayment, no partial decrement.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking Order
//! Order mutex first, then the outlet's inventory mutex inside the ledger.
//! The ledger never takes order locks, so the hierarchy is acyclic.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use warung_core::recipe::{as_deltas, resolve_consumption};
use warung_core::validation::{validate_line_item_drafts, validate_table_label};
use warung_core::{
    generate_order_number, new_id, BusinessContext, CoreError, LineItemDraft, MovementReason,
    Order, OrderLineItem, OrderStatus, PaymentStatus, ServiceMode, GATEWAY_ACTOR, SWEEP_ACTOR,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::EngineEvent;
use crate::gateway::{GatewayAdapter, PaymentGateway, WebhookAction, WebhookEvent, WebhookVerifier};
use crate::hub::{BroadcastHub, Subscription};
use crate::ledger::InventoryLedger;
use crate::registry::BusinessRegistry;

// =============================================================================
// Engine
// =============================================================================

/// The transactional core. One instance per process, shared via `Arc`.
pub struct OrderEngine {
    config: EngineConfig,
    registry: BusinessRegistry,
    ledger: InventoryLedger,
    payments: GatewayAdapter,
    hub: Arc<BroadcastHub>,
    orders: RwLock<HashMap<String, Arc<Mutex<Order>>>>,
    /// Receipt counters, outlet_id -> (yyyymmdd, last sequence). Numbers
    /// restart at 0001 per outlet each day.
    order_counters: Mutex<HashMap<String, (String, u32)>>,
}

impl OrderEngine {
    /// Wires the engine together around a gateway driver and webhook verifier.
    pub fn new(
        config: EngineConfig,
        driver: Arc<dyn PaymentGateway>,
        verifier: Arc<dyn WebhookVerifier>,
    ) -> Arc<Self> {
        let hub = Arc::new(BroadcastHub::new(config.hub_buffer));
        let payments = GatewayAdapter::new(
            driver,
            verifier,
            config.gateway_timeout(),
            config.gateway_retry_budget(),
        );
        Arc::new(OrderEngine {
            registry: BusinessRegistry::new(),
            ledger: InventoryLedger::new(hub.clone()),
            payments,
            hub,
            orders: RwLock::new(HashMap::new()),
            order_counters: Mutex::new(HashMap::new()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &BusinessRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn gateway(&self) -> &GatewayAdapter {
        &self.payments
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn order_handle(&self, order_id: &str) -> EngineResult<Arc<Mutex<Order>>> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| EngineError::from(CoreError::OrderNotFound(order_id.to_string())))
    }

    /// Mints the next receipt number for an outlet, resetting the counter at
    /// the day boundary.
    async fn next_order_number(&self, outlet_id: &str, now: DateTime<Utc>) -> String {
        let day = now.format("%Y%m%d").to_string();
        let mut counters = self.order_counters.lock().await;
        let counter = counters
            .entry(outlet_id.to_string())
            .or_insert_with(|| (day.clone(), 0));
        if counter.0 != day {
            *counter = (day.clone(), 0);
        }
        counter.1 += 1;
        generate_order_number(now, counter.1)
    }

    /// Scope check for an already-loaded order against the caller's context.
    fn check_scope(ctx: &BusinessContext, order: &Order) -> EngineResult<()> {
        if order.business_id != ctx.business_id || order.outlet_id != ctx.outlet_id {
            return Err(EngineError::ScopeViolation {
                business_id: ctx.business_id.clone(),
                outlet_id: ctx.outlet_id.clone(),
            });
        }
        Ok(())
    }

    /// Consumes stock and moves the order to Paid. Caller holds the order
    /// lock and has already checked that the payment record is Captured.
    async fn confirm_locked(&self, order: &mut Order, actor: &str) -> EngineResult<()> {
        if order.status != OrderStatus::AwaitingPayment {
            return Err(EngineError::from(CoreError::InvalidTransition {
                order_id: order.id.clone(),
                from: order.status,
                to: OrderStatus::Paid,
            }));
        }

        let catalog = self.registry.catalog_for(&order.outlet_id).await;
        let consumption = resolve_consumption(&order.outlet_id, &order.line_items, &catalog)?;
        self.ledger
            .apply(
                &order.outlet_id,
                &as_deltas(&consumption, -1),
                MovementReason::OrderConsumption,
                Some(&order.id),
            )
            .await?;

        // Mark which lines actually consumed tracked ingredients.
        for item in &mut order.line_items {
            let tracks = catalog
                .get(&item.product_variant_id)
                .map(|v| v.tracks_ingredients())
                .unwrap_or(false);
            if tracks {
                item.ingredient_reservation_id = Some(new_id());
            }
        }

        let transition = order.transition(OrderStatus::Paid, actor)?;
        info!(order_id = %order.id, order_number = %order.order_number, actor, "Order paid");
        self.hub
            .publish(
                &order.outlet_id,
                EngineEvent::OrderStatusChanged {
                    order_id: order.id.clone(),
                    outlet_id: order.outlet_id.clone(),
                    from: transition.from,
                    to: transition.to,
                    actor: transition.actor.clone(),
                    at: transition.at,
                },
            )
            .await;
        if let Some(payment) = self.payments.payment(&order.id).await {
            self.hub
                .publish(
                    &order.outlet_id,
                    EngineEvent::PaymentCaptured {
                        order_id: order.id.clone(),
                        outlet_id: order.outlet_id.clone(),
                        gateway_reference: payment.gateway_reference,
                        amount_minor: payment.amount_minor,
                    },
                )
                .await;
        }
        Ok(())
    }

    async fn publish_status_change(
        &self,
        order: &Order,
        transition: &warung_core::StateTransition,
    ) {
        self.hub
            .publish(
                &order.outlet_id,
                EngineEvent::OrderStatusChanged {
                    order_id: order.id.clone(),
                    outlet_id: order.outlet_id.clone(),
                    from: transition.from,
                    to: transition.to,
                    actor: transition.actor.clone(),
                    at: transition.at,
                },
            )
            .await;
    }

    // =========================================================================
    // Order Lifecycle
    // =========================================================================

    /// Creates a Draft order, snapshotting sku/name/price from the currently
    /// active catalog variants.
    pub async fn create_order(
        &self,
        ctx: &BusinessContext,
        service_mode: ServiceMode,
        table_label: Option<&str>,
        drafts: &[LineItemDraft],
    ) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        validate_line_item_drafts(drafts).map_err(CoreError::from)?;
        if let Some(label) = table_label {
            validate_table_label(label).map_err(CoreError::from)?;
        }

        let mut line_items = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let variant = self
                .registry
                .variant(&ctx.outlet_id, &draft.product_variant_id)
                .await
                .filter(|v| v.is_active)
                .ok_or_else(|| CoreError::ProductNotFound {
                    outlet_id: ctx.outlet_id.clone(),
                    product_variant_id: draft.product_variant_id.clone(),
                })?;
            line_items.push(OrderLineItem {
                id: new_id(),
                product_variant_id: variant.id.clone(),
                sku_snapshot: variant.sku.clone(),
                name_snapshot: variant.name.clone(),
                unit_price_minor: variant.price_minor,
                quantity: draft.quantity,
                ingredient_reservation_id: None,
            });
        }

        let now = Utc::now();
        let order_number = self.next_order_number(&ctx.outlet_id, now).await;
        let tax_rate = self.registry.tax_rate(&ctx.outlet_id).await?;
        let order = Order::new(
            ctx.business_id.clone(),
            ctx.outlet_id.clone(),
            order_number,
            service_mode,
            table_label.map(str::to_string),
            line_items,
            tax_rate,
            now,
        );
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            outlet_id = %ctx.outlet_id,
            total_minor = order.total_minor,
            "Order created"
        );

        self.orders
            .write()
            .await
            .insert(order.id.clone(), Arc::new(Mutex::new(order.clone())));
        self.hub
            .publish(
                &ctx.outlet_id,
                EngineEvent::OrderCreated {
                    order: order.clone(),
                },
            )
            .await;
        Ok(order)
    }

    /// Submits a Draft order for gateway payment.
    ///
    /// The charge call happens before the transition: if the gateway never
    /// answers, the order is still Draft and the cashier may retry or switch
    /// to cash.
    pub async fn initiate_charge(&self, ctx: &BusinessContext, order_id: &str) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        let handle = self.order_handle(order_id).await?;
        let mut order = handle.lock().await;
        Self::check_scope(ctx, &order)?;

        if order.status != OrderStatus::Draft {
            return Err(EngineError::from(CoreError::InvalidTransition {
                order_id: order.id.clone(),
                from: order.status,
                to: OrderStatus::AwaitingPayment,
            }));
        }

        self.payments
            .initiate_charge(&order.id, order.total_minor)
            .await?;
        let transition = order.transition(OrderStatus::AwaitingPayment, &ctx.actor)?;
        self.publish_status_change(&order, &transition).await;
        Ok(order.clone())
    }

    /// Cash tender at the drawer: submit and confirm in one synchronous unit.
    pub async fn tender_cash(&self, ctx: &BusinessContext, order_id: &str) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        let handle = self.order_handle(order_id).await?;
        let mut order = handle.lock().await;
        Self::check_scope(ctx, &order)?;

        let transition = order.transition(OrderStatus::AwaitingPayment, &ctx.actor)?;
        self.publish_status_change(&order, &transition).await;

        self.payments
            .record_cash_payment(&order.id, order.total_minor)
            .await?;
        self.confirm_locked(&mut order, &ctx.actor).await?;
        Ok(order.clone())
    }

    /// Manual confirmation by an operator, for gateways whose capture is
    /// checked out-of-band. Requires a Captured payment record.
    pub async fn confirm_payment(&self, ctx: &BusinessContext, order_id: &str) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        let handle = self.order_handle(order_id).await?;
        {
            let order = handle.lock().await;
            Self::check_scope(ctx, &order)?;
        }
        self.confirm_captured(order_id, &ctx.actor).await
    }

    /// Confirms an order whose payment record is already Captured.
    async fn confirm_captured(&self, order_id: &str, actor: &str) -> EngineResult<Order> {
        let payment = self
            .payments
            .payment(order_id)
            .await
            .ok_or_else(|| CoreError::PaymentNotFound(order_id.to_string()))?;
        if payment.status != PaymentStatus::Captured {
            return Err(EngineError::from(CoreError::ConsistencyViolation {
                detail: format!(
                    "confirm requires a captured payment, order {order_id} has {:?}",
                    payment.status
                ),
            }));
        }
        let handle = self.order_handle(order_id).await?;
        let mut order = handle.lock().await;
        self.confirm_locked(&mut order, actor).await?;
        Ok(order.clone())
    }

    /// Advances a paid order one preparation stage. The target must be
    /// exactly the next stage for the order's service mode.
    pub async fn advance_kitchen_stage(
        &self,
        ctx: &BusinessContext,
        order_id: &str,
        target: OrderStatus,
    ) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        let handle = self.order_handle(order_id).await?;
        let mut order = handle.lock().await;
        Self::check_scope(ctx, &order)?;

        // A refund awaiting gateway settlement will move the order to
        // Refunded; advancing past Paid in the meantime would make that
        // settlement an illegal transition.
        if let Some(payment) = self.payments.payment(order_id).await {
            if payment.status == PaymentStatus::PendingRefund {
                return Err(EngineError::RefundInFlight {
                    order_id: order.id.clone(),
                });
            }
        }

        let transition = order.advance_stage(target, &ctx.actor)?;
        self.publish_status_change(&order, &transition).await;
        Ok(order.clone())
    }

    /// Assigns or moves a dine-in order's table. Allowed any time before the
    /// order reaches a terminal state.
    pub async fn assign_table(
        &self,
        ctx: &BusinessContext,
        order_id: &str,
        table_label: &str,
    ) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        validate_table_label(table_label).map_err(CoreError::from)?;
        let handle = self.order_handle(order_id).await?;
        let mut order = handle.lock().await;
        Self::check_scope(ctx, &order)?;

        if order.status.is_terminal() {
            return Err(EngineError::from(CoreError::ConsistencyViolation {
                detail: format!("order {} is {:?}, tables are fixed", order.id, order.status),
            }));
        }
        order.table_label = Some(table_label.to_string());
        order.updated_at = Utc::now();
        self.hub
            .publish(
                &order.outlet_id,
                EngineEvent::TableAssigned {
                    order_id: order.id.clone(),
                    outlet_id: order.outlet_id.clone(),
                    table_label: table_label.to_string(),
                },
            )
            .await;
        Ok(order.clone())
    }

    /// Cancels an unpaid order. No inventory has been consumed yet, so there
    /// is nothing to re-credit.
    pub async fn cancel(&self, ctx: &BusinessContext, order_id: &str) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        let handle = self.order_handle(order_id).await?;
        let mut order = handle.lock().await;
        Self::check_scope(ctx, &order)?;

        let transition = order.transition(OrderStatus::Cancelled, &ctx.actor)?;
        info!(order_id = %order.id, actor = %ctx.actor, "Order cancelled");
        self.publish_status_change(&order, &transition).await;
        Ok(order.clone())
    }

    /// Refunds a paid or completed order.
    ///
    /// Cash settles at the drawer, so the order finalizes immediately.
    /// Gateway refunds only move the payment to PendingRefund here; the
    /// stock re-credit and the Refunded transition wait for the settlement
    /// webhook. A failed initiation changes nothing.
    pub async fn refund(&self, ctx: &BusinessContext, order_id: &str) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        let handle = self.order_handle(order_id).await?;
        {
            let order = handle.lock().await;
            Self::check_scope(ctx, &order)?;
            if !warung_core::order::is_legal_transition(
                order.service_mode,
                order.status,
                OrderStatus::Refunded,
            ) {
                return Err(EngineError::from(CoreError::InvalidTransition {
                    order_id: order.id.clone(),
                    from: order.status,
                    to: OrderStatus::Refunded,
                }));
            }
        }

        let record = self.payments.initiate_refund(order_id).await?;
        match record.status {
            PaymentStatus::Refunded => self.finalize_refund(order_id, &ctx.actor).await,
            PaymentStatus::PendingRefund => {
                let order = handle.lock().await;
                Ok(order.clone())
            }
            other => Err(EngineError::from(CoreError::ConsistencyViolation {
                detail: format!("refund initiation left payment in {other:?}"),
            })),
        }
    }

    /// Re-credits consumed stock and moves the order to Refunded.
    ///
    /// The transition is checked before the ledger write: an order that
    /// cannot legally reach Refunded must not have stock credited back.
    async fn finalize_refund(&self, order_id: &str, actor: &str) -> EngineResult<Order> {
        let handle = self.order_handle(order_id).await?;
        let mut order = handle.lock().await;

        if !warung_core::order::is_legal_transition(
            order.service_mode,
            order.status,
            OrderStatus::Refunded,
        ) {
            return Err(EngineError::from(CoreError::InvalidTransition {
                order_id: order.id.clone(),
                from: order.status,
                to: OrderStatus::Refunded,
            }));
        }

        let catalog = self.registry.catalog_for(&order.outlet_id).await;
        let consumption = resolve_consumption(&order.outlet_id, &order.line_items, &catalog)?;
        self.ledger
            .apply(
                &order.outlet_id,
                &as_deltas(&consumption, 1),
                MovementReason::RefundCredit,
                Some(&order.id),
            )
            .await?;

        let transition = order.transition(OrderStatus::Refunded, actor)?;
        info!(order_id = %order.id, actor, "Order refunded, stock re-credited");
        self.publish_status_change(&order, &transition).await;
        if let Some(payment) = self.payments.payment(&order.id).await {
            self.hub
                .publish(
                    &order.outlet_id,
                    EngineEvent::PaymentRefunded {
                        order_id: order.id.clone(),
                        outlet_id: order.outlet_id.clone(),
                        gateway_reference: payment.gateway_reference,
                        amount_minor: payment.amount_minor,
                    },
                )
                .await;
        }
        Ok(order.clone())
    }

    // =========================================================================
    // Webhooks
    // =========================================================================

    /// Entry point for inbound gateway webhooks.
    ///
    /// Verification, dedup and record updates happen in the adapter; this
    /// translates the resulting action into order-side effects. Returns the
    /// action taken, `None` when the event was a no-op.
    pub async fn apply_webhook(&self, event: &WebhookEvent) -> EngineResult<Option<WebhookAction>> {
        let action = match self.payments.apply_webhook(event).await? {
            Some(action) => action,
            None => return Ok(None),
        };
        match &action {
            WebhookAction::ConfirmPayment { order_id } => {
                self.confirm_captured(order_id, GATEWAY_ACTOR).await?;
            }
            WebhookAction::CompleteRefund { order_id } => {
                self.finalize_refund(order_id, GATEWAY_ACTOR).await?;
            }
            // The refund settlement arrived before the capture event. The
            // capture is implied, so run the full confirmation unit and then
            // the refund finalization, landing on the same state as in-order
            // delivery.
            WebhookAction::SettleAndRefund { order_id } => {
                {
                    let handle = self.order_handle(order_id).await?;
                    let mut order = handle.lock().await;
                    self.confirm_locked(&mut order, GATEWAY_ACTOR).await?;
                }
                self.finalize_refund(order_id, GATEWAY_ACTOR).await?;
            }
            WebhookAction::MarkFailed { order_id } => {
                // Order stays AwaitingPayment for a retry or the sweep.
                warn!(order_id = %order_id, "Gateway reported charge failure");
            }
        }
        Ok(Some(action))
    }

    // =========================================================================
    // Queries & Subscriptions
    // =========================================================================

    pub async fn get_order(&self, ctx: &BusinessContext, order_id: &str) -> EngineResult<Order> {
        self.registry.authorize(ctx).await?;
        let handle = self.order_handle(order_id).await?;
        let order = handle.lock().await;
        Self::check_scope(ctx, &order)?;
        Ok(order.clone())
    }

    /// All non-terminal orders for an outlet, oldest first.
    pub async fn in_flight_orders(&self, outlet_id: &str) -> Vec<Order> {
        let handles: Vec<_> = self.orders.read().await.values().cloned().collect();
        let mut result = Vec::new();
        for handle in handles {
            let order = handle.lock().await;
            if order.outlet_id == outlet_id && order.is_in_flight() {
                result.push(order.clone());
            }
        }
        result.sort_by_key(|o| o.created_at);
        result
    }

    /// Subscribes a terminal session to its outlet's event stream.
    ///
    /// The receiver attaches before the snapshot is collected, so any event
    /// committed after the snapshot is on the live stream: nothing falls in
    /// the gap.
    pub async fn subscribe(
        &self,
        ctx: &BusinessContext,
        session_id: &str,
    ) -> EngineResult<Subscription> {
        self.registry.authorize(ctx).await?;
        let mut subscription = self.hub.subscribe(&ctx.outlet_id, session_id, ctx.role).await;
        subscription.load_snapshot(self.in_flight_orders(&ctx.outlet_id).await);
        Ok(subscription)
    }

    pub async fn unsubscribe(&self, ctx: &BusinessContext, session_id: &str) -> EngineResult<()> {
        self.registry.authorize(ctx).await?;
        self.hub.unsubscribe(&ctx.outlet_id, session_id).await;
        Ok(())
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Cancels orders stuck in AwaitingPayment past the configured window.
    ///
    /// An order whose payment record is already Captured is skipped: the
    /// confirmation webhook is in flight and cancellation would strand
    /// captured funds.
    pub async fn expire_unpaid(&self, now: DateTime<Utc>) -> usize {
        let window = self.config.unpaid_order_window();
        let handles: Vec<_> = self.orders.read().await.values().cloned().collect();

        let mut expired = 0;
        for handle in handles {
            let mut order = handle.lock().await;
            if order.status != OrderStatus::AwaitingPayment {
                continue;
            }
            if now.signed_duration_since(order.status_since()) <= window {
                continue;
            }
            if let Some(payment) = self.payments.payment(&order.id).await {
                if payment.status == PaymentStatus::Captured {
                    warn!(
                        order_id = %order.id,
                        "Expiry skipped: payment already captured, awaiting confirmation"
                    );
                    continue;
                }
            }
            match order.transition(OrderStatus::Cancelled, SWEEP_ACTOR) {
                Ok(transition) => {
                    info!(
                        order_id = %order.id,
                        order_number = %order.order_number,
                        "Unpaid order expired"
                    );
                    self.publish_status_change(&order, &transition).await;
                    expired += 1;
                }
                Err(err) => warn!(order_id = %order.id, error = %err, "Expiry transition failed"),
            }
        }
        expired
    }
}
