//! # Order State Machine
//!
//! The lifecycle of a single order. Every status change in the system flows
//! through [`Order::transition`], which enforces two invariants:
//!
//! 1. **Legal transitions only.** Illegal moves return
//!    [`CoreError::InvalidTransition`] and leave the order untouched.
//! 2. **Full audit trail.** Every applied transition is appended to
//!    `state_history` with timestamp and actor.
//!
//! ## State diagram
//! ```text
//!                                   cancel()                  cancel()
//!                              ┌───────────────┐         ┌───────────────┐
//!                              │               ▼         │               ▼
//!   create_order() ──► Draft ──┴─► AwaitingPayment ──────┴──────► Cancelled (term.)
//!                                       │
//!                                       │ confirm_payment()  (atomic with
//!                                       ▼                     stock decrement)
//!                                     Paid ──────────────┐
//!                        KitchenService │                │ CounterService
//!                                       ▼                │
//!                                 InPreparation          │
//!                                       │                │
//!                                       ▼                ▼
//!                                 ReadyToServe ──► Completed (term.)
//!                                                        │
//!                                     Paid/Completed ────┤ refund()
//!                                                        ▼
//!                                                   Refunded (term.)
//! ```
//!
//! Kitchen advancement is monotonic: each `advance_kitchen_stage` call must
//! target exactly the next stage for the order's service mode. Moving
//! backward or skipping a stage fails.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::TaxRate;
use crate::types::{
    compute_totals, new_id, Order, OrderLineItem, OrderStatus, ServiceMode, StateTransition,
};

// =============================================================================
// Transition Table
// =============================================================================

/// Returns true if `from → to` is a legal transition for the given service
/// mode.
///
/// This is THE transition table; there is deliberately exactly one.
pub fn is_legal_transition(mode: ServiceMode, from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Draft, AwaitingPayment) => true,
        (Draft, Cancelled) | (AwaitingPayment, Cancelled) => true,
        (AwaitingPayment, Paid) => true,
        // Preparation pipeline depends on the service mode.
        (Paid, InPreparation) => matches!(mode, ServiceMode::KitchenService),
        (InPreparation, ReadyToServe) => matches!(mode, ServiceMode::KitchenService),
        (ReadyToServe, Completed) => matches!(mode, ServiceMode::KitchenService),
        (Paid, Completed) => matches!(mode, ServiceMode::CounterService),
        // Refund branch.
        (Paid, Refunded) | (Completed, Refunded) => true,
        _ => false,
    }
}

/// The next preparation stage after `current`, or `None` if the pipeline has
/// no further stage (or payment hasn't happened yet).
pub fn next_kitchen_stage(mode: ServiceMode, current: OrderStatus) -> Option<OrderStatus> {
    use OrderStatus::*;
    match (mode, current) {
        (ServiceMode::KitchenService, Paid) => Some(InPreparation),
        (ServiceMode::KitchenService, InPreparation) => Some(ReadyToServe),
        (ServiceMode::KitchenService, ReadyToServe) => Some(Completed),
        (ServiceMode::CounterService, Paid) => Some(Completed),
        _ => None,
    }
}

// =============================================================================
// Order Construction & Transitions
// =============================================================================

impl Order {
    /// Builds a new order in `Draft` with frozen line-item snapshots and
    /// computed totals.
    ///
    /// Validation of the drafts against the catalog happens in the engine
    /// before this is called; this constructor only does arithmetic.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        business_id: impl Into<String>,
        outlet_id: impl Into<String>,
        order_number: String,
        service_mode: ServiceMode,
        table_label: Option<String>,
        line_items: Vec<OrderLineItem>,
        tax_rate: TaxRate,
        now: DateTime<Utc>,
    ) -> Self {
        let (subtotal_minor, tax_minor, total_minor) = compute_totals(&line_items, tax_rate);
        Order {
            id: new_id(),
            business_id: business_id.into(),
            outlet_id: outlet_id.into(),
            order_number,
            service_mode,
            status: OrderStatus::Draft,
            table_label,
            line_items,
            subtotal_minor,
            tax_minor,
            total_minor,
            created_at: now,
            updated_at: now,
            state_history: Vec::new(),
        }
    }

    /// Applies a state transition, recording it in `state_history`.
    ///
    /// Returns the recorded transition (the engine broadcasts it), or
    /// [`CoreError::InvalidTransition`] with the order unchanged.
    pub fn transition(&mut self, to: OrderStatus, actor: &str) -> CoreResult<StateTransition> {
        if !is_legal_transition(self.service_mode, self.status, to) {
            return Err(CoreError::InvalidTransition {
                order_id: self.id.clone(),
                from: self.status,
                to,
            });
        }

        let record = StateTransition {
            from: self.status,
            to,
            actor: actor.to_string(),
            at: Utc::now(),
        };
        self.status = to;
        self.updated_at = record.at;
        self.state_history.push(record.clone());
        Ok(record)
    }

    /// Validates and applies one monotonic kitchen advance.
    ///
    /// `target` must be exactly the next stage for this order's service mode;
    /// anything else - moving backward, skipping, advancing an unpaid order -
    /// is an [`CoreError::InvalidTransition`].
    pub fn advance_stage(&mut self, target: OrderStatus, actor: &str) -> CoreResult<StateTransition> {
        match next_kitchen_stage(self.service_mode, self.status) {
            Some(expected) if expected == target => self.transition(target, actor),
            _ => Err(CoreError::InvalidTransition {
                order_id: self.id.clone(),
                from: self.status,
                to: target,
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
