//! # Domain Types
//!
//! Core domain types shared across the Warung POS transactional core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ProductVariant  │   │      Order      │   │  PaymentRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  order_id (FK)  │       │
//! │  │  sku + version  │   │  order_number   │   │  gateway_ref    │       │
//! │  │  price_minor    │   │  status         │   │  last_webhook_  │       │
//! │  │  recipe[]       │   │  line_items[]   │   │    sequence     │       │
//! │  └─────────────────┘   │  state_history[]│   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   StockRecord   │   │  StockMovement  │                             │
//! │  │  quantity ≥ 0   │   │  append-only    │                             │
//! │  │  threshold      │   │  mutation log   │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for relations
//! - Business ID: (sku, order_number, gateway reference) - human-readable
//!
//! ## Tenant Boundary
//! Every entity carries `business_id` and `outlet_id`. No operation may read
//! or mutate data across a business boundary; the engine's registry enforces
//! this before any state is touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::{Money, TaxRate};

// =============================================================================
// Business Context
// =============================================================================

/// The role of the terminal session issuing a call.
///
/// Supplied by the authentication layer (an external collaborator); the core
/// trusts it and performs no credential checks itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalRole {
    /// Cashier terminal: creates and settles orders, sees every order event.
    Cashier,
    /// Kitchen display: sees tickets and preparation-stage events.
    Kitchen,
    /// Waiter display: sees ready-to-serve and table-assignment events.
    Waiter,
    /// Owner dashboard: sees everything, plus low-stock alerts.
    Owner,
}

/// Authenticated scope for a single core call.
///
/// Everything the engine does is partitioned by `(business_id, outlet_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub business_id: String,
    pub outlet_id: String,
    pub role: TerminalRole,
    /// Human identifier of the operator, recorded in `state_history`.
    pub actor: String,
}

impl BusinessContext {
    pub fn new(
        business_id: impl Into<String>,
        outlet_id: impl Into<String>,
        role: TerminalRole,
        actor: impl Into<String>,
    ) -> Self {
        BusinessContext {
            business_id: business_id.into(),
            outlet_id: outlet_id.into(),
            role,
            actor: actor.into(),
        }
    }
}

// =============================================================================
// Product / Variant
// =============================================================================

/// One ingredient consumption entry in a product's recipe (BOM).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: String,
    /// Units of the ingredient consumed per unit sold. Always positive.
    pub quantity: i64,
}

/// A sellable product variant.
///
/// ## Versioned, Not Edited In Place
/// Once a variant has been referenced by a completed order line it is
/// immutable. Catalog updates publish a NEW variant (same `sku`, higher
/// `version`) and deactivate the old one, so historical orders keep pointing
/// at exactly what was sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub business_id: String,
    pub outlet_id: String,

    /// Stock Keeping Unit - human-readable identifier, stable across versions.
    pub sku: String,

    /// Display name shown on terminals and kitchen tickets.
    pub name: String,

    /// Price in minor currency units.
    pub price_minor: i64,

    /// Ingredient consumption per unit sold. Empty for products whose stock
    /// is not tracked (e.g. services).
    pub recipe: Vec<RecipeLine>,

    /// Whether the variant is currently sellable (superseded versions are not).
    pub is_active: bool,

    /// Monotonically increasing per-sku version.
    pub version: i64,

    pub created_at: DateTime<Utc>,
}

impl ProductVariant {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price_minor)
    }

    /// True if selling this variant consumes tracked ingredients.
    #[inline]
    pub fn tracks_ingredients(&self) -> bool {
        !self.recipe.is_empty()
    }
}

// =============================================================================
// Ingredient Stock
// =============================================================================

/// Per-outlet stock level for one ingredient.
///
/// ## Invariant
/// `quantity_on_hand >= 0` at every committed state. The ledger rejects any
/// delta set that would violate this; there are no transient negative states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub outlet_id: String,
    pub ingredient_id: String,
    /// Display name for dashboards and alerts.
    pub name: String,
    pub quantity_on_hand: i64,
    /// Crossing from above to at-or-below this level fires a LowStockAlert.
    pub reorder_threshold: i64,
}

impl StockRecord {
    /// True if the current level is at or below the reorder threshold.
    #[inline]
    pub fn is_low(&self) -> bool {
        self.quantity_on_hand <= self.reorder_threshold
    }
}

/// Why a stock movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Consumption on order confirmation (negative delta).
    OrderConsumption,
    /// Re-credit after a confirmed refund (positive delta).
    RefundCredit,
    /// Manual replenishment (positive delta).
    Restock,
}

/// One committed entry in the per-outlet stock mutation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: String,
    pub outlet_id: String,
    pub ingredient_id: String,
    /// Signed quantity: negative for consumption, positive for credit.
    pub delta: i64,
    /// Quantity on hand after this movement committed.
    pub resulting_quantity: i64,
    pub reason: MovementReason,
    /// Order that caused the movement, if any.
    pub order_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// How an order moves through preparation after payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Full pipeline: Paid → InPreparation → ReadyToServe → Completed.
    KitchenService,
    /// Counter sale: Paid → Completed directly (no kitchen routing).
    CounterService,
}

/// Lifecycle states of an order.
///
/// See [`crate::order`] for the transition table; `Order.status` changes only
/// through [`crate::types::Order::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Being assembled by the cashier; line items still editable.
    Draft,
    /// Submitted for payment; waiting on tender or gateway confirmation.
    AwaitingPayment,
    /// Payment captured AND stock decremented (one atomic unit).
    Paid,
    /// Kitchen is working the ticket.
    InPreparation,
    /// Ready for the waiter to pick up.
    ReadyToServe,
    /// Served and closed. **Terminal.**
    Completed,
    /// Abandoned before payment. **Terminal.**
    Cancelled,
    /// Payment returned and stock re-credited. **Terminal.**
    Refunded,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

/// A line item on an order.
///
/// Uses the snapshot pattern: sku, name and unit price are frozen at order
/// creation so the order stays consistent even if the catalog changes.
/// Immutable once the order leaves Draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: String,
    pub product_variant_id: String,
    /// SKU at time of ordering (frozen).
    pub sku_snapshot: String,
    /// Product name at time of ordering (frozen).
    pub name_snapshot: String,
    /// Unit price in minor units at time of ordering (frozen).
    pub unit_price_minor: i64,
    pub quantity: i64,
    /// Set when stock was decremented for this line (at confirmation).
    pub ingredient_reservation_id: Option<String>,
}

impl OrderLineItem {
    /// Line total before tax (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_minor(self.unit_price_minor) * self.quantity
    }
}

/// Caller input for one line item of a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemDraft {
    pub product_variant_id: String,
    pub quantity: i64,
}

/// One recorded state transition, for audit and replay detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Who drove the transition: an operator name, the gateway, or the sweep.
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// A single order/transaction.
///
/// Owned exclusively by the order state machine: other components never edit
/// fields directly, they go through the defined transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub business_id: String,
    pub outlet_id: String,
    /// Human-readable receipt-style number, e.g. `ORD-20260824-0421`.
    pub order_number: String,
    pub service_mode: ServiceMode,
    pub status: OrderStatus,
    /// Dine-in table label, if assigned.
    pub table_label: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Every transition ever applied, in order.
    pub state_history: Vec<StateTransition>,
}

impl Order {
    /// Grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }

    /// True if the order still occupies a kitchen/waiter display.
    ///
    /// In-flight orders are what a reconnecting subscriber receives as its
    /// snapshot.
    pub fn is_in_flight(&self) -> bool {
        !self.status.is_terminal()
    }

    /// When the order entered its current status, falling back to creation
    /// time if no transition has been recorded yet.
    pub fn status_since(&self) -> DateTime<Utc> {
        self.state_history
            .last()
            .map(|t| t.at)
            .unwrap_or(self.created_at)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// How the order was (or will be) paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash, captured synchronously at the drawer.
    Cash,
    /// External payment gateway (QRIS / e-wallet / card); captured by webhook.
    Gateway,
}

/// Lifecycle of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Charge initiated, awaiting gateway confirmation.
    Pending,
    /// Funds captured.
    Captured,
    /// Refund requested, awaiting gateway confirmation.
    PendingRefund,
    /// Refund confirmed by the gateway.
    Refunded,
    /// Gateway reported the charge failed.
    Failed,
}

/// The payment attached to an order once payment is initiated.
///
/// One-to-one with an order, but persisted separately so webhook replay can
/// be reconciled independently of the order lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub order_id: String,
    /// Gateway-assigned (or `CASH-…`) reference. Webhooks key on this.
    pub gateway_reference: String,
    pub method: PaymentMethod,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    /// Highest webhook sequence applied so far. A webhook whose sequence is
    /// ≤ this value is a no-op - already applied, never an error.
    pub last_webhook_sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// ID Generation
// =============================================================================

/// Generates a new entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates an order number in format `ORD-YYYYMMDD-NNNN`.
///
/// The numeric suffix only needs to be unique enough for humans shouting
/// across a kitchen; the UUID remains the relational key.
pub fn generate_order_number(now: DateTime<Utc>, daily_sequence: u32) -> String {
    format!("ORD-{}-{:04}", now.format("%Y%m%d"), daily_sequence % 10_000)
}

/// Computes order totals from line items at the outlet's tax rate.
///
/// Returns `(subtotal, tax, total)` in minor units.
pub fn compute_totals(items: &[OrderLineItem], tax_rate: TaxRate) -> (i64, i64, i64) {
    let subtotal: Money = items
        .iter()
        .fold(Money::zero(), |acc, item| acc + item.line_total());
    let tax = subtotal.tax(tax_rate);
    (subtotal.minor(), tax.minor(), (subtotal + tax).minor())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(price: i64, qty: i64) -> OrderLineItem {
        OrderLineItem {
            id: new_id(),
            product_variant_id: new_id(),
            sku_snapshot: "KOPI-SUSU".into(),
            name_snapshot: "Kopi Susu".into(),
            unit_price_minor: price,
            quantity: qty,
            ingredient_reservation_id: None,
        }
    }

    #[test]
    fn totals_sum_lines_and_apply_tax() {
        let items = vec![item(18_000, 2), item(5_000, 1)];
        // subtotal 41.000, 11% tax = 4.510
        let (subtotal, tax, total) = compute_totals(&items, TaxRate::from_bps(1_100));
        assert_eq!(subtotal, 41_000);
        assert_eq!(tax, 4_510);
        assert_eq!(total, 45_510);
    }

    #[test]
    fn order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 10, 0, 0).unwrap();
        assert_eq!(generate_order_number(now, 421), "ORD-20260824-0421");
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::ReadyToServe.is_terminal());
    }

    #[test]
    fn low_stock_check() {
        let record = StockRecord {
            outlet_id: "o1".into(),
            ingredient_id: "beans".into(),
            name: "Coffee Beans".into(),
            quantity_on_hand: 10,
            reorder_threshold: 10,
        };
        assert!(record.is_low());
    }
}
