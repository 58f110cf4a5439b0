//! # Engine Events
//!
//! Everything the hub fans out to subscribed terminals. One enum, one
//! entitlement rule: which roles may see which event class.
//!
//! ## Role Entitlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Event                     Cashier  Kitchen  Waiter  Owner              │
//! │  ─────────────────────     ───────  ───────  ──────  ─────              │
//! │  OrderCreated                 ✅       ✅       —      ✅               │
//! │  OrderStatusChanged           ✅    prep only  RTS*    ✅               │
//! │  TableAssigned                ✅       —       ✅      ✅               │
//! │  PaymentCaptured/Refunded     ✅       —       —       ✅               │
//! │  StockAdjusted                ✅       —       —       ✅               │
//! │  LowStockAlert                —        —       —       ✅               │
//! │                                                                         │
//! │  *RTS = only transitions into ReadyToServe                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warung_core::{Order, OrderStatus, TerminalRole};

// =============================================================================
// Event Type
// =============================================================================

/// A state change fanned out to subscribed terminal sessions.
///
/// Events for the same `order_id` are delivered to a given subscriber in the
/// order they were committed (per-order causal order); no global ordering
/// across distinct orders is promised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new order entered the system (still Draft).
    OrderCreated { order: Order },

    /// An order moved through its state machine.
    OrderStatusChanged {
        order_id: String,
        outlet_id: String,
        from: OrderStatus,
        to: OrderStatus,
        actor: String,
        at: DateTime<Utc>,
    },

    /// A dine-in order was (re)assigned to a table.
    TableAssigned {
        order_id: String,
        outlet_id: String,
        table_label: String,
    },

    /// Funds were captured for an order.
    PaymentCaptured {
        order_id: String,
        outlet_id: String,
        gateway_reference: String,
        amount_minor: i64,
    },

    /// A refund was confirmed and stock re-credited.
    PaymentRefunded {
        order_id: String,
        outlet_id: String,
        gateway_reference: String,
        amount_minor: i64,
    },

    /// A committed stock movement (consumption, restock or re-credit).
    StockAdjusted {
        outlet_id: String,
        ingredient_id: String,
        delta: i64,
        quantity_on_hand: i64,
    },

    /// Edge-triggered: quantity crossed from above the reorder threshold to
    /// at-or-below it. Fires only on the crossing, never on every read.
    LowStockAlert {
        outlet_id: String,
        ingredient_id: String,
        name: String,
        quantity_on_hand: i64,
        reorder_threshold: i64,
    },
}

impl EngineEvent {
    /// The order this event belongs to, if any. Events sharing an order id
    /// are the ones covered by the per-order ordering guarantee.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            EngineEvent::OrderCreated { order } => Some(&order.id),
            EngineEvent::OrderStatusChanged { order_id, .. }
            | EngineEvent::TableAssigned { order_id, .. }
            | EngineEvent::PaymentCaptured { order_id, .. }
            | EngineEvent::PaymentRefunded { order_id, .. } => Some(order_id),
            EngineEvent::StockAdjusted { .. } | EngineEvent::LowStockAlert { .. } => None,
        }
    }

    /// Whether a subscriber with the given role is entitled to this event.
    pub fn visible_to(&self, role: TerminalRole) -> bool {
        match role {
            // Owner dashboards see everything, including low-stock alerts.
            TerminalRole::Owner => true,

            // Cashiers see every order/payment/inventory event, but alert
            // routing is the owner's concern.
            TerminalRole::Cashier => !matches!(self, EngineEvent::LowStockAlert { .. }),

            // Kitchen displays: new tickets and preparation-stage movement.
            TerminalRole::Kitchen => match self {
                EngineEvent::OrderCreated { .. } => true,
                EngineEvent::OrderStatusChanged { to, .. } => matches!(
                    to,
                    OrderStatus::Paid | OrderStatus::InPreparation | OrderStatus::ReadyToServe
                ),
                _ => false,
            },

            // Waiter displays: pickup and table assignment only.
            TerminalRole::Waiter => match self {
                EngineEvent::OrderStatusChanged { to, .. } => *to == OrderStatus::ReadyToServe,
                EngineEvent::TableAssigned { .. } => true,
                _ => false,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn status_change(to: OrderStatus) -> EngineEvent {
        EngineEvent::OrderStatusChanged {
            order_id: "ord-1".into(),
            outlet_id: "outlet-1".into(),
            from: OrderStatus::Paid,
            to,
            actor: "kitchen-1".into(),
            at: Utc::now(),
        }
    }

    #[test]
    fn owner_sees_everything() {
        let alert = EngineEvent::LowStockAlert {
            outlet_id: "outlet-1".into(),
            ingredient_id: "beans".into(),
            name: "Coffee Beans".into(),
            quantity_on_hand: 8,
            reorder_threshold: 10,
        };
        assert!(alert.visible_to(TerminalRole::Owner));
        assert!(status_change(OrderStatus::Completed).visible_to(TerminalRole::Owner));
    }

    #[test]
    fn cashier_sees_all_but_low_stock() {
        let alert = EngineEvent::LowStockAlert {
            outlet_id: "outlet-1".into(),
            ingredient_id: "beans".into(),
            name: "Coffee Beans".into(),
            quantity_on_hand: 8,
            reorder_threshold: 10,
        };
        assert!(!alert.visible_to(TerminalRole::Cashier));
        assert!(status_change(OrderStatus::Completed).visible_to(TerminalRole::Cashier));
    }

    #[test]
    fn kitchen_sees_prep_stages_only() {
        assert!(status_change(OrderStatus::InPreparation).visible_to(TerminalRole::Kitchen));
        assert!(status_change(OrderStatus::ReadyToServe).visible_to(TerminalRole::Kitchen));
        assert!(!status_change(OrderStatus::Completed).visible_to(TerminalRole::Kitchen));
        assert!(!status_change(OrderStatus::Refunded).visible_to(TerminalRole::Kitchen));
    }

    #[test]
    fn waiter_sees_ready_to_serve_and_tables() {
        assert!(status_change(OrderStatus::ReadyToServe).visible_to(TerminalRole::Waiter));
        assert!(!status_change(OrderStatus::InPreparation).visible_to(TerminalRole::Waiter));

        let table = EngineEvent::TableAssigned {
            order_id: "ord-1".into(),
            outlet_id: "outlet-1".into(),
            table_label: "Meja 4".into(),
        };
        assert!(table.visible_to(TerminalRole::Waiter));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let table = EngineEvent::TableAssigned {
            order_id: "ord-1".into(),
            outlet_id: "outlet-1".into(),
            table_label: "Meja 4".into(),
        };
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"type\":\"table_assigned\""));
    }
}
