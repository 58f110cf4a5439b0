//! # Inventory Ledger
//!
//! Authoritative per-outlet ingredient stock with an all-or-nothing `apply`.
//!
//! ## Critical Section
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Per-Outlet Inventory Serialization                   │
//! │                                                                         │
//! │   confirm(order A) ──┐                                                  │
//! │   confirm(order B) ──┼──► Mutex<OutletInventory>  ── validate ALL       │
//! │   restock(beans)   ──┘          (outlet-1)           deltas, then       │
//! │                                                      commit ALL or      │
//! │   confirm(order C) ─────► Mutex<OutletInventory>     commit NONE        │
//! │                                 (outlet-2)                              │
//! │                                                                         │
//! │   Different outlets never contend. Same outlet serializes.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `quantity_on_hand >= 0` at every committed state. Validation happens for
//!   the whole delta set before the first write, so a failed apply leaves
//!   every record untouched.
//! - Every committed mutation appends a `StockMovement`; the log replays to
//!   the current quantities.
//! - `LowStockAlert` is edge-triggered: it fires only when a movement crosses
//!   a record from above its reorder threshold to at-or-below it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use warung_core::{
    new_id, CoreError, CoreResult, MovementReason, StockMovement, StockRecord,
};

use crate::events::EngineEvent;
use crate::hub::BroadcastHub;

// =============================================================================
// Outlet Inventory
// =============================================================================

#[derive(Default)]
struct OutletInventory {
    records: HashMap<String, StockRecord>,
    movements: Vec<StockMovement>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Per-outlet ingredient stock, mutation log and low-stock alerting.
///
/// All mutations for one outlet pass through that outlet's mutex; reads take
/// the same lock and therefore always observe a committed state.
pub struct InventoryLedger {
    hub: Arc<BroadcastHub>,
    outlets: RwLock<HashMap<String, Arc<Mutex<OutletInventory>>>>,
}

impl InventoryLedger {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        InventoryLedger {
            hub,
            outlets: RwLock::new(HashMap::new()),
        }
    }

    async fn outlet(&self, outlet_id: &str) -> Option<Arc<Mutex<OutletInventory>>> {
        self.outlets.read().await.get(outlet_id).cloned()
    }

    async fn outlet_or_create(&self, outlet_id: &str) -> Arc<Mutex<OutletInventory>> {
        let mut outlets = self.outlets.write().await;
        outlets
            .entry(outlet_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(OutletInventory::default())))
            .clone()
    }

    /// Creates or replaces an ingredient record for an outlet.
    ///
    /// Setup path, not a stock movement: it does not append to the mutation
    /// log and never fires alerts.
    pub async fn upsert_ingredient(&self, record: StockRecord) {
        let outlet = self.outlet_or_create(&record.outlet_id).await;
        let mut inventory = outlet.lock().await;
        info!(
            outlet_id = %record.outlet_id,
            ingredient_id = %record.ingredient_id,
            quantity_on_hand = record.quantity_on_hand,
            "Ingredient registered"
        );
        inventory
            .records
            .insert(record.ingredient_id.clone(), record);
    }

    /// Applies a set of signed deltas to one outlet atomically.
    ///
    /// Two phases under the outlet lock: validate every delta against the
    /// current quantities, then commit every delta. The first ingredient
    /// that would go negative aborts the whole set with
    /// [`CoreError::InsufficientStock`] and no record changes.
    ///
    /// Returns the committed movements in ingredient order.
    pub async fn apply(
        &self,
        outlet_id: &str,
        deltas: &BTreeMap<String, i64>,
        reason: MovementReason,
        order_id: Option<&str>,
    ) -> CoreResult<Vec<StockMovement>> {
        if deltas.is_empty() {
            return Ok(Vec::new());
        }
        let outlet = self
            .outlet(outlet_id)
            .await
            .ok_or_else(|| CoreError::ConsistencyViolation {
                detail: format!("apply against outlet {outlet_id} with no inventory"),
            })?;
        let mut inventory = outlet.lock().await;

        // Phase 1: validate the whole set against committed quantities.
        for (ingredient_id, delta) in deltas {
            let record = inventory.records.get(ingredient_id).ok_or_else(|| {
                CoreError::ConsistencyViolation {
                    detail: format!(
                        "movement for unknown ingredient {ingredient_id} at outlet {outlet_id}"
                    ),
                }
            })?;
            let resulting = record.quantity_on_hand + delta;
            if resulting < 0 {
                debug!(
                    outlet_id,
                    ingredient_id,
                    available = record.quantity_on_hand,
                    required = -delta,
                    "Apply rejected, insufficient stock"
                );
                return Err(CoreError::InsufficientStock {
                    outlet_id: outlet_id.to_string(),
                    ingredient_id: ingredient_id.clone(),
                    available: record.quantity_on_hand,
                    required: -delta,
                });
            }
        }

        // Phase 2: commit. Nothing below can fail.
        let now = Utc::now();
        let mut committed = Vec::with_capacity(deltas.len());
        let mut alerts = Vec::new();
        for (ingredient_id, delta) in deltas {
            let record = inventory
                .records
                .get_mut(ingredient_id)
                .ok_or_else(|| CoreError::ConsistencyViolation {
                    detail: format!("ingredient {ingredient_id} vanished during apply"),
                })?;
            let was_low = record.is_low();
            record.quantity_on_hand += delta;

            let movement = StockMovement {
                id: new_id(),
                outlet_id: outlet_id.to_string(),
                ingredient_id: ingredient_id.clone(),
                delta: *delta,
                resulting_quantity: record.quantity_on_hand,
                reason,
                order_id: order_id.map(str::to_string),
                recorded_at: now,
            };

            self.hub
                .publish(
                    outlet_id,
                    EngineEvent::StockAdjusted {
                        outlet_id: outlet_id.to_string(),
                        ingredient_id: ingredient_id.clone(),
                        delta: *delta,
                        quantity_on_hand: record.quantity_on_hand,
                    },
                )
                .await;

            // Edge trigger: fire only on the above -> at-or-below crossing.
            if !was_low && record.is_low() {
                warn!(
                    outlet_id,
                    ingredient_id,
                    quantity_on_hand = record.quantity_on_hand,
                    reorder_threshold = record.reorder_threshold,
                    "Ingredient crossed reorder threshold"
                );
                alerts.push(EngineEvent::LowStockAlert {
                    outlet_id: outlet_id.to_string(),
                    ingredient_id: ingredient_id.clone(),
                    name: record.name.clone(),
                    quantity_on_hand: record.quantity_on_hand,
                    reorder_threshold: record.reorder_threshold,
                });
            }

            inventory.movements.push(movement.clone());
            committed.push(movement);
        }
        for alert in alerts {
            self.hub.publish(outlet_id, alert).await;
        }
        Ok(committed)
    }

    /// Manual replenishment of a single ingredient.
    pub async fn restock(
        &self,
        outlet_id: &str,
        ingredient_id: &str,
        quantity: i64,
    ) -> CoreResult<StockMovement> {
        if quantity <= 0 {
            return Err(CoreError::ConsistencyViolation {
                detail: format!("restock quantity must be positive, got {quantity}"),
            });
        }
        let mut deltas = BTreeMap::new();
        deltas.insert(ingredient_id.to_string(), quantity);
        let mut movements = self
            .apply(outlet_id, &deltas, MovementReason::Restock, None)
            .await?;
        movements.pop().ok_or(CoreError::ConsistencyViolation {
            detail: "restock committed no movement".into(),
        })
    }

    /// Committed stock record for one ingredient.
    pub async fn get_stock(&self, outlet_id: &str, ingredient_id: &str) -> Option<StockRecord> {
        let outlet = self.outlet(outlet_id).await?;
        let inventory = outlet.lock().await;
        inventory.records.get(ingredient_id).cloned()
    }

    /// Full mutation log for an outlet, in commit order.
    pub async fn movements(&self, outlet_id: &str) -> Vec<StockMovement> {
        match self.outlet(outlet_id).await {
            Some(outlet) => outlet.lock().await.movements.clone(),
            None => Vec::new(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outlet: &str, ingredient: &str, qty: i64, threshold: i64) -> StockRecord {
        StockRecord {
            outlet_id: outlet.into(),
            ingredient_id: ingredient.into(),
            name: ingredient.into(),
            quantity_on_hand: qty,
            reorder_threshold: threshold,
        }
    }

    fn ledger() -> InventoryLedger {
        InventoryLedger::new(Arc::new(BroadcastHub::new(64)))
    }

    #[tokio::test]
    async fn apply_commits_all_deltas() {
        let ledger = ledger();
        ledger.upsert_ingredient(record("o1", "beans", 10, 2)).await;
        ledger.upsert_ingredient(record("o1", "milk", 8, 2)).await;

        let mut deltas = BTreeMap::new();
        deltas.insert("beans".to_string(), -3);
        deltas.insert("milk".to_string(), -2);
        let movements = ledger
            .apply("o1", &deltas, MovementReason::OrderConsumption, Some("ord-1"))
            .await
            .unwrap();

        assert_eq!(movements.len(), 2);
        assert_eq!(ledger.get_stock("o1", "beans").await.unwrap().quantity_on_hand, 7);
        assert_eq!(ledger.get_stock("o1", "milk").await.unwrap().quantity_on_hand, 6);
    }

    #[tokio::test]
    async fn insufficient_stock_aborts_the_whole_set() {
        let ledger = ledger();
        ledger.upsert_ingredient(record("o1", "beans", 10, 2)).await;
        ledger.upsert_ingredient(record("o1", "milk", 1, 2)).await;

        let mut deltas = BTreeMap::new();
        deltas.insert("beans".to_string(), -3);
        deltas.insert("milk".to_string(), -2);
        let err = ledger
            .apply("o1", &deltas, MovementReason::OrderConsumption, Some("ord-1"))
            .await
            .unwrap_err();

        match err {
            CoreError::InsufficientStock {
                ingredient_id,
                available,
                required,
                ..
            } => {
                assert_eq!(ingredient_id, "milk");
                assert_eq!(available, 1);
                assert_eq!(required, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Nothing committed, not even the satisfiable beans delta.
        assert_eq!(ledger.get_stock("o1", "beans").await.unwrap().quantity_on_hand, 10);
        assert_eq!(ledger.get_stock("o1", "milk").await.unwrap().quantity_on_hand, 1);
        assert!(ledger.movements("o1").await.is_empty());
    }

    #[tokio::test]
    async fn unknown_ingredient_is_a_consistency_violation() {
        let ledger = ledger();
        ledger.upsert_ingredient(record("o1", "beans", 10, 2)).await;

        let mut deltas = BTreeMap::new();
        deltas.insert("ghost".to_string(), -1);
        let err = ledger
            .apply("o1", &deltas, MovementReason::OrderConsumption, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ConsistencyViolation { .. }));
    }

    #[tokio::test]
    async fn movement_log_replays_to_current_quantity() {
        let ledger = ledger();
        ledger.upsert_ingredient(record("o1", "beans", 10, 2)).await;

        let mut consume = BTreeMap::new();
        consume.insert("beans".to_string(), -4);
        ledger
            .apply("o1", &consume, MovementReason::OrderConsumption, Some("ord-1"))
            .await
            .unwrap();
        ledger.restock("o1", "beans", 6).await.unwrap();

        let movements = ledger.movements("o1").await;
        let replayed: i64 = 10 + movements.iter().map(|m| m.delta).sum::<i64>();
        assert_eq!(
            replayed,
            ledger.get_stock("o1", "beans").await.unwrap().quantity_on_hand
        );
        assert_eq!(movements.last().unwrap().resulting_quantity, 12);
    }

    #[tokio::test]
    async fn low_stock_alert_fires_only_on_the_crossing() {
        let hub = Arc::new(BroadcastHub::new(64));
        let ledger = InventoryLedger::new(hub.clone());
        ledger.upsert_ingredient(record("o1", "beans", 12, 10)).await;
        let mut owner = hub
            .subscribe("o1", "s-owner", warung_core::TerminalRole::Owner)
            .await;

        // 12 -> 9 crosses, 9 -> 11 recovers, 11 -> 8 crosses again.
        for delta in [-3_i64, 2, -3] {
            let mut deltas = BTreeMap::new();
            deltas.insert("beans".to_string(), delta);
            let reason = if delta > 0 {
                MovementReason::Restock
            } else {
                MovementReason::OrderConsumption
            };
            ledger.apply("o1", &deltas, reason, None).await.unwrap();
        }

        let mut alerts = 0;
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(100), owner.recv()).await
        {
            if matches!(event, EngineEvent::LowStockAlert { .. }) {
                alerts += 1;
            }
        }
        assert_eq!(alerts, 2);
    }

    #[tokio::test]
    async fn restock_rejects_non_positive_quantities() {
        let ledger = ledger();
        ledger.upsert_ingredient(record("o1", "beans", 5, 2)).await;
        assert!(ledger.restock("o1", "beans", 0).await.is_err());
        assert!(ledger.restock("o1", "beans", -3).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_applies_never_oversell() {
        let ledger = Arc::new(ledger());
        ledger.upsert_ingredient(record("o1", "beans", 6, 0)).await;

        let mut handles = Vec::new();
        for _ in 0..3 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let mut deltas = BTreeMap::new();
                deltas.insert("beans".to_string(), -4);
                ledger
                    .apply("o1", &deltas, MovementReason::OrderConsumption, None)
                    .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        // 6 on hand, 4 per claim: exactly one can succeed.
        assert_eq!(ok, 1);
        assert_eq!(ledger.get_stock("o1", "beans").await.unwrap().quantity_on_hand, 2);
    }
}
