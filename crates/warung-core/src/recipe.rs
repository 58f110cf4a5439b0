//! # Recipe Resolver
//!
//! Expands an order's line items into a flat multiset of ingredient
//! consumption, summing duplicates across lines: two products that share an
//! ingredient consume the combined amount in ONE ledger operation, so the
//! all-or-nothing check in the ledger sees the true total.
//!
//! ```text
//!   2 × Kopi Susu   (recipe: 18g beans, 100ml milk)
//!   1 × Es Kopi     (recipe:  9g beans, 80g ice)
//!        │
//!        ▼  resolve_consumption
//!   { beans: 45, milk: 200, ice: 80 }
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::types::{OrderLineItem, ProductVariant};

/// Required ingredient quantities, keyed by ingredient id.
///
/// BTreeMap so iteration (and therefore ledger application and logging) is
/// deterministic.
pub type Consumption = BTreeMap<String, i64>;

/// Expands line items into total ingredient consumption.
///
/// `catalog` must contain every referenced variant (the engine looks them up
/// by id, which stays valid across catalog versioning). Variants with an
/// empty recipe contribute nothing - their stock is not tracked.
pub fn resolve_consumption(
    outlet_id: &str,
    items: &[OrderLineItem],
    catalog: &HashMap<String, ProductVariant>,
) -> CoreResult<Consumption> {
    let mut required = Consumption::new();

    for item in items {
        let variant = catalog.get(&item.product_variant_id).ok_or_else(|| {
            CoreError::ProductNotFound {
                outlet_id: outlet_id.to_string(),
                product_variant_id: item.product_variant_id.clone(),
            }
        })?;

        for line in &variant.recipe {
            *required.entry(line.ingredient_id.clone()).or_insert(0) +=
                line.quantity * item.quantity;
        }
    }

    Ok(required)
}

/// Negates a consumption map into ledger deltas (consumption is positive
/// "required units"; the ledger applies signed deltas).
pub fn as_deltas(consumption: &Consumption, sign: i64) -> BTreeMap<String, i64> {
    consumption
        .iter()
        .map(|(ingredient, qty)| (ingredient.clone(), qty * sign))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{new_id, RecipeLine};
    use chrono::Utc;

    fn variant(id: &str, recipe: Vec<(&str, i64)>) -> ProductVariant {
        ProductVariant {
            id: id.to_string(),
            business_id: "biz-1".into(),
            outlet_id: "outlet-1".into(),
            sku: format!("SKU-{id}"),
            name: format!("Product {id}"),
            price_minor: 10_000,
            recipe: recipe
                .into_iter()
                .map(|(ing, qty)| RecipeLine {
                    ingredient_id: ing.to_string(),
                    quantity: qty,
                })
                .collect(),
            is_active: true,
            version: 1,
            created_at: Utc::now(),
        }
    }

    fn item(variant_id: &str, qty: i64) -> OrderLineItem {
        OrderLineItem {
            id: new_id(),
            product_variant_id: variant_id.to_string(),
            sku_snapshot: "S".into(),
            name_snapshot: "N".into(),
            unit_price_minor: 10_000,
            quantity: qty,
            ingredient_reservation_id: None,
        }
    }

    #[test]
    fn sums_shared_ingredients_across_lines() {
        let mut catalog = HashMap::new();
        catalog.insert("pv-a".to_string(), variant("pv-a", vec![("beans", 18), ("milk", 100)]));
        catalog.insert("pv-b".to_string(), variant("pv-b", vec![("beans", 9), ("ice", 80)]));

        let items = vec![item("pv-a", 2), item("pv-b", 1)];
        let required = resolve_consumption("outlet-1", &items, &catalog).unwrap();

        assert_eq!(required.get("beans"), Some(&45)); // 2×18 + 1×9
        assert_eq!(required.get("milk"), Some(&200));
        assert_eq!(required.get("ice"), Some(&80));
    }

    #[test]
    fn recipe_free_products_consume_nothing() {
        let mut catalog = HashMap::new();
        catalog.insert("pv-svc".to_string(), variant("pv-svc", vec![]));

        let required =
            resolve_consumption("outlet-1", &[item("pv-svc", 3)], &catalog).unwrap();
        assert!(required.is_empty());
    }

    #[test]
    fn unknown_variant_is_an_error() {
        let catalog = HashMap::new();
        let err = resolve_consumption("outlet-1", &[item("pv-ghost", 1)], &catalog).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound { .. }));
    }

    #[test]
    fn deltas_flip_sign() {
        let mut consumption = Consumption::new();
        consumption.insert("beans".into(), 45);
        let deltas = as_deltas(&consumption, -1);
        assert_eq!(deltas.get("beans"), Some(&-45));
    }
}
