//! # Business Registry
//!
//! Tenancy roots and the per-outlet product catalog.
//!
//! Every engine operation starts here: `authorize` checks the caller's
//! [`BusinessContext`] against registered businesses and outlets BEFORE any
//! state is read or mutated, so data from one business can never leak into
//! another's call path.
//!
//! ## Catalog Versioning
//! Product variants are immutable once published. Re-publishing a SKU
//! deactivates the previous active version and installs a new variant with a
//! bumped version number; orders that already snapshotted the old price are
//! unaffected.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use warung_core::validation::{validate_amount_minor, validate_product_name, validate_sku};
use warung_core::{new_id, BusinessContext, ProductVariant, RecipeLine, TaxRate};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Tenancy Types
// =============================================================================

/// Top-level tenant. All data is partitioned by business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
}

/// A physical location under a business, with its own inventory, catalog and
/// tax rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlet {
    pub id: String,
    pub business_id: String,
    pub name: String,
    /// Outlet tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,
}

// =============================================================================
// Registry
// =============================================================================

/// Registered businesses, their outlets and each outlet's product catalog.
pub struct BusinessRegistry {
    businesses: RwLock<HashMap<String, Business>>,
    outlets: RwLock<HashMap<String, Outlet>>,
    /// outlet_id -> variant_id -> variant.
    catalogs: RwLock<HashMap<String, HashMap<String, ProductVariant>>>,
}

impl BusinessRegistry {
    pub fn new() -> Self {
        BusinessRegistry {
            businesses: RwLock::new(HashMap::new()),
            outlets: RwLock::new(HashMap::new()),
            catalogs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register_business(&self, name: &str) -> Business {
        let business = Business {
            id: new_id(),
            name: name.to_string(),
        };
        info!(business_id = %business.id, name, "Business registered");
        self.businesses
            .write()
            .await
            .insert(business.id.clone(), business.clone());
        business
    }

    pub async fn register_outlet(
        &self,
        business_id: &str,
        name: &str,
        tax_rate_bps: u32,
    ) -> EngineResult<Outlet> {
        if !self.businesses.read().await.contains_key(business_id) {
            return Err(EngineError::UnknownBusiness(business_id.to_string()));
        }
        let outlet = Outlet {
            id: new_id(),
            business_id: business_id.to_string(),
            name: name.to_string(),
            tax_rate_bps,
        };
        info!(business_id, outlet_id = %outlet.id, name, "Outlet registered");
        self.outlets
            .write()
            .await
            .insert(outlet.id.clone(), outlet.clone());
        self.catalogs
            .write()
            .await
            .insert(outlet.id.clone(), HashMap::new());
        Ok(outlet)
    }

    /// Verifies that the context names a registered business and one of its
    /// own outlets. Every engine entry point calls this first.
    pub async fn authorize(&self, ctx: &BusinessContext) -> EngineResult<()> {
        if !self.businesses.read().await.contains_key(&ctx.business_id) {
            return Err(EngineError::UnknownBusiness(ctx.business_id.clone()));
        }
        match self.outlets.read().await.get(&ctx.outlet_id) {
            None => Err(EngineError::UnknownOutlet {
                business_id: ctx.business_id.clone(),
                outlet_id: ctx.outlet_id.clone(),
            }),
            Some(outlet) if outlet.business_id != ctx.business_id => {
                Err(EngineError::ScopeViolation {
                    business_id: ctx.business_id.clone(),
                    outlet_id: ctx.outlet_id.clone(),
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Publishes a product variant into the outlet's catalog.
    ///
    /// If an active variant with the same SKU exists it is deactivated and
    /// the new variant takes `version + 1`.
    pub async fn publish_product(
        &self,
        ctx: &BusinessContext,
        sku: &str,
        name: &str,
        price_minor: i64,
        recipe: Vec<RecipeLine>,
    ) -> EngineResult<ProductVariant> {
        self.authorize(ctx).await?;
        validate_sku(sku).map_err(warung_core::CoreError::from)?;
        validate_product_name(name).map_err(warung_core::CoreError::from)?;
        validate_amount_minor(price_minor).map_err(warung_core::CoreError::from)?;

        let mut catalogs = self.catalogs.write().await;
        let catalog = catalogs
            .entry(ctx.outlet_id.clone())
            .or_insert_with(HashMap::new);

        let mut version = 1;
        for variant in catalog.values_mut() {
            if variant.sku == sku && variant.is_active {
                variant.is_active = false;
                version = variant.version + 1;
            }
        }

        let variant = ProductVariant {
            id: new_id(),
            business_id: ctx.business_id.clone(),
            outlet_id: ctx.outlet_id.clone(),
            sku: sku.to_string(),
            name: name.to_string(),
            price_minor,
            recipe,
            is_active: true,
            version,
            created_at: Utc::now(),
        };
        info!(
            outlet_id = %ctx.outlet_id,
            sku,
            version,
            price_minor,
            "Product variant published"
        );
        catalog.insert(variant.id.clone(), variant.clone());
        Ok(variant)
    }

    /// Looks up a variant by id within the outlet's catalog.
    pub async fn variant(&self, outlet_id: &str, variant_id: &str) -> Option<ProductVariant> {
        self.catalogs
            .read()
            .await
            .get(outlet_id)
            .and_then(|catalog| catalog.get(variant_id))
            .cloned()
    }

    /// The currently active variant for a SKU, if any.
    pub async fn active_variant(&self, outlet_id: &str, sku: &str) -> Option<ProductVariant> {
        self.catalogs
            .read()
            .await
            .get(outlet_id)?
            .values()
            .find(|v| v.sku == sku && v.is_active)
            .cloned()
    }

    /// A clone of the outlet's full catalog, keyed by variant id. Used by the
    /// recipe resolver, which needs a stable view across one confirmation.
    pub async fn catalog_for(&self, outlet_id: &str) -> HashMap<String, ProductVariant> {
        self.catalogs
            .read()
            .await
            .get(outlet_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The outlet's tax rate.
    pub async fn tax_rate(&self, outlet_id: &str) -> EngineResult<TaxRate> {
        self.outlets
            .read()
            .await
            .get(outlet_id)
            .map(|o| TaxRate::from_bps(o.tax_rate_bps))
            .ok_or_else(|| EngineError::UnknownOutlet {
                business_id: String::new(),
                outlet_id: outlet_id.to_string(),
            })
    }
}

impl Default for BusinessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warung_core::TerminalRole;

    async fn seeded() -> (BusinessRegistry, Business, Outlet) {
        let registry = BusinessRegistry::new();
        let business = registry.register_business("Warung Bu Sari").await;
        let outlet = registry
            .register_outlet(&business.id, "Cabang Kemang", 1000)
            .await
            .unwrap();
        (registry, business, outlet)
    }

    fn ctx(business: &Business, outlet: &Outlet) -> BusinessContext {
        BusinessContext::new(&business.id, &outlet.id, TerminalRole::Owner, "owner-1")
    }

    #[tokio::test]
    async fn authorize_accepts_matching_scope() {
        let (registry, business, outlet) = seeded().await;
        assert!(registry.authorize(&ctx(&business, &outlet)).await.is_ok());
    }

    #[tokio::test]
    async fn authorize_rejects_foreign_outlet() {
        let (registry, business, _outlet) = seeded().await;
        let other = registry.register_business("Kopi Pak Budi").await;
        let other_outlet = registry
            .register_outlet(&other.id, "Cabang Blok M", 1100)
            .await
            .unwrap();

        // business A's context pointing at business B's outlet
        let cross = BusinessContext::new(
            &business.id,
            &other_outlet.id,
            TerminalRole::Cashier,
            "cashier-1",
        );
        let err = registry.authorize(&cross).await.unwrap_err();
        assert!(matches!(err, EngineError::ScopeViolation { .. }));
    }

    #[tokio::test]
    async fn authorize_rejects_unknown_business() {
        let (registry, _business, outlet) = seeded().await;
        let ghost = BusinessContext::new("ghost", &outlet.id, TerminalRole::Owner, "x");
        assert!(matches!(
            registry.authorize(&ghost).await.unwrap_err(),
            EngineError::UnknownBusiness(_)
        ));
    }

    #[tokio::test]
    async fn republishing_a_sku_bumps_version_and_deactivates_prior() {
        let (registry, business, outlet) = seeded().await;
        let ctx = ctx(&business, &outlet);

        let v1 = registry
            .publish_product(&ctx, "ES-TEH", "Es Teh Manis", 8_000, Vec::new())
            .await
            .unwrap();
        let v2 = registry
            .publish_product(&ctx, "ES-TEH", "Es Teh Manis", 9_000, Vec::new())
            .await
            .unwrap();

        assert_eq!(v1.version, 1);
        assert_eq!(v2.version, 2);
        assert!(!registry.variant(&outlet.id, &v1.id).await.unwrap().is_active);
        let active = registry.active_variant(&outlet.id, "ES-TEH").await.unwrap();
        assert_eq!(active.id, v2.id);
        assert_eq!(active.price_minor, 9_000);
    }

    #[tokio::test]
    async fn invalid_sku_is_rejected() {
        let (registry, business, outlet) = seeded().await;
        let err = registry
            .publish_product(&ctx(&business, &outlet), "bad sku!", "X", 1_000, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(warung_core::CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn tax_rate_comes_from_the_outlet() {
        let (registry, _business, outlet) = seeded().await;
        assert_eq!(registry.tax_rate(&outlet.id).await.unwrap().bps(), 1000);
    }
}
