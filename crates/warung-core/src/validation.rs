//! # Validation Module
//!
//! Input validation for calls crossing into the core. These run BEFORE any
//! business logic or locking, so malformed input never reaches shared state.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal UI                                                  │
//! │  └── Immediate feedback (empty fields, obvious typos)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── The authoritative check - the core never trusts the UI            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Business rules (state machine, ledger)                       │
//! │  └── Catch what shape-checks cannot (stock, transition legality)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::types::LineItemDraft;
use crate::{MAX_LINE_ITEMS, MAX_LINE_QUANTITY};

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Alphanumeric, hyphens and underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }
    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }
    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }
    Ok(())
}

/// Validates a product display name (1..=200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Validates an optional dine-in table label (at most 30 characters).
pub fn validate_table_label(label: &str) -> ValidationResult<()> {
    if label.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "table_label".to_string(),
        });
    }
    if label.len() > 30 {
        return Err(ValidationError::TooLong {
            field: "table_label".to_string(),
            max: 30,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity (1..=MAX_LINE_QUANTITY).
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price or amount in minor units (must not be negative).
pub fn validate_amount_minor(amount_minor: i64) -> ValidationResult<()> {
    if amount_minor < 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount_minor".to_string(),
        });
    }
    Ok(())
}

/// Validates the line item drafts for a new order: non-empty, bounded count,
/// every quantity in range.
pub fn validate_line_item_drafts(drafts: &[LineItemDraft]) -> ValidationResult<()> {
    if drafts.is_empty() {
        return Err(ValidationError::Required {
            field: "line_items".to_string(),
        });
    }
    if drafts.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "line_items".to_string(),
            max: MAX_LINE_ITEMS,
        });
    }
    for draft in drafts {
        if draft.product_variant_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_variant_id".to_string(),
            });
        }
        validate_quantity(draft.quantity)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_rules() {
        assert!(validate_sku("KOPI-SUSU_330").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn quantity_rules() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn drafts_must_not_be_empty() {
        assert!(validate_line_item_drafts(&[]).is_err());
    }

    #[test]
    fn drafts_reject_zero_quantity() {
        let drafts = vec![LineItemDraft {
            product_variant_id: "pv-1".into(),
            quantity: 0,
        }];
        assert!(validate_line_item_drafts(&drafts).is_err());
    }

    #[test]
    fn drafts_reject_blank_variant_id() {
        let drafts = vec![LineItemDraft {
            product_variant_id: "  ".into(),
            quantity: 1,
        }];
        assert!(validate_line_item_drafts(&drafts).is_err());
    }

    #[test]
    fn table_label_bounds() {
        assert!(validate_table_label("Meja 4").is_ok());
        assert!(validate_table_label("").is_err());
        assert!(validate_table_label(&"x".repeat(31)).is_err());
    }
}
