//! # Error Types
//!
//! Domain error taxonomy for the transactional core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  warung-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule and lifecycle failures           │
//! │  └── ValidationError  - Malformed input (caller's fault, not retried)  │
//! │                                                                         │
//! │  warung-engine errors (separate crate)                                 │
//! │  └── EngineError      - Scoping and configuration failures             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Handling policy
//! - `Validation` / `InsufficientStock` / `InvalidTransition`: surfaced to the
//!   terminal so the operator can adjust; never retried automatically.
//! - `GatewayTimeout`: retryable with backoff up to a bounded attempt count.
//! - `GatewayRejected` / `RefundFailed`: terminal for that attempt.
//! - `ConsistencyViolation`: an invariant check failed unexpectedly. Fatal for
//!   the transaction; logged at the highest severity by the engine.

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations or domain lifecycle failures.
/// They should be caught at the engine boundary and translated to
/// user-friendly messages; storage or channel detail never leaks through them.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input validation failed (wraps [`ValidationError`]).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A line item references a product that is unknown or not sold at
    /// the outlet.
    #[error("product variant not found at outlet {outlet_id}: {product_variant_id}")]
    ProductNotFound {
        outlet_id: String,
        product_variant_id: String,
    },

    /// Order cannot be found.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Payment record cannot be found for the order.
    #[error("no payment record for order {0}")]
    PaymentNotFound(String),

    /// Committing the deltas would drive an ingredient below zero.
    ///
    /// ## The Single Most Important Invariant
    /// Stock decrement and the `AwaitingPayment → Paid` transition are one
    /// atomic unit. When this error is returned, NO delta was applied and
    /// the order state is unchanged - the cashier adjusts the order instead.
    #[error(
        "insufficient stock at outlet {outlet_id} for ingredient {ingredient_id}: \
         available {available}, required {required}"
    )]
    InsufficientStock {
        outlet_id: String,
        ingredient_id: String,
        available: i64,
        required: i64,
    },

    /// The requested state transition is not legal from the current state.
    ///
    /// ## When This Occurs
    /// - A stale kitchen display tries to advance an already-served order
    /// - Moving backward or skipping a preparation stage
    /// - Cancelling an order that is already Paid
    #[error("order {order_id}: illegal transition {from:?} → {to:?}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The payment gateway did not answer within the configured window.
    /// Retryable with backoff; never a local state change.
    #[error("payment gateway timed out after {timeout_secs}s")]
    GatewayTimeout { timeout_secs: u64 },

    /// The payment gateway rejected the request. Terminal for this attempt.
    #[error("payment gateway rejected the request: {reason}")]
    GatewayRejected { reason: String },

    /// Refund could not be confirmed by the gateway. The order remains in
    /// its prior state and no stock was re-credited.
    #[error("refund failed for order {order_id}: {reason}")]
    RefundFailed { order_id: String, reason: String },

    /// An invariant check failed unexpectedly (e.g. negative stock observed
    /// outside `apply`). Fatal: the transaction is aborted.
    #[error("consistency violation: {detail}")]
    ConsistencyViolation { detail: String },
}

impl CoreError {
    /// Returns true if the failure is worth retrying with backoff.
    ///
    /// Only gateway timeouts qualify; business-rule conflicts must go back
    /// to the operator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::GatewayTimeout { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Collection has too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Invalid format (e.g. malformed identifier).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = CoreError::InsufficientStock {
            outlet_id: "outlet-1".into(),
            ingredient_id: "ing-espresso".into(),
            available: 3,
            required: 6,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock at outlet outlet-1 for ingredient ing-espresso: \
             available 3, required 6"
        );
    }

    #[test]
    fn validation_converts_to_core_error() {
        let validation = ValidationError::Required {
            field: "line_items".into(),
        };
        let core: CoreError = validation.into();
        assert!(matches!(core, CoreError::Validation(_)));
    }

    #[test]
    fn only_gateway_timeout_is_retryable() {
        assert!(CoreError::GatewayTimeout { timeout_secs: 10 }.is_retryable());
        assert!(!CoreError::GatewayRejected {
            reason: "card declined".into()
        }
        .is_retryable());
        assert!(!CoreError::OrderNotFound("x".into()).is_retryable());
    }
}
