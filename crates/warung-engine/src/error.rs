//! # Engine Error Types
//!
//! Errors raised by the engine layer, wrapping the domain taxonomy from
//! warung-core and adding scoping and configuration failures.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Scoping      │  │     Domain      │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  UnknownBusiness│  │  Core (all of   │  │  InvalidConfig          │ │
//! │  │  UnknownOutlet  │  │  warung-core's  │  │  ConfigLoad             │ │
//! │  │  ScopeViolation │  │  taxonomy)      │  │  ConfigParse            │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use warung_core::CoreError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type covering everything the transactional core can surface.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Storage/channel detail never leaks to terminal UIs: callers match on
///   the variant, not on formatted strings
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Scoping Errors
    // =========================================================================
    /// The business id is not registered.
    #[error("unknown business: {0}")]
    UnknownBusiness(String),

    /// The outlet is not registered under the business.
    #[error("unknown outlet {outlet_id} for business {business_id}")]
    UnknownOutlet {
        business_id: String,
        outlet_id: String,
    },

    /// The call attempted to reach data across a business boundary.
    ///
    /// Raised BEFORE any state is read or mutated.
    #[error("scope violation: context {business_id}/{outlet_id} may not touch this entity")]
    ScopeViolation {
        business_id: String,
        outlet_id: String,
    },

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A business-rule or lifecycle failure from warung-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A second charge was initiated for an order whose payment has already
    /// settled.
    #[error("payment for order {order_id} has already settled")]
    PaymentAlreadySettled { order_id: String },

    /// The order has a refund awaiting gateway settlement; its lifecycle is
    /// frozen until the settlement webhook resolves it.
    #[error("order {order_id} has a refund awaiting settlement")]
    RefundInFlight { order_id: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration values are out of range.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read the config file.
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Failed to parse the config file.
    #[error("failed to parse config: {0}")]
    ConfigParse(String),
}

impl EngineError {
    /// Returns true if the failure is worth retrying with backoff
    /// (gateway timeouts only; everything else needs an operator).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Core(core) if core.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_pass_through_transparently() {
        let err: EngineError = CoreError::OrderNotFound("ord-1".into()).into();
        assert_eq!(err.to_string(), "order not found: ord-1");
    }

    #[test]
    fn retryability_follows_core() {
        let timeout: EngineError = CoreError::GatewayTimeout { timeout_secs: 10 }.into();
        assert!(timeout.is_retryable());
        assert!(!EngineError::UnknownBusiness("b".into()).is_retryable());
    }
}
