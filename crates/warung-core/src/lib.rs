//! # warung-core: Pure Business Logic for Warung POS
//!
//! This crate is the **heart** of the Warung POS transactional core. It holds
//! the rules that must be true regardless of how many terminals are connected:
//! which order transitions are legal, how a sellable product expands into
//! ingredient consumption, and how money is computed.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Warung POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │      Terminal UIs (cashier / kitchen / waiter / owner)          │   │
//! │  │                  — external collaborators —                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    warung-engine                                │   │
//! │  │    OrderEngine • InventoryLedger • GatewayAdapter • Hub         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ warung-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   order   │  │  recipe   │  │   money   │  │   │
//! │  │   │  Order    │  │ lifecycle │  │ resolver  │  │  Money    │  │   │
//! │  │   │  Stock    │  │  rules    │  │           │  │  TaxRate  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, ProductVariant, StockRecord, PaymentRecord)
//! - [`order`] - The order state machine (the only way order status changes)
//! - [`recipe`] - Expands line items into ingredient consumption
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in minor units (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod recipe;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use warung_core::Money` instead of
// `use warung_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed on a single order.
///
/// ## Business Reason
/// Prevents runaway orders and keeps kitchen tickets readable.
/// Can be made configurable per-business in future versions.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Actor name recorded for transitions driven by gateway webhooks.
pub const GATEWAY_ACTOR: &str = "payment-gateway";

/// Actor name recorded for transitions driven by the reconciliation sweep.
pub const SWEEP_ACTOR: &str = "reconciliation-sweep";
