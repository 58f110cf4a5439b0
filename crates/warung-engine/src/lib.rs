//! # warung-engine: The Transactional Engine
//!
//! Accepts orders from cashier terminals, reserves and deducts inventory,
//! routes preparation to kitchen/waiter displays in real time, settles
//! payment through an external gateway, and keeps all terminals for one
//! business consistent under concurrent access.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       warung-engine Architecture                        │
//! │                                                                         │
//! │   cashier terminal            gateway webhook           owner dashboard │
//! │        │                            │                          ▲        │
//! │        ▼                            ▼                          │        │
//! │  ┌──────────────────────────────────────────────┐   ┌──────────┴─────┐ │
//! │  │               OrderEngine                    │   │  BroadcastHub  │ │
//! │  │  create / confirm / advance / cancel /refund │──▶│  per-outlet    │ │
//! │  └───────┬──────────────────┬───────────────────┘   │  role fan-out  │ │
//! │          │                  │                       └──────────▲─────┘ │
//! │          ▼                  ▼                                  │        │
//! │  ┌───────────────┐  ┌────────────────┐                        │        │
//! │  │InventoryLedger│  │ GatewayAdapter │                        │        │
//! │  │ per-outlet    │──│ charge/refund/ │────────────────────────┘        │
//! │  │ atomic apply  │  │ webhooks       │   (LowStockAlert, Payment…)     │
//! │  └───────────────┘  └────────────────┘                                 │
//! │          ▲                                                              │
//! │  ┌───────┴────────┐   ┌─────────────────────┐                          │
//! │  │BusinessRegistry│   │ ReconciliationSweep │ (expires unpaid orders)  │
//! │  │ tenant scoping │   └─────────────────────┘                          │
//! │  └────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//! - Transitions for *different* orders proceed fully in parallel
//!   (one `tokio::sync::Mutex` per order).
//! - Operations touching shared inventory of the *same* outlet serialize
//!   through a per-outlet exclusive critical section in the ledger.
//! - Webhook application serializes per payment record, never globally.
//! - Hub fan-out is non-blocking with respect to the mutation path: a slow
//!   subscriber loses timeliness, never correctness.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod hub;
pub mod ledger;
pub mod orders;
pub mod registry;
pub mod sweep;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use events::EngineEvent;
pub use gateway::{
    GatewayAdapter, GatewayCharge, GatewayError, PaymentGateway, SharedKeyVerifier, WebhookAction,
    WebhookEvent, WebhookStatus, WebhookVerifier,
};
pub use hub::{BroadcastHub, Subscription};
pub use ledger::InventoryLedger;
pub use orders::OrderEngine;
pub use registry::{Business, BusinessRegistry, Outlet};
pub use sweep::{ReconciliationSweep, SweepHandle};
