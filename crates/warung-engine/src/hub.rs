//! # Realtime Broadcast Hub
//!
//! Fan-out of order/inventory state changes to subscribed terminal sessions.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Broadcast Hub Architecture                        │
//! │                                                                         │
//! │  OrderEngine / InventoryLedger / GatewayAdapter                         │
//! │        │  publish(outlet_id, event)    (never blocks, never fails       │
//! │        ▼                                the mutation path)              │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      BroadcastHub                               │   │
//! │  │                                                                 │   │
//! │  │   outlet "o-1" ──► broadcast::Sender ──┬──► cashier session     │   │
//! │  │                                        ├──► kitchen session     │   │
//! │  │   outlet "o-2" ──► broadcast::Sender ──┤    (role filter on     │   │
//! │  │                                        │     the receive side)  │   │
//! │  │                                        └──► owner session       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Guarantees
//! - Per-order causal order: events for one `order_id` are published while
//!   that order's mutex is held, so a given subscriber sees them in commit
//!   order. No ordering is promised across distinct orders.
//! - At-least-once: a subscriber that lagged past the channel capacity (or
//!   reconnected) starts from a full snapshot of in-flight orders rather
//!   than replaying missed events.

use std::collections::{HashMap, HashSet};

use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use warung_core::{Order, TerminalRole};

use crate::events::EngineEvent;

// =============================================================================
// Hub
// =============================================================================

struct OutletChannel {
    tx: broadcast::Sender<EngineEvent>,
    /// Active terminal session ids, for dashboards and leak checks.
    sessions: HashSet<String>,
}

/// Per-outlet publish/subscribe fan-out.
///
/// Subscriptions are ephemeral: they exist only while a terminal is
/// connected and are never persisted.
pub struct BroadcastHub {
    buffer: usize,
    outlets: RwLock<HashMap<String, OutletChannel>>,
}

impl BroadcastHub {
    /// Creates a hub whose per-outlet channels buffer `buffer` events.
    pub fn new(buffer: usize) -> Self {
        BroadcastHub {
            buffer,
            outlets: RwLock::new(HashMap::new()),
        }
    }

    /// Publishes an event to every session subscribed to the outlet.
    ///
    /// This must never delay or fail an order/inventory transaction:
    /// `broadcast::Sender::send` does not await, and "no subscribers" is
    /// not an error.
    pub async fn publish(&self, outlet_id: &str, event: EngineEvent) {
        let outlets = self.outlets.read().await;
        if let Some(channel) = outlets.get(outlet_id) {
            // Err here only means no live receivers; the event is simply gone,
            // which at-least-once + snapshot-on-subscribe already covers.
            let _ = channel.tx.send(event);
        } else {
            debug!(outlet_id, "Event published to outlet with no channel yet");
        }
    }

    /// Registers a terminal session and returns its subscription.
    ///
    /// The receiver is attached BEFORE the caller collects the in-flight
    /// snapshot, so no event can fall between snapshot and stream.
    pub async fn subscribe(
        &self,
        outlet_id: &str,
        session_id: &str,
        role: TerminalRole,
    ) -> Subscription {
        let mut outlets = self.outlets.write().await;
        let channel = outlets
            .entry(outlet_id.to_string())
            .or_insert_with(|| OutletChannel {
                tx: broadcast::channel(self.buffer).0,
                sessions: HashSet::new(),
            });
        channel.sessions.insert(session_id.to_string());
        info!(outlet_id, session_id, ?role, "Terminal subscribed");

        Subscription {
            session_id: session_id.to_string(),
            outlet_id: outlet_id.to_string(),
            role,
            snapshot: Vec::new(),
            rx: channel.tx.subscribe(),
        }
    }

    /// Removes a session from the outlet's registry.
    ///
    /// The subscription's receiver dies when dropped; this only clears the
    /// bookkeeping entry.
    pub async fn unsubscribe(&self, outlet_id: &str, session_id: &str) {
        let mut outlets = self.outlets.write().await;
        if let Some(channel) = outlets.get_mut(outlet_id) {
            if channel.sessions.remove(session_id) {
                info!(outlet_id, session_id, "Terminal unsubscribed");
            }
        }
    }

    /// Number of registered sessions for an outlet.
    pub async fn session_count(&self, outlet_id: &str) -> usize {
        self.outlets
            .read()
            .await
            .get(outlet_id)
            .map(|c| c.sessions.len())
            .unwrap_or(0)
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// One terminal session's view of an outlet's event stream.
///
/// Carries the initial snapshot of in-flight orders plus a live, role-filtered
/// event stream. Finite per connection lifetime, conceptually infinite while
/// connected.
pub struct Subscription {
    pub session_id: String,
    pub outlet_id: String,
    role: TerminalRole,
    snapshot: Vec<Order>,
    rx: broadcast::Receiver<EngineEvent>,
}

impl Subscription {
    /// The subscriber's role.
    pub fn role(&self) -> TerminalRole {
        self.role
    }

    /// The in-flight orders snapshot taken at subscribe time.
    pub fn snapshot(&self) -> &[Order] {
        &self.snapshot
    }

    pub(crate) fn load_snapshot(&mut self, orders: Vec<Order>) {
        self.snapshot = orders;
    }

    /// Receives the next event this role is entitled to.
    ///
    /// Returns `None` once the outlet channel is closed (hub dropped). A
    /// lagged receiver logs and keeps going - it will have lost events, which
    /// is exactly the case the reconnect-with-snapshot contract covers.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.visible_to(self.role) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(
                        session_id = %self.session_id,
                        outlet_id = %self.outlet_id,
                        missed,
                        "Subscriber lagged; resubscribe for a fresh snapshot"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Converts the live side of the subscription into a lazy stream.
    pub fn into_stream(self) -> impl Stream<Item = EngineEvent> {
        let role = self.role;
        BroadcastStream::new(self.rx).filter_map(move |item| match item {
            Ok(event) if event.visible_to(role) => Some(event),
            _ => None,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use warung_core::OrderStatus;

    fn status_event(order_id: &str, to: OrderStatus) -> EngineEvent {
        EngineEvent::OrderStatusChanged {
            order_id: order_id.into(),
            outlet_id: "outlet-1".into(),
            from: OrderStatus::Paid,
            to,
            actor: "test".into(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fan_out_reaches_all_entitled_sessions() {
        let hub = BroadcastHub::new(16);
        let mut owner = hub.subscribe("outlet-1", "s-owner", TerminalRole::Owner).await;
        let mut cashier = hub.subscribe("outlet-1", "s-cash", TerminalRole::Cashier).await;

        hub.publish("outlet-1", status_event("ord-1", OrderStatus::Completed))
            .await;

        assert!(owner.recv().await.is_some());
        assert!(cashier.recv().await.is_some());
    }

    #[tokio::test]
    async fn role_filter_drops_unentitled_events() {
        let hub = BroadcastHub::new(16);
        let mut waiter = hub.subscribe("outlet-1", "s-wait", TerminalRole::Waiter).await;

        // Waiter is not entitled to InPreparation, only ReadyToServe.
        hub.publish("outlet-1", status_event("ord-1", OrderStatus::InPreparation))
            .await;
        hub.publish("outlet-1", status_event("ord-1", OrderStatus::ReadyToServe))
            .await;

        let event = waiter.recv().await.unwrap();
        match event {
            EngineEvent::OrderStatusChanged { to, .. } => {
                assert_eq!(to, OrderStatus::ReadyToServe)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn outlets_are_isolated() {
        let hub = BroadcastHub::new(16);
        let mut other = hub.subscribe("outlet-2", "s-2", TerminalRole::Owner).await;

        hub.publish("outlet-1", status_event("ord-1", OrderStatus::Completed))
            .await;
        // Nothing arrives on outlet-2; channel is empty, recv would hang.
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), other.recv()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let hub = BroadcastHub::new(16);
        // Must not error or block.
        hub.publish("outlet-9", status_event("ord-1", OrderStatus::Completed))
            .await;
    }

    #[tokio::test]
    async fn per_order_events_arrive_in_commit_order() {
        let hub = BroadcastHub::new(64);
        let mut owner = hub.subscribe("outlet-1", "s-o", TerminalRole::Owner).await;

        for to in [
            OrderStatus::InPreparation,
            OrderStatus::ReadyToServe,
            OrderStatus::Completed,
        ] {
            hub.publish("outlet-1", status_event("ord-1", to)).await;
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            if let Some(EngineEvent::OrderStatusChanged { to, .. }) = owner.recv().await {
                seen.push(to);
            }
        }
        assert_eq!(
            seen,
            vec![
                OrderStatus::InPreparation,
                OrderStatus::ReadyToServe,
                OrderStatus::Completed
            ]
        );
    }

    #[tokio::test]
    async fn unsubscribe_clears_session_registry() {
        let hub = BroadcastHub::new(16);
        let _sub = hub.subscribe("outlet-1", "s-1", TerminalRole::Cashier).await;
        assert_eq!(hub.session_count("outlet-1").await, 1);
        hub.unsubscribe("outlet-1", "s-1").await;
        assert_eq!(hub.session_count("outlet-1").await, 0);
    }

    #[tokio::test]
    async fn stream_interface_yields_events() {
        let hub = BroadcastHub::new(16);
        let sub = hub.subscribe("outlet-1", "s-1", TerminalRole::Owner).await;

        hub.publish("outlet-1", status_event("ord-1", OrderStatus::Completed))
            .await;

        let mut stream = Box::pin(sub.into_stream());
        let event = stream.next().await.unwrap();
        assert_eq!(event.order_id(), Some("ord-1"));
    }
}
