use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use jobber_types::events::GatewayEvent;

/// The room registry: maps each authenticated user to their live channels
/// and routes events. A user may hold several channels at once (devices,
/// tabs); each connect inserts its own entry and each disconnect removes
/// exactly that entry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Class-level broadcast for relay hints; every connected channel
    /// receives these regardless of room.
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-user rooms: user_id -> (conn_id -> sender)
    rooms: RwLock<HashMap<Uuid, HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to relay broadcasts. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an advisory event to every connected channel.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a live channel in the user's room.
    /// Returns (conn_id, own sender, receiver).
    pub async fn register(
        &self,
        user_id: Uuid,
    ) -> (
        Uuid,
        mpsc::UnboundedSender<GatewayEvent>,
        mpsc::UnboundedReceiver<GatewayEvent>,
    ) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .rooms
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(conn_id, tx.clone());
        (conn_id, tx, rx)
    }

    /// Remove a channel from its room. Touches only the caller's own entry;
    /// the user's other channels stay subscribed.
    pub async fn unregister(&self, user_id: Uuid, conn_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(channels) = rooms.get_mut(&user_id) {
            channels.remove(&conn_id);
            if channels.is_empty() {
                rooms.remove(&user_id);
            }
        }
    }

    /// Push an event to every channel in the user's room. Fire-and-forget:
    /// with no live channel the event is dropped, and the durable store
    /// stays the source of truth.
    pub async fn deliver_to(&self, user_id: Uuid, event: GatewayEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(channels) = rooms.get(&user_id) {
            for tx in channels.values() {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Number of live channels in the user's room.
    pub async fn channel_count(&self, user_id: Uuid) -> usize {
        self.inner
            .rooms
            .read()
            .await
            .get(&user_id)
            .map_or(0, |channels| channels.len())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
