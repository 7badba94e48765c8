use std::sync::Arc;

use jobber_gateway::dispatcher::Dispatcher;
use jobber_social::{ConnectionGraph, MessageStore, NotificationService};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub messages: MessageStore,
    pub connections: ConnectionGraph,
    pub notifications: NotificationService,
    pub dispatcher: Dispatcher,
}
