//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::bus::BusAdapter;
use crate::config::SessionConfig;
use crate::dispatch::{EventDispatcher, RecipientResolver};
use crate::domain::ChannelRegistry;
use crate::persistence::NotificationStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// The registry is created here once and handed to everything that needs
/// it; there is no global instance.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live channels, shared by sessions and the dispatcher.
    pub registry: Arc<ChannelRegistry>,
    /// Inbound bus envelope handling; owns the fan-out engine.
    pub bus: BusAdapter,
    /// Durable notification store.
    pub store: Arc<dyn NotificationStore>,
    /// Parameters for new streaming sessions.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Wires a fresh registry, resolver, dispatcher and bus adapter around
    /// `store`. The dispatcher is reachable only through the bus adapter.
    #[must_use]
    pub fn new(store: Arc<dyn NotificationStore>, session_config: SessionConfig) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            RecipientResolver::new(Arc::clone(&registry)),
            Arc::clone(&store),
        ));
        let bus = BusAdapter::new(dispatcher);
        Self {
            registry,
            bus,
            store,
            session_config,
        }
    }
}
