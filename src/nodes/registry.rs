/// Hot-swappable node handler registry using ArcSwap
///
/// Lookups are lock-free; registering a handler swaps the whole map, so a
/// run in progress keeps the handlers it started with.

use crate::nodes::{
    calculator::CalculatorHandler, http_request::HttpRequestHandler, if_else::IfElseHandler,
    number::NumberHandler, trigger::ScheduleHandler, trigger::TriggerHandler,
    weather::WeatherHandler, NodeHandler,
};
use crate::runtime::http::HttpClient;
use crate::workflow::types::{NodeData, NodeKind};
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Map from node kind to its handler
pub struct NodeHandlerRegistry {
    handlers: ArcSwap<HashMap<NodeKind, Arc<dyn NodeHandler>>>,
}

impl NodeHandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            handlers: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Registry with a handler for every built-in kind
    pub fn with_defaults(http_client: Arc<dyn HttpClient>) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(TriggerHandler));
        registry.register(Arc::new(ScheduleHandler));
        registry.register(Arc::new(NumberHandler));
        registry.register(Arc::new(CalculatorHandler));
        registry.register(Arc::new(IfElseHandler));
        registry.register(Arc::new(HttpRequestHandler::new(http_client)));
        registry.register(Arc::new(WeatherHandler));
        registry
    }

    /// Add or replace the handler for its kind
    pub fn register(&self, handler: Arc<dyn NodeHandler>) {
        let kind = handler.kind();
        let current = self.handlers.load();
        let mut updated = (**current).clone();
        if updated.insert(kind, handler).is_some() {
            tracing::info!("🔁 Replaced node handler: {}", kind);
        } else {
            tracing::debug!("🧩 Registered node handler: {}", kind);
        }
        self.handlers.store(Arc::new(updated));
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.load().get(&kind).cloned()
    }

    /// Default data for a node of `kind` about to be placed
    pub fn default_data(&self, kind: NodeKind) -> Option<NodeData> {
        self.get(kind).map(|handler| handler.default_data())
    }

    /// Registered kinds, in palette order
    pub fn kinds(&self) -> Vec<NodeKind> {
        let handlers = self.handlers.load();
        NodeKind::ALL
            .into_iter()
            .filter(|kind| handlers.contains_key(kind))
            .collect()
    }
}

impl Default for NodeHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
