/// Node Handlers
///
/// One handler per node kind. A handler knows the default data for a newly
/// placed node, how to execute a node of its kind, and how to accept a value
/// arriving on one of its input handles. The engine only talks to handlers
/// through the [`NodeHandler`] trait, so a new kind never touches traversal.

use crate::workflow::types::{Edge, NodeData, NodeKind};
use async_trait::async_trait;
use serde_json::Value;

pub mod calculator;
pub mod http_request;
pub mod if_else;
pub mod number;
pub mod registry;
pub mod trigger;
pub mod weather;

pub use registry::NodeHandlerRegistry;

/// What a handler produced for one execution step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutcome {
    /// Value propagated to downstream nodes (`None` = undefined)
    pub value: Option<Value>,
    /// Live output handle; only set by branching kinds
    pub branch_handle: Option<String>,
    /// Fields merged back into the executing node
    pub data_patch: Option<NodeData>,
    /// Whether the step failed (recorded in node data, never aborts the run)
    pub errored: bool,
}

impl HandlerOutcome {
    /// Forward a value without branching or patching
    pub fn pass(value: Option<Value>) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_branch(mut self, handle: impl Into<String>) -> Self {
        self.branch_handle = Some(handle.into());
        self
    }

    pub fn with_patch(mut self, patch: NodeData) -> Self {
        self.data_patch = Some(patch);
        self
    }

    pub fn errored(mut self) -> Self {
        self.errored = true;
        self
    }
}

/// Per-kind node behavior
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Kind this handler serves
    fn kind(&self) -> NodeKind;

    /// Initial data for a freshly placed node
    fn default_data(&self) -> NodeData;

    /// Execute one step with the node's current data and the incoming value
    async fn execute(&self, data: &NodeData, incoming: Option<&Value>) -> HandlerOutcome;

    /// Accept `value` arriving over `edge` before this node is visited
    ///
    /// `upstream` is the source node's data after its own patch was applied.
    /// Returns the patch to merge into this node, if any.
    fn route_input(&self, _edge: &Edge, _value: Option<&Value>, _upstream: &NodeData) -> Option<NodeData> {
        None
    }
}

/// The incoming value when it is defined and not null
pub(crate) fn defined(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

/// Build a data patch from field/value pairs
pub(crate) fn patch<const N: usize>(fields: [(&str, Value); N]) -> NodeData {
    fields
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}
