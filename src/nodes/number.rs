/// Number node: a value source and sink

use crate::nodes::{defined, patch, HandlerOutcome, NodeHandler};
use crate::workflow::types::{Edge, NodeData, NodeKind};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct NumberHandler;

#[async_trait]
impl NodeHandler for NumberHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Number
    }

    fn default_data(&self) -> NodeData {
        patch([("value", json!(0))])
    }

    async fn execute(&self, data: &NodeData, incoming: Option<&Value>) -> HandlerOutcome {
        let value = defined(incoming).or_else(|| data.get("value")).cloned();
        HandlerOutcome::pass(value)
    }

    fn route_input(&self, _edge: &Edge, value: Option<&Value>, _upstream: &NodeData) -> Option<NodeData> {
        defined(value).map(|value| patch([("value", value.clone())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefers_incoming_value() {
        let data = NumberHandler.default_data();
        let outcome = NumberHandler.execute(&data, Some(&json!(7))).await;
        assert_eq!(outcome.value, Some(json!(7)));

        let outcome = NumberHandler.execute(&patch([("value", json!(12))]), None).await;
        assert_eq!(outcome.value, Some(json!(12)));
    }

    #[test]
    fn routing_ignores_undefined() {
        let edge = Edge::new("e", "a", "n");
        assert_eq!(NumberHandler.route_input(&edge, None, &NodeData::new()), None);
        assert_eq!(NumberHandler.route_input(&edge, Some(&Value::Null), &NodeData::new()), None);
        assert_eq!(
            NumberHandler.route_input(&edge, Some(&json!(5)), &NodeData::new()),
            Some(patch([("value", json!(5))]))
        );
    }
}
