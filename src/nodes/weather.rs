/// Weather node: display sink for an upstream HTTP response

use crate::nodes::{patch, HandlerOutcome, NodeHandler};
use crate::workflow::types::{Edge, NodeData, NodeKind};
use async_trait::async_trait;
use serde_json::Value;

pub struct WeatherHandler;

#[async_trait]
impl NodeHandler for WeatherHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Weather
    }

    fn default_data(&self) -> NodeData {
        patch([
            ("lastResponse", Value::Null),
            ("lastStatus", Value::Null),
            ("lastError", Value::Null),
        ])
    }

    async fn execute(&self, _data: &NodeData, incoming: Option<&Value>) -> HandlerOutcome {
        HandlerOutcome::pass(incoming.cloned())
    }

    /// Copy a successful upstream response, or clear it and carry the upstream error
    fn route_input(&self, _edge: &Edge, value: Option<&Value>, upstream: &NodeData) -> Option<NodeData> {
        let succeeded = value
            .and_then(|value| value.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if succeeded {
            let field = |name: &str| {
                value
                    .and_then(|value| value.get(name))
                    .cloned()
                    .unwrap_or(Value::Null)
            };
            Some(patch([("lastResponse", field("data")), ("lastStatus", field("status"))]))
        } else {
            Some(patch([
                ("lastResponse", Value::Null),
                ("lastStatus", Value::Null),
                ("lastError", upstream.get("lastError").cloned().unwrap_or(Value::Null)),
            ]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn copies_successful_response() {
        let edge = Edge::new("e", "http", "w");
        let value = json!({"success": true, "data": {"main": {"temp": 18}}, "status": 200});
        let routed = WeatherHandler.route_input(&edge, Some(&value), &NodeData::new()).unwrap();
        assert_eq!(routed["lastResponse"], json!({"main": {"temp": 18}}));
        assert_eq!(routed["lastStatus"], json!(200));
        assert!(!routed.contains_key("lastError"));
    }

    #[test]
    fn failure_carries_upstream_error() {
        let edge = Edge::new("e", "http", "w");
        let value = json!({"success": false, "error": {"message": "boom"}});
        let upstream = patch([("lastError", json!({"message": "boom"}))]);
        let routed = WeatherHandler.route_input(&edge, Some(&value), &upstream).unwrap();
        assert_eq!(routed["lastResponse"], Value::Null);
        assert_eq!(routed["lastStatus"], Value::Null);
        assert_eq!(routed["lastError"], json!({"message": "boom"}));
    }
}
