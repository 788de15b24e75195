/// Calculator node: combines the values routed into `inputA` and `inputB`

use crate::nodes::{defined, patch, HandlerOutcome, NodeHandler};
use crate::workflow::types::{Edge, NodeData, NodeKind, HANDLE_INPUT_A, HANDLE_INPUT_B};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct CalculatorHandler;

/// Numeric reading of an operand; anything unreadable counts as 0
fn operand(data: &NodeData, field: &str) -> f64 {
    match data.get(field) {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        _ => 0.0,
    }
}

#[async_trait]
impl NodeHandler for CalculatorHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Calculator
    }

    fn default_data(&self) -> NodeData {
        patch([("valueA", json!(0)), ("valueB", json!(0)), ("operation", json!("add"))])
    }

    async fn execute(&self, data: &NodeData, _incoming: Option<&Value>) -> HandlerOutcome {
        let a = operand(data, "valueA");
        let b = operand(data, "valueB");
        let result = match data.get("operation").and_then(Value::as_str) {
            Some("subtract") => a - b,
            Some("multiply") => a * b,
            _ => a + b,
        };
        tracing::debug!("🧮 Calculator: {} {:?} {} = {}", a, data.get("operation"), b, result);

        HandlerOutcome::pass(Some(json!(result))).with_patch(patch([("result", json!(result))]))
    }

    fn route_input(&self, edge: &Edge, value: Option<&Value>, _upstream: &NodeData) -> Option<NodeData> {
        let value = defined(value)?;
        match edge.target_handle.as_deref() {
            Some(HANDLE_INPUT_A) => Some(patch([("valueA", value.clone())])),
            Some(HANDLE_INPUT_B) => Some(patch([("valueB", value.clone())])),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn applies_operation() {
        let data = patch([("valueA", json!(6)), ("valueB", json!("4")), ("operation", json!("multiply"))]);
        let outcome = CalculatorHandler.execute(&data, None).await;
        assert_eq!(outcome.value, Some(json!(24.0)));
        assert_eq!(outcome.data_patch, Some(patch([("result", json!(24.0))])));

        let data = patch([("valueA", json!(6)), ("valueB", json!(4)), ("operation", json!("subtract"))]);
        assert_eq!(CalculatorHandler.execute(&data, None).await.value, Some(json!(2.0)));

        let data = patch([("valueA", json!("x")), ("valueB", json!(4))]);
        assert_eq!(CalculatorHandler.execute(&data, None).await.value, Some(json!(4.0)));
    }

    #[test]
    fn routes_by_target_handle() {
        let upstream = NodeData::new();
        let to_a = Edge::new("ea", "x", "c").with_target_handle(HANDLE_INPUT_A);
        let to_b = Edge::new("eb", "y", "c").with_target_handle(HANDLE_INPUT_B);
        let unbound = Edge::new("ez", "z", "c");

        assert_eq!(
            CalculatorHandler.route_input(&to_a, Some(&json!(1)), &upstream),
            Some(patch([("valueA", json!(1))]))
        );
        assert_eq!(
            CalculatorHandler.route_input(&to_b, Some(&json!(2)), &upstream),
            Some(patch([("valueB", json!(2))]))
        );
        assert_eq!(CalculatorHandler.route_input(&unbound, Some(&json!(3)), &upstream), None);
        assert_eq!(CalculatorHandler.route_input(&to_a, None, &upstream), None);
    }
}
