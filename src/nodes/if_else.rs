/// If/else node: selects the `true-output` or `false-output` branch
///
/// The condition is the incoming value when one arrives, otherwise the node's
/// own `condition` field. Evaluation is deterministic: a condition that cannot
/// be read as a boolean takes the false branch.

use crate::nodes::{defined, patch, HandlerOutcome, NodeHandler};
use crate::workflow::types::{NodeData, NodeKind, HANDLE_FALSE_OUTPUT, HANDLE_TRUE_OUTPUT};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct IfElseHandler;

/// Read a value as a boolean condition, `None` if it is not boolean-like
pub fn evaluate_condition(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[async_trait]
impl NodeHandler for IfElseHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::IfElse
    }

    fn default_data(&self) -> NodeData {
        patch([("condition", json!(true)), ("result", Value::Null)])
    }

    async fn execute(&self, data: &NodeData, incoming: Option<&Value>) -> HandlerOutcome {
        let condition = defined(incoming).or_else(|| data.get("condition"));
        let result = match condition.and_then(evaluate_condition) {
            Some(result) => result,
            None => {
                tracing::warn!(
                    "⚠️ If/else condition {:?} is not boolean-like, taking the false branch",
                    condition
                );
                false
            }
        };

        let handle = if result { HANDLE_TRUE_OUTPUT } else { HANDLE_FALSE_OUTPUT };
        HandlerOutcome::pass(Some(json!(result)))
            .with_branch(handle)
            .with_patch(patch([("result", json!(result))]))
    }
}
