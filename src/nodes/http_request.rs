/// HTTP request node: calls the HTTP collaborator and branches on the result
///
/// Success takes `success-output` and caches the response; any failure takes
/// `error-output` and records `lastError`. The full outcome object is what
/// flows downstream.

use crate::nodes::{patch, HandlerOutcome, NodeHandler};
use crate::runtime::http::{HttpClient, HttpRequestSpec};
use crate::workflow::types::{NodeData, NodeKind, HANDLE_ERROR_OUTPUT, HANDLE_SUCCESS_OUTPUT};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct HttpRequestHandler {
    client: Arc<dyn HttpClient>,
}

impl HttpRequestHandler {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

fn text_field(data: &NodeData, field: &str) -> String {
    match data.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        // headers/body edited as objects instead of text
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl NodeHandler for HttpRequestHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::HttpRequest
    }

    fn default_data(&self) -> NodeData {
        patch([
            ("url", json!("")),
            ("method", json!("GET")),
            ("headers", json!("")),
            ("body", json!("")),
            ("lastResponse", Value::Null),
            ("lastStatus", Value::Null),
            ("lastError", Value::Null),
        ])
    }

    async fn execute(&self, data: &NodeData, _incoming: Option<&Value>) -> HandlerOutcome {
        let request = HttpRequestSpec {
            url: text_field(data, "url"),
            method: text_field(data, "method"),
            headers: text_field(data, "headers"),
            body: text_field(data, "body"),
        };
        tracing::debug!("🌐 Executing HTTP request node: {} {}", request.method, request.url);

        let outcome = self.client.perform_request(&request).await;
        let value = serde_json::to_value(&outcome).unwrap_or(Value::Null);

        if outcome.success {
            HandlerOutcome::pass(Some(value))
                .with_branch(HANDLE_SUCCESS_OUTPUT)
                .with_patch(patch([
                    ("lastResponse", outcome.data.clone().unwrap_or(Value::Null)),
                    ("lastStatus", json!(outcome.status)),
                    ("lastError", Value::Null),
                ]))
        } else {
            let error = outcome
                .error
                .as_ref()
                .and_then(|error| serde_json::to_value(error).ok())
                .unwrap_or(Value::Null);
            HandlerOutcome::pass(Some(value))
                .with_branch(HANDLE_ERROR_OUTPUT)
                .with_patch(patch([("lastError", error), ("lastResponse", Value::Null)]))
                .errored()
        }
    }
}
