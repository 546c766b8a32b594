//! Testing utilities for the Blockforge workspace
//!
//! Shared schemas, block builders and a scripted transport that records
//! every request it sees.

#![allow(missing_docs)]

use async_trait::async_trait;
use forge_block::Block;
use forge_request::{ForgeConfig, HttpRequest, HttpResponse, Transport, TransportError};
use forge_schema::SchemaRegistry;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const BASE_URL: &str = "https://api.example.com";

/// Order → customer (parentFirstBodyId), items (parentFirstRouteId);
/// LineItem → sku (childFirstBodyId)
pub fn order_schema() -> Value {
    json!({
        "type": "object",
        "endpoint": "orders",
        "required": ["name"],
        "properties": {
            "name": {"type": "string"},
            "customer": {
                "$ref": "Customer.json",
                "apiCreationStrategy": "parentFirstBodyId",
                "childRefToParent": "customerId"
            },
            "items": {
                "type": "array",
                "items": {"$ref": "LineItem.json"},
                "apiCreationStrategy": "parentFirstRouteId"
            }
        }
    })
}

pub fn line_item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "quantity": {"type": "integer"},
            "sku": {
                "$ref": "Product.json",
                "apiCreationStrategy": "childFirstBodyId"
            }
        }
    })
}

pub fn product_schema() -> Value {
    json!({
        "type": "object",
        "endpoint": "products",
        "properties": {"code": {"type": "string"}}
    })
}

pub fn customer_schema() -> Value {
    json!({
        "type": "object",
        "endpoint": "customers",
        "properties": {"name": {"type": "string"}}
    })
}

/// Registry holding Order, LineItem, Product and Customer
pub fn order_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register("Order", order_schema());
    registry.register("LineItem", line_item_schema());
    registry.register("Product", product_schema());
    registry.register("Customer", customer_schema());
    registry
}

pub fn config() -> ForgeConfig {
    ForgeConfig::new().with_base_url(BASE_URL)
}

pub fn product(code: &str) -> Block {
    Block::object("Product").with_required("code", Block::scalar(json!(code)))
}

pub fn line_item(quantity: i64) -> Block {
    Block::object("LineItem").with_optional("quantity", Block::scalar(json!(quantity)))
}

pub fn line_item_with_product(quantity: i64, code: &str) -> Block {
    line_item(quantity).with_optional("sku", product(code))
}

pub fn customer(name: &str) -> Block {
    Block::object("Customer").with_optional("name", Block::scalar(json!(name)))
}

/// Order block with the given line items and no customer
pub fn order(name: &str, items: Vec<Block>) -> Block {
    Block::object("Order")
        .with_required("name", Block::scalar(json!(name)))
        .with_optional("items", Block::array("LineItem_array", items))
}

/// Transport answering from a script and recording every request
///
/// Scripted answers are used first, in order. Then the first route rule
/// whose pattern occurs in the URL answers. Anything else gets
/// `201 {"id": "id-N"}` with N counting unscripted requests from 1.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    scripted: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    routes: Mutex<Vec<(String, HttpResponse)>>,
    counter: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next request
    #[must_use]
    pub fn then(self, answer: Result<HttpResponse, TransportError>) -> Self {
        self.scripted.lock().push_back(answer);
        self
    }

    /// Queue a plain response
    #[must_use]
    pub fn then_respond(self, status: u16, body: &str) -> Self {
        self.then(Ok(HttpResponse::new(status, body)))
    }

    /// Answer every URL containing `pattern` with a fixed response
    #[must_use]
    pub fn on_route(self, pattern: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .push((pattern.to_string(), HttpResponse::new(status, body)));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }

    /// Request bodies parsed as JSON, `Null` for requests without one
    pub fn bodies(&self) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .map(|r| {
                r.body
                    .as_deref()
                    .and_then(|b| serde_json::from_str(b).ok())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        if let Some(answer) = self.scripted.lock().pop_front() {
            return answer;
        }
        if let Some((_, response)) = self
            .routes
            .lock()
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
        {
            return Ok(response.clone());
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(HttpResponse::new(201, json!({"id": format!("id-{n}")}).to_string()))
    }
}
