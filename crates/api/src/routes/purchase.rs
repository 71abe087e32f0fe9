//! Purchase endpoints: the usage hint and order submission.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use common::OrderLines;
use purchase::{CancelToken, Dispatcher};
use serde_json::Value;
use store::ProductStore;
use tokio::time::Instant;

use crate::error::ApiError;

/// Body of `GET /`.
pub const EXAMPLE_QUERY: &str = r#"example of POST query: {"order":[{"product":"apple","amount":45},{"product":"melon","amount":11}]}"#;

const ORDER_LIST_REQUIRED: &str = "you need to send list of products with key 'order'";
const PRODUCT_NAME_REQUIRED: &str = "you need to send string value with key 'product'";
const EMPTY_ORDER: &str = "your order is empty, try to add something in POST query";

/// Shared application state accessible from all handlers.
pub struct AppState<S: ProductStore> {
    pub dispatcher: Dispatcher<S>,
    pub request_timeout: Option<Duration>,
}

impl<S: ProductStore + 'static> AppState<S> {
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        Self {
            dispatcher,
            request_timeout: None,
        }
    }

    /// Bounds every purchase by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn request_scope(&self) -> CancelToken {
        let scope = CancelToken::new();
        match self.request_timeout {
            Some(timeout) => scope.with_deadline(Instant::now() + timeout),
            None => scope,
        }
    }
}

/// GET /: shows what a purchase request looks like.
pub async fn hello() -> &'static str {
    EXAMPLE_QUERY
}

/// POST /: runs the purchase and returns the reply JSON as is.
#[tracing::instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn buy<S: ProductStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let lines = parse_order(&body)?;
    if lines.is_empty() {
        return Err(ApiError::bad_request(EMPTY_ORDER));
    }

    let scope = state.request_scope();
    let reply = state.dispatcher.dispatch_with(lines, &scope).await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], reply).into_response())
}

/// Reads `{"order":[{"product":..,"amount":..}, ...]}` into order lines.
///
/// An empty body, or one without an `order` key, yields no lines. The first
/// malformed entry rejects the whole request.
pub fn parse_order(body: &[u8]) -> Result<OrderLines, ApiError> {
    let mut lines = OrderLines::new();
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(lines);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request(ORDER_LIST_REQUIRED))?;
    let Some(order) = value.get("order") else {
        return Ok(lines);
    };
    let entries = order
        .as_array()
        .ok_or_else(|| ApiError::bad_request(ORDER_LIST_REQUIRED))?;

    for entry in entries {
        if !entry.is_object() {
            return Err(ApiError::bad_request(ORDER_LIST_REQUIRED));
        }

        let product = entry
            .get("product")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::bad_request(PRODUCT_NAME_REQUIRED))?;
        let amount = entry
            .get("amount")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                ApiError::bad_request(format!(
                    "error value in key 'amount', product name: {product}"
                ))
            })?;

        lines.add(product, amount)?;
    }

    Ok(lines)
}
