//! Order command and query endpoints.
//!
//! Commands go through the [`OrderService`] write path; queries read the
//! order summary read model, which is fed asynchronously. A summary may
//! therefore trail a just-accepted command by a moment.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{
    AddItem, Aggregate, CancelOrder, CommandResult, ConfirmOrder, CreateOrder, Money, Order,
    OrderService, OrderStatus, ProcessOrder, RemoveItem, ShipOrder, UpdateShippingAddress,
};
use event_store::EventStore;
use projections::{
    ChannelPublisher, InMemoryReadModelStore, OrderSummary, ProjectionProcessor, ReadModelStore,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// What every handler gets to see: the write path, the read model, and
/// the processor (so tests can rebuild on demand).
pub struct AppState<S: EventStore> {
    pub order_service: OrderService<S, ChannelPublisher>,
    pub read_model: InMemoryReadModelStore,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

// Request bodies

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Client-supplied order ID. A blank or missing ID is generated
    /// server-side.
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    /// Unit price as a decimal amount, e.g. `10.00`.
    pub price: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipOrderRequest {
    pub tracking_number: String,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShippingAddressRequest {
    pub shipping_address: String,
}

// Response bodies

/// Acknowledges an accepted command with the order's new version.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub order_id: String,
    pub version: i64,
    pub status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    pub order_id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<String>,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: f64,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
    pub line_total: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub order_id: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

fn command_response(result: &CommandResult<Order>) -> CommandResponse {
    CommandResponse {
        order_id: result
            .aggregate
            .id()
            .map(ToString::to_string)
            .unwrap_or_default(),
        version: result.new_version.as_i64(),
        status: result.aggregate.status().to_string(),
    }
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        let items = summary
            .items
            .into_iter()
            .map(|item| {
                let line_total = item.line_total().to_decimal();
                OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name,
                    quantity: item.quantity,
                    price: item.price.to_decimal(),
                    line_total,
                }
            })
            .collect();

        Self {
            order_id: summary.order_id.to_string(),
            customer_id: summary.customer_id,
            customer_name: summary.customer_name,
            customer_email: summary.customer_email,
            shipping_address: summary.shipping_address,
            status: summary.status.to_string(),
            items,
            total_amount: summary.total_amount.to_decimal(),
            tracking_number: summary.tracking_number,
            cancellation_reason: summary.cancellation_reason,
            created_at: summary.created_at.to_rfc3339(),
            updated_at: summary.updated_at.to_rfc3339(),
        }
    }
}

// Command handlers

/// POST /api/orders — create a new, empty order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let order_id = match req.order_id {
        Some(id) if !id.trim().is_empty() => OrderId::new(id),
        _ => OrderId::generate(),
    };

    let cmd = CreateOrder {
        order_id,
        customer_id: req.customer_id,
        customer_name: req.customer_name,
        customer_email: req.customer_email,
        shipping_address: req.shipping_address,
    };
    let result = state.order_service.create_order(cmd).await?;

    Ok((StatusCode::CREATED, Json(command_response(&result))))
}

/// POST /api/orders/:id/items — add an item, replacing any line with the
/// same product ID.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let cmd = AddItem::new(
        OrderId::new(id),
        req.product_id,
        req.product_name,
        req.quantity,
        Money::from_decimal(req.price),
    );
    let result = state.order_service.add_item(cmd).await?;

    Ok(Json(command_response(&result)))
}

/// DELETE /api/orders/:id/items/:product_id — remove an item line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, product_id)): Path<(String, String)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let cmd = RemoveItem::new(OrderId::new(id), product_id);
    let result = state.order_service.remove_item(cmd).await?;

    Ok(Json(command_response(&result)))
}

/// POST /api/orders/:id/confirm — confirm a created order.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, ApiError> {
    let result = state
        .order_service
        .confirm_order(ConfirmOrder::new(OrderId::new(id)))
        .await?;

    Ok(Json(command_response(&result)))
}

/// POST /api/orders/:id/process — mark a confirmed order as processed.
#[tracing::instrument(skip(state))]
pub async fn process<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, ApiError> {
    let result = state
        .order_service
        .process_order(ProcessOrder::new(OrderId::new(id)))
        .await?;

    Ok(Json(command_response(&result)))
}

/// POST /api/orders/:id/ship — ship a processed order.
#[tracing::instrument(skip(state, req))]
pub async fn ship<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ShipOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let cmd = ShipOrder::new(OrderId::new(id), req.tracking_number);
    let result = state.order_service.ship_order(cmd).await?;

    Ok(Json(command_response(&result)))
}

/// POST /api/orders/:id/cancel — cancel an order that has not shipped.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let cmd = CancelOrder::new(OrderId::new(id), req.reason);
    let result = state.order_service.cancel_order(cmd).await?;

    Ok(Json(command_response(&result)))
}

/// PUT /api/orders/:id/shipping-address — change the shipping address.
///
/// Setting the address to its current value is a no-op: the order's
/// version in the response stays unchanged.
#[tracing::instrument(skip(state, req))]
pub async fn update_shipping_address<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateShippingAddressRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let cmd = UpdateShippingAddress::new(OrderId::new(id), req.shipping_address);
    let result = state.order_service.update_shipping_address(cmd).await?;

    Ok(Json(command_response(&result)))
}

// Query handlers

/// GET /api/orders/:id — load an order summary from the read model.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderSummaryResponse>, ApiError> {
    let order_id = OrderId::new(id);
    let summary = state
        .read_model
        .summary(&order_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;

    Ok(Json(summary.into()))
}

/// GET /api/orders — list all order summaries.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let summaries = state
        .read_model
        .all_summaries()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// GET /api/orders/customer/:customer_id — list summaries for one customer.
#[tracing::instrument(skip(state))]
pub async fn by_customer<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let summaries = state
        .read_model
        .summaries_for_customer(&customer_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// GET /api/orders/status/:status — list summaries with the given status.
///
/// The status must be one of the exact uppercase forms, e.g. `CREATED`
/// or `SHIPPED`.
#[tracing::instrument(skip(state))]
pub async fn by_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let status = OrderStatus::from_str(&status)
        .map_err(|_| ApiError::BadRequest(format!("Unknown order status: {status}")))?;

    let summaries = state
        .read_model
        .summaries_with_status(status)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// GET /api/orders/:id/events — list all events for an order, in append
/// order.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let order_id = OrderId::new(id);
    let envelopes = state.order_service.order_events(&order_id).await?;

    let responses: Vec<EventEnvelopeResponse> = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            order_id: e.order_id.to_string(),
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}
