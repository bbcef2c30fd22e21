//! Order intake, lookup and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::{OrderId, UserId};
use domain::{NewOrder, Order, OrderStatus};
use order_store::OrderStore;
use payments::NotificationKind;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub ok: bool,
    pub order_id: OrderId,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub ok: bool,
    pub order: Order,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub ok: bool,
    pub orders: Vec<Order>,
}

// -- Handlers --

/// POST /orders — validate, persist and start the payment window.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<Json<OrderCreatedResponse>, ApiError> {
    let Json(new_order) = payload?;
    let order = state.lifecycle.create_order(new_order).await?;
    let order_id = order.id;

    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&order, NotificationKind::OrderCreated).await {
            metrics::counter!("notification_failures_total").increment(1);
            tracing::warn!(order_id = %order.id, error = %e, "order notification failed");
        }
    });

    Ok(Json(OrderCreatedResponse { ok: true, order_id }))
}

/// GET /orders — all orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = state.lifecycle.list_orders().await?;
    Ok(Json(OrderListResponse { ok: true, orders }))
}

/// GET /orders/:id — load a single order.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .lifecycle
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("not found".to_string()))?;

    Ok(Json(OrderResponse { ok: true, order }))
}

/// PUT /orders/:id/status — move an order to a new status.
#[tracing::instrument(skip(state, payload))]
pub async fn set_status<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;
    let status: OrderStatus = req.status.trim().parse()?;

    let order = state.lifecycle.set_status(order_id, status).await?;
    Ok(Json(OrderResponse { ok: true, order }))
}

/// GET /users/:id/orders — one customer's order history.
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let user_id: UserId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid user id: {e}")))?;

    let orders = state.lifecycle.list_orders_for_user(user_id).await?;
    Ok(Json(OrderListResponse { ok: true, orders }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
