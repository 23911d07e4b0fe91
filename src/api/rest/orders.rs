use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::{Envelope, created, ok};
use crate::auth::AuthContext;
use crate::engine::orders;
use crate::engine::orders::NewOrderItem;
use crate::engine::transitions::apply_transition;
use crate::error::AppError;
use crate::models::account::Role;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/:id", get(get_order))
        .route("/api/orders/:id/status", patch(update_status))
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItemRequest>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Envelope<Order>>), AppError> {
    let items: Vec<NewOrderItem> = payload
        .items
        .iter()
        .map(|item| NewOrderItem {
            menu_item_id: item.menu_item_id,
            quantity: item.quantity,
        })
        .collect();

    let order = orders::create_order(&state, &ctx, payload.restaurant_id, &items)?;
    Ok(created(order))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub rider_id: Option<Uuid>,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Envelope<Order>>, AppError> {
    let order = apply_transition(&state, &ctx, id, payload.status, payload.rider_id)?;
    Ok(ok(order))
}

fn is_participant(ctx: &AuthContext, order: &Order) -> bool {
    ctx.is_admin()
        || order.customer_id == ctx.account_id
        || order.restaurant_id == ctx.account_id
        || order.rider_id == Some(ctx.account_id)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Order>>, AppError> {
    let order = state
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    if !is_participant(&ctx, &order) {
        return Err(AppError::Forbidden(
            "not a participant in this order".to_string(),
        ));
    }

    Ok(ok(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Json<Envelope<Vec<Order>>> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| match ctx.role {
            Role::Admin => true,
            Role::Customer => entry.customer_id == ctx.account_id,
            Role::Restaurant => entry.restaurant_id == ctx.account_id,
            Role::Rider => entry.rider_id == Some(ctx.account_id),
        })
        .map(|entry| entry.value().clone())
        .collect();

    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ok(orders)
}
