use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::{Envelope, ok, ok_message};
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::account::{CartEntry, Role};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/cart", get(get_cart).delete(clear_cart))
        .route("/api/cart/items", post(add_item))
        .route(
            "/api/cart/items/:menu_item_id",
            patch(set_quantity).delete(remove_item),
        )
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<Json<Envelope<Vec<CartEntry>>>, AppError> {
    ctx.require_role(Role::Customer)?;

    let account = state
        .accounts
        .get(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    Ok(ok(account.cart.clone()))
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub menu_item_id: Uuid,
    pub quantity: u32,
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(payload): Json<AddItemRequest>,
) -> Result<Json<Envelope<Vec<CartEntry>>>, AppError> {
    ctx.require_role(Role::Customer)?;

    if payload.quantity == 0 {
        return Err(AppError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }

    let (restaurant_id, available) = {
        let item = state.menu_items.get(&payload.menu_item_id).ok_or_else(|| {
            AppError::NotFound(format!("menu item {} not found", payload.menu_item_id))
        })?;
        (item.restaurant_id, item.is_available)
    };

    if !available {
        return Err(AppError::Validation(
            "menu item is not available".to_string(),
        ));
    }

    let mut account = state
        .accounts
        .get_mut(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    // The cart stages items for a single restaurant at a time.
    if account
        .cart
        .iter()
        .any(|entry| entry.restaurant_id != restaurant_id)
    {
        return Err(AppError::conflict(
            "cart holds items from another restaurant",
        ));
    }

    match account
        .cart
        .iter_mut()
        .find(|entry| entry.menu_item_id == payload.menu_item_id)
    {
        Some(entry) => entry.quantity += payload.quantity,
        None => account.cart.push(CartEntry {
            menu_item_id: payload.menu_item_id,
            restaurant_id,
            quantity: payload.quantity,
        }),
    }

    Ok(ok(account.cart.clone()))
}

#[derive(Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

async fn set_quantity(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(menu_item_id): Path<Uuid>,
    Json(payload): Json<SetQuantityRequest>,
) -> Result<Json<Envelope<Vec<CartEntry>>>, AppError> {
    ctx.require_role(Role::Customer)?;

    if payload.quantity == 0 {
        return Err(AppError::Validation(
            "quantity must be at least 1; remove the item instead".to_string(),
        ));
    }

    let mut account = state
        .accounts
        .get_mut(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    let entry = account
        .cart
        .iter_mut()
        .find(|entry| entry.menu_item_id == menu_item_id)
        .ok_or_else(|| AppError::NotFound("item is not in the cart".to_string()))?;

    entry.quantity = payload.quantity;
    Ok(ok(account.cart.clone()))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(menu_item_id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<CartEntry>>>, AppError> {
    ctx.require_role(Role::Customer)?;

    let mut account = state
        .accounts
        .get_mut(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    let before = account.cart.len();
    account.cart.retain(|entry| entry.menu_item_id != menu_item_id);
    if account.cart.len() == before {
        return Err(AppError::NotFound("item is not in the cart".to_string()));
    }

    Ok(ok(account.cart.clone()))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<Json<Envelope<Vec<CartEntry>>>, AppError> {
    ctx.require_role(Role::Customer)?;

    let mut account = state
        .accounts
        .get_mut(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    account.cart.clear();
    Ok(ok_message("cart cleared", Vec::new()))
}
