use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::{Envelope, created, ok, ok_message};
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::wishlist::{Wishlist, WishlistItem};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wishlist", post(create_wishlist).get(list_wishlists))
        .route(
            "/api/wishlist/:id",
            get(get_wishlist).patch(rename_wishlist).delete(delete_wishlist),
        )
        .route("/api/wishlist/:id/items", post(add_item))
        .route(
            "/api/wishlist/:id/items/:menu_item_id",
            delete(remove_item),
        )
}

#[derive(Deserialize)]
pub struct CreateWishlistRequest {
    pub name: String,
    pub restaurant_id: Uuid,
}

async fn create_wishlist(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(payload): Json<CreateWishlistRequest>,
) -> Result<(StatusCode, Json<Envelope<Wishlist>>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let restaurant_exists = state
        .accounts
        .get(&payload.restaurant_id)
        .map(|account| account.restaurant.is_some())
        .unwrap_or(false);
    if !restaurant_exists {
        return Err(AppError::NotFound(format!(
            "restaurant {} not found",
            payload.restaurant_id
        )));
    }

    let wishlist = Wishlist {
        id: Uuid::new_v4(),
        owner_id: ctx.account_id,
        restaurant_id: payload.restaurant_id,
        name: payload.name.trim().to_string(),
        items: Vec::new(),
        created_at: Utc::now(),
    };

    state.wishlists.insert(wishlist.id, wishlist.clone());
    Ok(created(wishlist))
}

async fn list_wishlists(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Json<Envelope<Vec<Wishlist>>> {
    let lists: Vec<Wishlist> = state
        .wishlists
        .iter()
        .filter(|entry| entry.owner_id == ctx.account_id)
        .map(|entry| entry.value().clone())
        .collect();

    ok(lists)
}

async fn get_wishlist(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Wishlist>>, AppError> {
    let wishlist = state
        .wishlists
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("wishlist {id} not found")))?;

    if wishlist.owner_id != ctx.account_id {
        return Err(AppError::Forbidden("not your wishlist".to_string()));
    }

    Ok(ok(wishlist))
}

#[derive(Deserialize)]
pub struct RenameWishlistRequest {
    pub name: String,
}

async fn rename_wishlist(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenameWishlistRequest>,
) -> Result<Json<Envelope<Wishlist>>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let mut wishlist = state
        .wishlists
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("wishlist {id} not found")))?;

    if wishlist.owner_id != ctx.account_id {
        return Err(AppError::Forbidden("not your wishlist".to_string()));
    }

    wishlist.name = payload.name.trim().to_string();
    Ok(ok(wishlist.clone()))
}

async fn delete_wishlist(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Uuid>>, AppError> {
    let owned = state
        .wishlists
        .get(&id)
        .map(|entry| entry.owner_id == ctx.account_id)
        .ok_or_else(|| AppError::NotFound(format!("wishlist {id} not found")))?;

    if !owned {
        return Err(AppError::Forbidden("not your wishlist".to_string()));
    }

    state.wishlists.remove(&id);
    Ok(ok_message("wishlist deleted", id))
}

#[derive(Deserialize)]
pub struct AddWishlistItemRequest {
    pub menu_item_id: Uuid,
    pub quantity: Option<u32>,
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddWishlistItemRequest>,
) -> Result<Json<Envelope<Wishlist>>, AppError> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }

    let item = state
        .menu_items
        .get(&payload.menu_item_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| {
            AppError::NotFound(format!("menu item {} not found", payload.menu_item_id))
        })?;

    let mut wishlist = state
        .wishlists
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("wishlist {id} not found")))?;

    if wishlist.owner_id != ctx.account_id {
        return Err(AppError::Forbidden("not your wishlist".to_string()));
    }

    // Lists are scoped to one restaurant; items from anywhere else are
    // rejected.
    if item.restaurant_id != wishlist.restaurant_id {
        return Err(AppError::Validation(
            "menu item belongs to another restaurant".to_string(),
        ));
    }

    if wishlist
        .items
        .iter()
        .any(|existing| existing.menu_item_id == item.id)
    {
        return Err(AppError::conflict("item is already on the wishlist"));
    }

    wishlist.items.push(WishlistItem {
        menu_item_id: item.id,
        name: item.name,
        price: item.price,
        quantity,
    });

    Ok(ok(wishlist.clone()))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((id, menu_item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<Wishlist>>, AppError> {
    let mut wishlist = state
        .wishlists
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("wishlist {id} not found")))?;

    if wishlist.owner_id != ctx.account_id {
        return Err(AppError::Forbidden("not your wishlist".to_string()));
    }

    let before = wishlist.items.len();
    wishlist
        .items
        .retain(|item| item.menu_item_id != menu_item_id);
    if wishlist.items.len() == before {
        return Err(AppError::NotFound(
            "item is not on the wishlist".to_string(),
        ));
    }

    Ok(ok(wishlist.clone()))
}
