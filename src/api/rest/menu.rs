use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::{Envelope, created, ok, ok_message};
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::account::{GeoPoint, Role};
use crate::models::menu::{Category, Cuisine, MenuItem};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/menu", post(create_item))
        .route("/api/menu/:id", patch(update_item).delete(delete_item))
        .route("/api/menu/restaurant/:id", get(list_for_restaurant))
}

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Category,
    pub cuisine: Cuisine,
    pub is_available: Option<bool>,
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Envelope<MenuItem>>), AppError> {
    ctx.require_role(Role::Restaurant)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if !payload.price.is_finite() || payload.price < 0.0 {
        return Err(AppError::Validation(
            "price must be zero or positive".to_string(),
        ));
    }

    // Denormalize the kitchen's coordinates onto the item for the
    // distance-filtered listing.
    let location: GeoPoint = {
        let account = state
            .accounts
            .get(&ctx.account_id)
            .ok_or_else(|| AppError::NotFound("restaurant account not found".to_string()))?;
        account
            .restaurant
            .as_ref()
            .map(|profile| profile.location)
            .ok_or_else(|| AppError::Internal("restaurant account has no profile".to_string()))?
    };

    let now = Utc::now();
    let item = MenuItem {
        id: Uuid::new_v4(),
        restaurant_id: ctx.account_id,
        name: payload.name.trim().to_string(),
        description: payload.description.unwrap_or_default(),
        price: payload.price,
        category: payload.category,
        cuisine: payload.cuisine,
        is_available: payload.is_available.unwrap_or(true),
        location,
        created_at: now,
        updated_at: now,
    };

    state.menu_items.insert(item.id, item.clone());
    Ok(created(item))
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<Category>,
    pub cuisine: Option<Cuisine>,
    pub is_available: Option<bool>,
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<Envelope<MenuItem>>, AppError> {
    ctx.require_role(Role::Restaurant)?;

    let mut item = state
        .menu_items
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("menu item {id} not found")))?;

    if item.restaurant_id != ctx.account_id {
        return Err(AppError::Forbidden(
            "menu item belongs to another restaurant".to_string(),
        ));
    }

    if let Some(price) = payload.price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::Validation(
                "price must be zero or positive".to_string(),
            ));
        }
        item.price = price;
    }
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        item.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        item.description = description;
    }
    if let Some(category) = payload.category {
        item.category = category;
    }
    if let Some(cuisine) = payload.cuisine {
        item.cuisine = cuisine;
    }
    if let Some(is_available) = payload.is_available {
        item.is_available = is_available;
    }
    item.updated_at = Utc::now();

    Ok(ok(item.clone()))
}

#[derive(Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Deleted>>, AppError> {
    ctx.require_role(Role::Restaurant)?;

    let owned = state
        .menu_items
        .get(&id)
        .map(|item| item.restaurant_id == ctx.account_id)
        .ok_or_else(|| AppError::NotFound(format!("menu item {id} not found")))?;

    if !owned {
        return Err(AppError::Forbidden(
            "menu item belongs to another restaurant".to_string(),
        ));
    }

    state.menu_items.remove(&id);
    Ok(ok_message("menu item deleted", Deleted { id }))
}

async fn list_for_restaurant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Envelope<Vec<MenuItem>>> {
    let items: Vec<MenuItem> = state
        .menu_items
        .iter()
        .filter(|item| item.restaurant_id == id)
        .map(|item| item.value().clone())
        .collect();

    ok(items)
}
