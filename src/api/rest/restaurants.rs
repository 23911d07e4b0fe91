use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::{get, patch};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::{Envelope, ok};
use crate::auth::AuthContext;
use crate::engine::orders::open_restaurant_orders;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::account::{GeoPoint, RatingStats, Role};
use crate::models::menu::MenuItem;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/restaurant/all", get(list_restaurants))
        .route("/api/restaurant/kitchen", patch(set_kitchen))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_distance: Option<f64>,
}

#[derive(Serialize)]
pub struct RestaurantListing {
    pub id: Uuid,
    pub kitchen_name: String,
    pub is_open: bool,
    pub address: String,
    pub location: GeoPoint,
    pub rating: RatingStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub menu: Vec<MenuItem>,
}

/// Public listing of every restaurant with its menu. With `latitude`,
/// `longitude` and `max_distance` (km) present, only restaurants within
/// that great-circle radius are returned, each annotated with its
/// distance.
async fn list_restaurants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Vec<RestaurantListing>>>, AppError> {
    let origin = match (query.latitude, query.longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "latitude and longitude must be supplied together".to_string(),
            ));
        }
    };

    let mut listings = Vec::new();

    for entry in state.accounts.iter() {
        let Some(profile) = &entry.restaurant else {
            continue;
        };

        let distance_km = origin.map(|from| haversine_km(&from, &profile.location));
        if let (Some(distance), Some(max)) = (distance_km, query.max_distance) {
            if distance > max {
                continue;
            }
        }

        let menu: Vec<MenuItem> = state
            .menu_items
            .iter()
            .filter(|item| item.restaurant_id == entry.id)
            .map(|item| item.value().clone())
            .collect();

        listings.push(RestaurantListing {
            id: entry.id,
            kitchen_name: profile.kitchen_name.clone(),
            is_open: profile.is_open,
            address: profile.address.clone(),
            location: profile.location,
            rating: profile.rating,
            distance_km,
            menu,
        });
    }

    listings.sort_by(|a, b| {
        a.distance_km
            .unwrap_or(f64::MAX)
            .total_cmp(&b.distance_km.unwrap_or(f64::MAX))
    });

    Ok(ok(listings))
}

#[derive(Deserialize)]
pub struct SetKitchenRequest {
    pub is_open: bool,
}

#[derive(Serialize)]
pub struct KitchenResponse {
    pub is_open: bool,
}

/// Opens or closes the kitchen. Closing is refused while the restaurant
/// still has non-terminal orders; the count comes back in the error so
/// the caller can retry once they are done.
async fn set_kitchen(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(payload): Json<SetKitchenRequest>,
) -> Result<Json<Envelope<KitchenResponse>>, AppError> {
    ctx.require_role(Role::Restaurant)?;

    if !payload.is_open {
        let active = open_restaurant_orders(&state, ctx.account_id);
        if active > 0 {
            return Err(AppError::Conflict {
                message: "kitchen cannot close with active orders".to_string(),
                active_orders: Some(active),
            });
        }
    }

    let mut account = state
        .accounts
        .get_mut(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("restaurant account not found".to_string()))?;
    let profile = account
        .restaurant
        .as_mut()
        .ok_or_else(|| AppError::Internal("restaurant account has no profile".to_string()))?;

    profile.is_open = payload.is_open;
    tracing::info!(restaurant_id = %ctx.account_id, is_open = payload.is_open, "kitchen flag changed");

    Ok(ok(KitchenResponse {
        is_open: payload.is_open,
    }))
}
