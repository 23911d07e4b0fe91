use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, patch};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::rest::{Envelope, ok};
use crate::auth::AuthContext;
use crate::engine::orders::rider_active_orders;
use crate::error::AppError;
use crate::models::account::{GeoPoint, RatingStats, RiderLocation, Role};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/rider/availability",
            get(get_availability).patch(set_availability),
        )
        .route("/api/rider/location", patch(update_location))
        .route("/api/rider/stats", get(stats))
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub is_available: bool,
}

async fn get_availability(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<Json<Envelope<AvailabilityResponse>>, AppError> {
    ctx.require_role(Role::Rider)?;

    let account = state
        .accounts
        .get(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("rider account not found".to_string()))?;
    let profile = account
        .rider
        .as_ref()
        .ok_or_else(|| AppError::Internal("rider account has no profile".to_string()))?;

    Ok(ok(AvailabilityResponse {
        is_available: profile.is_available,
    }))
}

#[derive(Deserialize)]
pub struct SetAvailabilityRequest {
    pub is_available: bool,
}

/// Plain flag toggle; deliberately unguarded, a rider may go
/// unavailable while still holding an active order.
async fn set_availability(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(payload): Json<SetAvailabilityRequest>,
) -> Result<Json<Envelope<AvailabilityResponse>>, AppError> {
    ctx.require_role(Role::Rider)?;

    let mut account = state
        .accounts
        .get_mut(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("rider account not found".to_string()))?;
    let profile = account
        .rider
        .as_mut()
        .ok_or_else(|| AppError::Internal("rider account has no profile".to_string()))?;

    profile.is_available = payload.is_available;

    Ok(ok(AvailabilityResponse {
        is_available: payload.is_available,
    }))
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

/// Unconditional overwrite of the last-known location; no staleness or
/// bounds checks.
async fn update_location(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Envelope<RiderLocation>>, AppError> {
    ctx.require_role(Role::Rider)?;

    let location = RiderLocation {
        lat: payload.location.lat,
        lng: payload.location.lng,
        updated_at: Utc::now(),
    };

    let mut account = state
        .accounts
        .get_mut(&ctx.account_id)
        .ok_or_else(|| AppError::NotFound("rider account not found".to_string()))?;
    let profile = account
        .rider
        .as_mut()
        .ok_or_else(|| AppError::Internal("rider account has no profile".to_string()))?;

    profile.location = Some(location.clone());

    Ok(ok(location))
}

#[derive(Serialize)]
pub struct RiderStats {
    pub active_orders: usize,
    pub earnings: f64,
    pub rating: RatingStats,
}

async fn stats(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<Json<Envelope<RiderStats>>, AppError> {
    ctx.require_role(Role::Rider)?;

    let (earnings, rating) = {
        let account = state
            .accounts
            .get(&ctx.account_id)
            .ok_or_else(|| AppError::NotFound("rider account not found".to_string()))?;
        let profile = account
            .rider
            .as_ref()
            .ok_or_else(|| AppError::Internal("rider account has no profile".to_string()))?;
        (profile.earnings, profile.rating)
    };

    Ok(ok(RiderStats {
        active_orders: rider_active_orders(&state, ctx.account_id),
        earnings,
        rating,
    }))
}
