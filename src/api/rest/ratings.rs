use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::{Envelope, created};
use crate::auth::AuthContext;
use crate::engine::ratings::{RatingSubmission, submit_order_rating};
use crate::error::AppError;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/rating/order/:order_id", post(rate_order))
}

#[derive(Deserialize)]
pub struct RateOrderRequest {
    pub restaurant_rating: Option<u8>,
    pub restaurant_review: Option<String>,
    pub rider_rating: Option<u8>,
    pub rider_review: Option<String>,
}

async fn rate_order(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<RateOrderRequest>,
) -> Result<(StatusCode, Json<Envelope<Order>>), AppError> {
    let order = submit_order_rating(
        &state,
        &ctx,
        order_id,
        RatingSubmission {
            restaurant_rating: payload.restaurant_rating,
            restaurant_review: payload.restaurant_review,
            rider_rating: payload.rider_rating,
            rider_review: payload.rider_review,
        },
    )?;

    Ok(created(order))
}
