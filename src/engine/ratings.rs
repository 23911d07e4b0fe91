use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::account::{RatingStats, Role};
use crate::models::order::{Order, OrderRating, OrderStatus};
use crate::state::AppState;

#[derive(Debug, Default)]
pub struct RatingSubmission {
    pub restaurant_rating: Option<u8>,
    pub restaurant_review: Option<String>,
    pub rider_rating: Option<u8>,
    pub rider_review: Option<String>,
}

pub fn round_half_up_1dp(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Folds one rating value into a running average kept to one decimal
/// place.
pub fn fold_rating(stats: &mut RatingStats, value: u8) {
    let total = stats.average * stats.count as f64 + f64::from(value);
    stats.count += 1;
    stats.average = round_half_up_1dp(total / stats.count as f64);
}

/// Records the customer's rating on a delivered order and folds it into
/// the restaurant's and rider's aggregates.
///
/// The per-target rating sub-document on the order doubles as the
/// idempotency key: it is written under the order's map guard, and a
/// second submission for an already-rated target fails with a conflict,
/// so each aggregate is updated at most once per order.
pub fn submit_order_rating(
    state: &AppState,
    actor: &AuthContext,
    order_id: Uuid,
    submission: RatingSubmission,
) -> Result<Order, AppError> {
    actor.require_role(Role::Customer)?;

    if submission.restaurant_rating.is_none() && submission.rider_rating.is_none() {
        return Err(AppError::Validation(
            "at least one rating value is required".to_string(),
        ));
    }
    // A review never stands alone; it rides on its rating value.
    if submission.restaurant_review.is_some() && submission.restaurant_rating.is_none() {
        return Err(AppError::Validation(
            "a restaurant review requires a restaurant rating".to_string(),
        ));
    }
    if submission.rider_review.is_some() && submission.rider_rating.is_none() {
        return Err(AppError::Validation(
            "a rider review requires a rider rating".to_string(),
        ));
    }
    for value in [submission.restaurant_rating, submission.rider_rating]
        .into_iter()
        .flatten()
    {
        if !(1..=5).contains(&value) {
            return Err(AppError::Validation(
                "rating values must be between 1 and 5".to_string(),
            ));
        }
    }

    let snapshot = {
        let mut entry = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        let order = entry.value_mut();

        if order.customer_id != actor.account_id {
            return Err(AppError::Forbidden(
                "only the ordering customer may rate".to_string(),
            ));
        }
        if order.status != OrderStatus::Delivered {
            return Err(AppError::Validation(
                "order has not been delivered".to_string(),
            ));
        }
        if submission.restaurant_rating.is_some() && order.restaurant_rating.is_some() {
            return Err(AppError::conflict("restaurant already rated for this order"));
        }
        if submission.rider_rating.is_some() {
            if order.rider_id.is_none() {
                return Err(AppError::Validation(
                    "order has no rider to rate".to_string(),
                ));
            }
            if order.rider_rating.is_some() {
                return Err(AppError::conflict("rider already rated for this order"));
            }
        }

        let now = Utc::now();
        if let Some(value) = submission.restaurant_rating {
            order.restaurant_rating = Some(OrderRating {
                value,
                review: submission.restaurant_review.clone(),
                rated_at: now,
            });
        }
        if let Some(value) = submission.rider_rating {
            order.rider_rating = Some(OrderRating {
                value,
                review: submission.rider_review.clone(),
                rated_at: now,
            });
        }

        order.clone()
    };

    if let Some(value) = submission.restaurant_rating {
        if let Some(mut restaurant) = state.accounts.get_mut(&snapshot.restaurant_id) {
            if let Some(profile) = restaurant.restaurant.as_mut() {
                fold_rating(&mut profile.rating, value);
            }
        }
        state
            .metrics
            .ratings_submitted_total
            .with_label_values(&["restaurant"])
            .inc();
    }

    if let (Some(value), Some(rider_id)) = (submission.rider_rating, snapshot.rider_id) {
        if let Some(mut rider) = state.accounts.get_mut(&rider_id) {
            if let Some(profile) = rider.rider.as_mut() {
                fold_rating(&mut profile.rating, value);
            }
        }
        state
            .metrics
            .ratings_submitted_total
            .with_label_values(&["rider"])
            .inc();
    }

    tracing::info!(order_id = %order_id, "order rated");
    Ok(snapshot)
}
