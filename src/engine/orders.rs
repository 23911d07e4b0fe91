use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::account::Role;
use crate::models::order::{LineItem, Order, OrderStatus};
use crate::state::AppState;

pub struct NewOrderItem {
    pub menu_item_id: Uuid,
    pub quantity: u32,
}

/// Creates a `pending` order from the given line items. Every item is
/// validated against the catalog and the total is computed from stored
/// prices; client-sent totals are never trusted.
pub fn create_order(
    state: &AppState,
    actor: &AuthContext,
    restaurant_id: Uuid,
    items: &[NewOrderItem],
) -> Result<Order, AppError> {
    actor.require_role(Role::Customer)?;

    if items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }

    let kitchen_open = {
        let restaurant = state
            .accounts
            .get(&restaurant_id)
            .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_id} not found")))?;
        let Some(profile) = &restaurant.restaurant else {
            return Err(AppError::NotFound(format!(
                "restaurant {restaurant_id} not found"
            )));
        };
        profile.is_open
    };

    if !kitchen_open {
        return Err(AppError::conflict("kitchen is closed"));
    }

    let mut line_items = Vec::with_capacity(items.len());
    let mut total = 0.0;

    for item in items {
        if item.quantity == 0 {
            return Err(AppError::Validation(
                "item quantity must be at least 1".to_string(),
            ));
        }

        let menu_item = state.menu_items.get(&item.menu_item_id).ok_or_else(|| {
            AppError::NotFound(format!("menu item {} not found", item.menu_item_id))
        })?;

        if menu_item.restaurant_id != restaurant_id {
            return Err(AppError::Validation(format!(
                "menu item {} does not belong to this restaurant",
                item.menu_item_id
            )));
        }

        if !menu_item.is_available {
            return Err(AppError::Validation(format!(
                "menu item {} is not available",
                menu_item.name
            )));
        }

        total += menu_item.price * f64::from(item.quantity);
        line_items.push(LineItem {
            menu_item_id: menu_item.id,
            name: menu_item.name.clone(),
            price: menu_item.price,
            quantity: item.quantity,
        });
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        customer_id: actor.account_id,
        restaurant_id,
        rider_id: None,
        items: line_items,
        total,
        status: OrderStatus::Pending,
        restaurant_rating: None,
        rider_rating: None,
        created_at: now,
        updated_at: now,
    };

    state.orders.insert(order.id, order.clone());
    state.metrics.orders_created_total.inc();

    // Checkout consumes the cart: entries for the ordered restaurant are
    // dropped from the customer's account.
    if let Some(mut customer) = state.accounts.get_mut(&actor.account_id) {
        customer
            .cart
            .retain(|entry| entry.restaurant_id != restaurant_id);
    }

    tracing::info!(
        order_id = %order.id,
        restaurant_id = %restaurant_id,
        total = order.total,
        "order created"
    );

    Ok(order)
}

/// Orders currently counting towards a rider's workload. Surfaced on the
/// rider dashboard only, never used for assignment throttling.
pub fn rider_active_orders(state: &AppState, rider_id: Uuid) -> usize {
    state
        .orders
        .iter()
        .filter(|entry| {
            entry.rider_id == Some(rider_id) && entry.status.is_rider_active()
        })
        .count()
}

/// Non-terminal orders a restaurant is still responsible for. A kitchen
/// may not close while this is non-zero.
pub fn open_restaurant_orders(state: &AppState, restaurant_id: Uuid) -> usize {
    state
        .orders
        .iter()
        .filter(|entry| entry.restaurant_id == restaurant_id && !entry.status.is_terminal())
        .count()
}
