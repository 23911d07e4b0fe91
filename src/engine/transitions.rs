use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::account::Role;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Applies one step of the order state machine on behalf of `actor`.
///
/// The forward path is the fixed sequence on `OrderStatus::successor`;
/// who may take each step depends on the target:
/// restaurant: pending→accepted, rider_assigned→preparing,
/// preparing→ready; restaurant or admin: accepted→rider_assigned
/// (binding an available rider); the assigned rider: ready→picked_up,
/// picked_up→on_the_way, on_the_way→delivered. Customer and restaurant
/// may cancel before pickup; an admin may cancel any non-terminal
/// order.
pub fn apply_transition(
    state: &AppState,
    actor: &AuthContext,
    order_id: Uuid,
    target: OrderStatus,
    rider_id: Option<Uuid>,
) -> Result<Order, AppError> {
    let outcome = transition_inner(state, actor, order_id, target, rider_id);

    let label = if outcome.is_ok() { "success" } else { "rejected" };
    state
        .metrics
        .order_transitions_total
        .with_label_values(&[label])
        .inc();

    outcome
}

fn transition_inner(
    state: &AppState,
    actor: &AuthContext,
    order_id: Uuid,
    target: OrderStatus,
    rider_id: Option<Uuid>,
) -> Result<Order, AppError> {
    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();
    let current = order.status;

    if current.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "order is already {current:?}"
        )));
    }

    if target == OrderStatus::Cancelled {
        authorize_cancellation(actor, order, current)?;
    } else {
        if current.successor() != Some(target) {
            return Err(AppError::InvalidTransition(format!(
                "cannot move from {current:?} to {target:?}"
            )));
        }
        authorize_advance(state, actor, order, target, rider_id)?;
    }

    order.status = target;
    order.updated_at = Utc::now();
    let snapshot = order.clone();
    drop(entry);

    if target.is_terminal() {
        settle_terminal(state, &snapshot);
    }

    tracing::info!(
        order_id = %order_id,
        from = ?current,
        to = ?target,
        actor = %actor.account_id,
        "order status changed"
    );

    Ok(snapshot)
}

fn authorize_cancellation(
    actor: &AuthContext,
    order: &Order,
    current: OrderStatus,
) -> Result<(), AppError> {
    let is_party = actor.is_admin()
        || (actor.role == Role::Customer && order.customer_id == actor.account_id)
        || (actor.role == Role::Restaurant && order.restaurant_id == actor.account_id);

    if !is_party {
        return Err(AppError::Forbidden(
            "only the customer, the restaurant, or an admin may cancel".to_string(),
        ));
    }

    // Once the rider holds the food, only an admin can still pull the plug.
    if !actor.is_admin() && !current.is_before_pickup() {
        return Err(AppError::InvalidTransition(
            "order can no longer be cancelled".to_string(),
        ));
    }

    Ok(())
}

fn authorize_advance(
    state: &AppState,
    actor: &AuthContext,
    order: &mut Order,
    target: OrderStatus,
    rider_id: Option<Uuid>,
) -> Result<(), AppError> {
    match target {
        OrderStatus::Accepted | OrderStatus::Preparing | OrderStatus::Ready => {
            actor.require_role(Role::Restaurant)?;
            if order.restaurant_id != actor.account_id {
                return Err(AppError::Forbidden(
                    "not the restaurant for this order".to_string(),
                ));
            }
        }
        OrderStatus::RiderAssigned => {
            let may_assign = actor.is_admin()
                || (actor.role == Role::Restaurant && order.restaurant_id == actor.account_id);
            if !may_assign {
                return Err(AppError::Forbidden(
                    "only the restaurant or an admin may assign a rider".to_string(),
                ));
            }

            let rider_id = rider_id.ok_or_else(|| {
                AppError::Validation("rider_id is required to assign a rider".to_string())
            })?;
            bind_rider(state, order, rider_id)?;
        }
        OrderStatus::PickedUp | OrderStatus::OnTheWay | OrderStatus::Delivered => {
            actor.require_role(Role::Rider)?;
            if order.rider_id != Some(actor.account_id) {
                return Err(AppError::Forbidden(
                    "not the rider assigned to this order".to_string(),
                ));
            }
        }
        OrderStatus::Pending | OrderStatus::Cancelled => {
            // Neither is ever a forward successor.
            return Err(AppError::InvalidTransition(format!(
                "{target:?} is not a forward transition"
            )));
        }
    }

    Ok(())
}

fn bind_rider(state: &AppState, order: &mut Order, rider_id: Uuid) -> Result<(), AppError> {
    let rider = state
        .accounts
        .get(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

    let profile = match (&rider.role, &rider.rider) {
        (Role::Rider, Some(profile)) => profile,
        _ => {
            return Err(AppError::Validation(format!(
                "account {rider_id} is not a rider"
            )));
        }
    };

    if !profile.is_available {
        return Err(AppError::Validation(format!(
            "rider {rider_id} is not available"
        )));
    }

    order.rider_id = Some(rider_id);
    Ok(())
}

/// Terminal-state bookkeeping on the rider account. Delivery credits the
/// configured fee; freeing the availability flag is opt-in because the
/// original flow leaves riders to be freed by the dispatcher.
fn settle_terminal(state: &AppState, order: &Order) {
    let Some(rider_id) = order.rider_id else {
        return;
    };
    let Some(mut rider) = state.accounts.get_mut(&rider_id) else {
        return;
    };
    let Some(profile) = rider.rider.as_mut() else {
        return;
    };

    if order.status == OrderStatus::Delivered {
        profile.earnings += state.config.delivery_fee;
    }

    if state.config.free_rider_on_delivery {
        profile.is_available = true;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::apply_transition;
    use crate::auth::AuthContext;
    use crate::config::Config;
    use crate::engine::orders::{NewOrderItem, create_order};
    use crate::error::AppError;
    use crate::models::account::{
        Account, Credential, GeoPoint, RatingStats, RestaurantProfile, RiderProfile, Role,
    };
    use crate::models::menu::{Category, Cuisine, MenuItem};
    use crate::models::order::OrderStatus;
    use crate::state::AppState;

    fn test_config() -> Config {
        Config {
            http_port: 0,
            log_level: "info".to_string(),
            event_buffer_size: 16,
            jwt_secret: "unit-test-secret-key-0123456789abcdef".to_string(),
            token_ttl_minutes: 60,
            delivery_fee: 3.0,
            free_rider_on_delivery: false,
        }
    }

    fn account(role: Role) -> Account {
        let id = Uuid::new_v4();
        Account {
            id,
            name: format!("{role:?}"),
            email: format!("{id}@example.com"),
            phone: None,
            credential: Credential::Password {
                hash: "unused".to_string(),
            },
            role,
            restaurant: (role == Role::Restaurant).then(|| RestaurantProfile {
                kitchen_name: "Test Kitchen".to_string(),
                is_open: true,
                address: "1 Test Street".to_string(),
                location: GeoPoint { lat: 0.0, lng: 0.0 },
                rating: RatingStats::zero(),
            }),
            rider: (role == Role::Rider).then(|| RiderProfile {
                vehicle: "bike".to_string(),
                is_available: true,
                location: None,
                earnings: 0.0,
                rating: RatingStats::rider_default(),
            }),
            cart: Vec::new(),
            created_at: Utc::now(),
        }
    }

    struct Fixture {
        state: AppState,
        customer: AuthContext,
        restaurant: AuthContext,
        rider: AuthContext,
        order_id: Uuid,
    }

    fn fixture() -> Fixture {
        let state = AppState::new(test_config());

        let customer = account(Role::Customer);
        let restaurant = account(Role::Restaurant);
        let rider = account(Role::Rider);

        let item = MenuItem {
            id: Uuid::new_v4(),
            restaurant_id: restaurant.id,
            name: "Dal Makhani".to_string(),
            description: "slow-cooked lentils".to_string(),
            price: 11.0,
            category: Category::Main,
            cuisine: Cuisine::Indian,
            is_available: true,
            location: GeoPoint { lat: 0.0, lng: 0.0 },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let customer_ctx = AuthContext {
            account_id: customer.id,
            role: Role::Customer,
        };
        let restaurant_ctx = AuthContext {
            account_id: restaurant.id,
            role: Role::Restaurant,
        };
        let rider_ctx = AuthContext {
            account_id: rider.id,
            role: Role::Rider,
        };

        state.accounts.insert(customer.id, customer);
        state.accounts.insert(restaurant.id, restaurant.clone());
        state.accounts.insert(rider.id, rider);
        state.menu_items.insert(item.id, item.clone());

        let order = create_order(
            &state,
            &customer_ctx,
            restaurant.id,
            &[NewOrderItem {
                menu_item_id: item.id,
                quantity: 2,
            }],
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!((order.total - 22.0).abs() < 1e-9);

        Fixture {
            state,
            customer: customer_ctx,
            restaurant: restaurant_ctx,
            rider: rider_ctx,
            order_id: order.id,
        }
    }

    fn drive_to_delivered(fx: &Fixture) {
        use OrderStatus::*;
        let rider_id = fx.rider.account_id;
        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Accepted, None).unwrap();
        apply_transition(
            &fx.state,
            &fx.restaurant,
            fx.order_id,
            RiderAssigned,
            Some(rider_id),
        )
        .unwrap();
        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Preparing, None).unwrap();
        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Ready, None).unwrap();
        apply_transition(&fx.state, &fx.rider, fx.order_id, PickedUp, None).unwrap();
        apply_transition(&fx.state, &fx.rider, fx.order_id, OnTheWay, None).unwrap();
        apply_transition(&fx.state, &fx.rider, fx.order_id, Delivered, None).unwrap();
    }

    #[test]
    fn full_forward_sequence_with_correct_actors_succeeds() {
        let fx = fixture();
        drive_to_delivered(&fx);

        let order = fx.state.orders.get(&fx.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.rider_id, Some(fx.rider.account_id));
    }

    #[test]
    fn skipping_a_status_is_rejected() {
        let fx = fixture();
        let err = apply_transition(
            &fx.state,
            &fx.restaurant,
            fx.order_id,
            OrderStatus::Preparing,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn customer_may_not_accept_an_order() {
        let fx = fixture();
        let err = apply_transition(
            &fx.state,
            &fx.customer,
            fx.order_id,
            OrderStatus::Accepted,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn unavailable_rider_cannot_be_assigned() {
        let fx = fixture();
        apply_transition(
            &fx.state,
            &fx.restaurant,
            fx.order_id,
            OrderStatus::Accepted,
            None,
        )
        .unwrap();

        fx.state
            .accounts
            .get_mut(&fx.rider.account_id)
            .unwrap()
            .rider
            .as_mut()
            .unwrap()
            .is_available = false;

        let err = apply_transition(
            &fx.state,
            &fx.restaurant,
            fx.order_id,
            OrderStatus::RiderAssigned,
            Some(fx.rider.account_id),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let order = fx.state.orders.get(&fx.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.rider_id, None);
    }

    #[test]
    fn customer_may_cancel_before_pickup_only() {
        let fx = fixture();
        use OrderStatus::*;

        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Accepted, None).unwrap();
        apply_transition(
            &fx.state,
            &fx.restaurant,
            fx.order_id,
            RiderAssigned,
            Some(fx.rider.account_id),
        )
        .unwrap();
        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Preparing, None).unwrap();
        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Ready, None).unwrap();
        apply_transition(&fx.state, &fx.rider, fx.order_id, PickedUp, None).unwrap();

        let err =
            apply_transition(&fx.state, &fx.customer, fx.order_id, Cancelled, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn terminal_orders_are_immutable() {
        let fx = fixture();
        drive_to_delivered(&fx);

        let err = apply_transition(
            &fx.state,
            &fx.customer,
            fx.order_id,
            OrderStatus::Cancelled,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn delivery_credits_rider_and_leaves_availability_alone() {
        let fx = fixture();
        drive_to_delivered(&fx);

        let rider = fx.state.accounts.get(&fx.rider.account_id).unwrap();
        let profile = rider.rider.as_ref().unwrap();
        assert!((profile.earnings - 3.0).abs() < 1e-9);
        // free_rider_on_delivery is off in the test config
        assert!(profile.is_available);
    }

    #[test]
    fn free_rider_on_delivery_flips_the_flag_back() {
        let mut fx = fixture();
        fx.state.config.free_rider_on_delivery = true;

        use OrderStatus::*;
        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Accepted, None).unwrap();
        apply_transition(
            &fx.state,
            &fx.restaurant,
            fx.order_id,
            RiderAssigned,
            Some(fx.rider.account_id),
        )
        .unwrap();

        // Rider goes off-shift mid-delivery.
        fx.state
            .accounts
            .get_mut(&fx.rider.account_id)
            .unwrap()
            .rider
            .as_mut()
            .unwrap()
            .is_available = false;

        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Preparing, None).unwrap();
        apply_transition(&fx.state, &fx.restaurant, fx.order_id, Ready, None).unwrap();
        apply_transition(&fx.state, &fx.rider, fx.order_id, PickedUp, None).unwrap();
        apply_transition(&fx.state, &fx.rider, fx.order_id, OnTheWay, None).unwrap();
        apply_transition(&fx.state, &fx.rider, fx.order_id, Delivered, None).unwrap();

        let rider = fx.state.accounts.get(&fx.rider.account_id).unwrap();
        assert!(rider.rider.as_ref().unwrap().is_available);
    }

    #[test]
    fn empty_item_list_creates_nothing() {
        let fx = fixture();
        let restaurant_id = fx.restaurant.account_id;
        let before = fx.state.orders.len();

        let err = create_order(&fx.state, &fx.customer, restaurant_id, &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(fx.state.orders.len(), before);
    }
}
