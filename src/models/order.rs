use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    RiderAssigned,
    Preparing,
    Ready,
    PickedUp,
    OnTheWay,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The next status along the fixed forward sequence. `None` for the
    /// terminal states; `Cancelled` is reached out of band, never as a
    /// successor.
    pub fn successor(self) -> Option<OrderStatus> {
        use OrderStatus::*;
        match self {
            Pending => Some(Accepted),
            Accepted => Some(RiderAssigned),
            RiderAssigned => Some(Preparing),
            Preparing => Some(Ready),
            Ready => Some(PickedUp),
            PickedUp => Some(OnTheWay),
            OnTheWay => Some(Delivered),
            Delivered | Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// True until the rider has picked the order up; cancellation by
    /// customer or restaurant is only allowed in this window.
    pub fn is_before_pickup(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Accepted
                | OrderStatus::RiderAssigned
                | OrderStatus::Preparing
                | OrderStatus::Ready
        )
    }

    /// Statuses that count towards a rider's active workload.
    pub fn is_rider_active(self) -> bool {
        matches!(
            self,
            OrderStatus::Accepted
                | OrderStatus::RiderAssigned
                | OrderStatus::Preparing
                | OrderStatus::Ready
                | OrderStatus::PickedUp
                | OrderStatus::OnTheWay
        )
    }
}

/// Snapshot of a menu item at order time. Later price or name edits on
/// the catalog never change what the customer agreed to pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRating {
    pub value: u8,
    pub review: Option<String>,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub items: Vec<LineItem>,
    pub total: f64,
    pub status: OrderStatus,
    pub restaurant_rating: Option<OrderRating>,
    pub rider_rating: Option<OrderRating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn forward_sequence_is_fixed() {
        let mut status = Pending;
        let mut seen = vec![status];
        while let Some(next) = status.successor() {
            status = next;
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                Pending,
                Accepted,
                RiderAssigned,
                Preparing,
                Ready,
                PickedUp,
                OnTheWay,
                Delivered
            ]
        );
    }

    #[test]
    fn terminal_states_have_no_successor() {
        assert!(Delivered.successor().is_none());
        assert!(Cancelled.successor().is_none());
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn pickup_window_closes_at_picked_up() {
        assert!(Ready.is_before_pickup());
        assert!(!PickedUp.is_before_pickup());
        assert!(!Delivered.is_before_pickup());
    }
}
