use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Saved item snapshot; price and name are copied at add time, like an
/// order line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

/// A named, user-owned list scoped to a single restaurant. Every item
/// added must belong to that restaurant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub items: Vec<WishlistItem>,
    pub created_at: DateTime<Utc>,
}
