use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Rider,
    Restaurant,
    Admin,
}

/// How an account proves who it is. Exactly one variant per account;
/// external identities never carry a password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    Password { hash: String },
    External { provider: String, subject: String },
}

/// Running average kept to one decimal place, recomputed incrementally
/// on every rating submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingStats {
    pub average: f64,
    pub count: u64,
}

impl RatingStats {
    pub fn zero() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }

    /// Riders start from a neutral 2.5 until their first real rating.
    pub fn rider_default() -> Self {
        Self {
            average: 2.5,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantProfile {
    pub kitchen_name: String,
    pub is_open: bool,
    pub address: String,
    pub location: GeoPoint,
    pub rating: RatingStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderLocation {
    pub lat: f64,
    pub lng: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderProfile {
    pub vehicle: String,
    pub is_available: bool,
    pub location: Option<RiderLocation>,
    pub earnings: f64,
    pub rating: RatingStats,
}

/// A line in the customer's staging cart. All entries must point at the
/// same restaurant; the cart is cleared when an order is placed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEntry {
    pub menu_item_id: Uuid,
    pub restaurant_id: Uuid,
    pub quantity: u32,
}

/// Root document for every participant. The role-specific profile is
/// populated iff the role matches; the cart is only ever non-empty for
/// customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub credential: Credential,
    pub role: Role,
    pub restaurant: Option<RestaurantProfile>,
    pub rider: Option<RiderProfile>,
    pub cart: Vec<CartEntry>,
    pub created_at: DateTime<Utc>,
}

/// Public projection of an account; credentials and cart never leave
/// the server through this.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<RestaurantProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rider: Option<RiderProfile>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role,
            restaurant: account.restaurant.clone(),
            rider: account.rider.clone(),
        }
    }
}
