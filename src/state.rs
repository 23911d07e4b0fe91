use dashmap::DashMap;
use uuid::Uuid;

use crate::auth::token::TokenService;
use crate::config::Config;
use crate::models::account::Account;
use crate::models::menu::MenuItem;
use crate::models::order::Order;
use crate::models::wishlist::Wishlist;
use crate::observability::metrics::Metrics;
use crate::realtime::Hub;

/// Shared document store plus the realtime hub. Every request works
/// directly against these maps; writes are last-write-wins with no
/// cross-document transactions.
pub struct AppState {
    pub accounts: DashMap<Uuid, Account>,
    /// Unique-email index into `accounts`.
    pub emails: DashMap<String, Uuid>,
    pub menu_items: DashMap<Uuid, MenuItem>,
    pub orders: DashMap<Uuid, Order>,
    pub wishlists: DashMap<Uuid, Wishlist>,
    pub hub: Hub,
    pub tokens: TokenService,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            accounts: DashMap::new(),
            emails: DashMap::new(),
            menu_items: DashMap::new(),
            orders: DashMap::new(),
            wishlists: DashMap::new(),
            hub: Hub::new(config.event_buffer_size),
            tokens: TokenService::new(&config.jwt_secret, config.token_ttl_minutes),
            metrics: Metrics::new(),
            config,
        }
    }
}
