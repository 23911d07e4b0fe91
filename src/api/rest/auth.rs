use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::{Envelope, created, ok};
use crate::auth::verify::{CredentialVerifier, ExternalIdentity, LocalPassword, hash_password};
use crate::error::AppError;
use crate::models::account::{
    Account, AccountView, Credential, GeoPoint, RatingStats, RestaurantProfile, RiderProfile, Role,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/oauth", post(oauth_login))
}

#[derive(Deserialize)]
pub struct RestaurantPayload {
    pub kitchen_name: String,
    pub address: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct RiderPayload {
    pub vehicle: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password: Option<String>,
    pub provider: Option<String>,
    pub subject: Option<String>,
    pub restaurant: Option<RestaurantPayload>,
    pub rider: Option<RiderPayload>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub account: AccountView,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<SessionResponse>>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    // Admin accounts are provisioned out of band, never self-registered.
    if payload.role == Role::Admin {
        return Err(AppError::Forbidden(
            "admin accounts cannot be registered here".to_string(),
        ));
    }

    let credential = match (&payload.password, &payload.provider, &payload.subject) {
        (Some(password), None, None) => {
            if password.len() < 8 {
                return Err(AppError::Validation(
                    "password must be at least 8 characters".to_string(),
                ));
            }
            Credential::Password {
                hash: hash_password(password)?,
            }
        }
        (None, Some(provider), Some(subject)) => Credential::External {
            provider: provider.clone(),
            subject: subject.clone(),
        },
        _ => {
            return Err(AppError::Validation(
                "provide either a password or an external provider and subject".to_string(),
            ));
        }
    };

    // The role-specific profile must match the role, both ways.
    let restaurant = match (payload.role, payload.restaurant) {
        (Role::Restaurant, Some(profile)) => Some(RestaurantProfile {
            kitchen_name: profile.kitchen_name,
            is_open: true,
            address: profile.address,
            location: profile.location,
            rating: RatingStats::zero(),
        }),
        (Role::Restaurant, None) => {
            return Err(AppError::Validation(
                "restaurant accounts require a restaurant profile".to_string(),
            ));
        }
        (_, Some(_)) => {
            return Err(AppError::Validation(
                "only restaurant accounts carry a restaurant profile".to_string(),
            ));
        }
        (_, None) => None,
    };

    let rider = match (payload.role, payload.rider) {
        (Role::Rider, Some(profile)) => Some(RiderProfile {
            vehicle: profile.vehicle,
            is_available: true,
            location: None,
            earnings: 0.0,
            rating: RatingStats::rider_default(),
        }),
        (Role::Rider, None) => {
            return Err(AppError::Validation(
                "rider accounts require a rider profile".to_string(),
            ));
        }
        (_, Some(_)) => {
            return Err(AppError::Validation(
                "only rider accounts carry a rider profile".to_string(),
            ));
        }
        (_, None) => None,
    };

    let account = Account {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email: email.clone(),
        phone: payload.phone,
        credential,
        role: payload.role,
        restaurant,
        rider,
        cart: Vec::new(),
        created_at: Utc::now(),
    };

    // Issued first: nothing fallible may run between the email
    // reservation below and the account insert.
    let token = state.tokens.issue(&account)?;

    // Reserve the email through the index entry so two concurrent
    // registrations cannot both claim it.
    match state.emails.entry(email) {
        Entry::Occupied(_) => {
            return Err(AppError::conflict("email already registered"));
        }
        Entry::Vacant(slot) => {
            slot.insert(account.id);
        }
    }

    let view = AccountView::from(&account);
    state.accounts.insert(account.id, account);

    tracing::info!(account_id = %view.id, role = ?view.role, "account registered");

    Ok(created(SessionResponse {
        token,
        account: view,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Envelope<SessionResponse>>, AppError> {
    let email = payload.email.trim().to_lowercase();
    let account_id = state
        .emails
        .get(&email)
        .map(|entry| *entry.value())
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

    let account = state
        .accounts
        .get(&account_id)
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

    let verifier = LocalPassword {
        password: &payload.password,
    };
    verifier.verify(&account.credential)?;

    let token = state.tokens.issue(&account)?;
    Ok(ok(SessionResponse {
        token,
        account: AccountView::from(&*account),
    }))
}

#[derive(Deserialize)]
pub struct OauthLoginRequest {
    pub provider: String,
    pub subject: String,
}

/// Login for accounts registered through an external identity provider.
/// The provider has already authenticated the caller upstream; here we
/// only match the stored identity.
async fn oauth_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OauthLoginRequest>,
) -> Result<Json<Envelope<SessionResponse>>, AppError> {
    let account = state
        .accounts
        .iter()
        .find(|entry| {
            matches!(
                &entry.credential,
                Credential::External { provider, subject }
                    if *provider == payload.provider && *subject == payload.subject
            )
        })
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

    let verifier = ExternalIdentity {
        provider: &payload.provider,
        subject: &payload.subject,
    };
    verifier.verify(&account.credential)?;

    let token = state.tokens.issue(&account)?;
    Ok(ok(SessionResponse {
        token,
        account: AccountView::from(&account),
    }))
}
