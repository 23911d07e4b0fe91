use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Flat amount credited to the rider on each delivered order.
    pub delivery_fee: f64,
    /// Whether a terminal order automatically flips its rider back to
    /// available. Off by default: dispatchers free riders manually.
    pub free_rider_on_delivery: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            AppError::Internal("JWT_SECRET must be set (at least 32 bytes)".to_string())
        })?;
        if jwt_secret.len() < 32 {
            return Err(AppError::Internal(
                "JWT_SECRET must be at least 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            jwt_secret,
            token_ttl_minutes: parse_or_default("TOKEN_TTL_MINUTES", 1440)?,
            delivery_fee: parse_or_default("DELIVERY_FEE", 3.0)?,
            free_rider_on_delivery: parse_or_default("FREE_RIDER_ON_DELIVERY", false)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
