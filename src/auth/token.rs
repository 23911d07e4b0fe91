use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::account::{Account, Role};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Issues and verifies the bearer tokens carried on every authenticated
/// request. HS256 with a shared secret from config.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, account: &Account) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id,
            role: account.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| AppError::Internal(format!("token generation failed: {err}")))
    }

    pub fn verify(&self, token: &str) -> Result<AuthContext, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|err| AppError::Unauthorized(format!("invalid token: {err}")))?;

        Ok(AuthContext {
            account_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::TokenService;
    use crate::models::account::{Account, Credential, Role};

    fn account(role: Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
            credential: Credential::Password {
                hash: "unused".to_string(),
            },
            role,
            restaurant: None,
            rider: None,
            cart: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trips_into_auth_context() {
        let service = TokenService::new("a-secret-that-is-long-enough-for-tests", 60);
        let account = account(Role::Rider);

        let token = service.issue(&account).unwrap();
        let ctx = service.verify(&token).unwrap();

        assert_eq!(ctx.account_id, account.id);
        assert_eq!(ctx.role, Role::Rider);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = TokenService::new("a-secret-that-is-long-enough-for-tests", 60);
        assert!(service.verify("not.a.token").is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenService::new("the-first-secret-used-for-signing!", 60);
        let verifier = TokenService::new("a-different-secret-used-to-verify!", 60);

        let token = issuer.issue(&account(Role::Customer)).unwrap();
        assert!(verifier.verify(&token).is_err());
    }
}
