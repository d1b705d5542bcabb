use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::JwtConfig;

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token is malformed or its signature does not verify")]
    Malformed,
    #[error("token expired")]
    Expired,
}

/// Stateless token service: signs and verifies HS256 session tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDuration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: TimeDuration::minutes(config.ttl_minutes),
        }
    }

    /// Returns `(expires_in_seconds, token)`.
    pub fn issue(&self, user_id: &str) -> anyhow::Result<(i64, String)> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, user_id: &str, now: OffsetDateTime) -> anyhow::Result<(i64, String)> {
        let exp = now + self.ttl;
        let claims = Claims {
            user_id: user_id.to_owned(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(((exp - now).whole_seconds(), token))
    }

    /// Verifies signature and expiry. Does not look the user up.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is compared below against `now`, without leeway
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AuthError::Malformed
        })?;
        if (data.claims.exp as i64) < now.unix_timestamp() {
            debug!(user_id = %data.claims.user_id, "jwt expired");
            return Err(AuthError::Expired);
        }
        Ok(data.claims)
    }
}
