use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{config::JwtConfig, error::ApiError, state::AppState};

/// JWT payload: the subject is the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token could not be decoded")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Encode(e) => ApiError::Internal(e.into()),
            _ => ApiError::Unauthorized(crate::error::BAD_CREDENTIALS.into()),
        }
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            access_ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    /// Signs an access token for `subject` using the configured lifetime.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, OffsetDateTime::now_utc(), self.access_ttl)
    }

    fn issue_at(
        &self,
        subject: &str,
        issued_at: OffsetDateTime,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_owned(),
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + ttl).unix_timestamp(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(TokenError::Encode)?;
        debug!(sub = %subject, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Checks signature and expiry, returning the subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}
