//! HS256 bearer tokens carrying `{sub, role, name, iat, exp}`.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use modkit::security::{AuthError, SecurityCtx, TokenVerifier};
use modkit::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::model::User;
use crate::domain::ports::TokenIssuer;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    name: String,
    iat: i64,
    exp: i64,
}

pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    fn encode(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }
}

impl TokenIssuer for JwtCodec {
    fn issue(&self, user: &User) -> anyhow::Result<String> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.encode(&Claims {
            sub: user.id.to_string(),
            role: user.role,
            name: user.first_name.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        })
    }
}

impl TokenVerifier for JwtCodec {
    fn verify(&self, token: &str) -> Result<SecurityCtx, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(SecurityCtx {
            user_id,
            role: data.claims.role,
            name: data.claims.name,
        })
    }
}
