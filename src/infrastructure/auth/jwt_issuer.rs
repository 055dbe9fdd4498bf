use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::application::ports::{TokenClaims, TokenError, TokenIssuer, TokenKind, TokenPair};
use crate::domain::UserId;

/// HS256 token issuer. `sub` is the user id as a string per the JWT spec;
/// the `type` claim distinguishes access from refresh tokens so one cannot
/// stand in for the other.
pub struct JwtTokenIssuer {
    secret: SecretString,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    #[serde(rename = "type")]
    token_type: String,
    exp: i64,
    iat: i64,
}

impl JwtTokenIssuer {
    pub fn new(secret: SecretString, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret,
            access_ttl,
            refresh_ttl,
        }
    }

    fn issue(
        &self,
        user_id: UserId,
        username: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.as_uuid().to_string(),
            username: username.to_string(),
            token_type: kind.as_str().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue_pair(&self, user_id: UserId, username: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, username, TokenKind::Access, self.access_ttl)?,
            refresh_token: self.issue(user_id, username, TokenKind::Refresh, self.refresh_ttl)?,
        })
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;

        let user_id = data
            .claims
            .sub
            .parse::<uuid::Uuid>()
            .map(UserId::from_uuid)
            .map_err(|_| TokenError::Invalid)?;

        let kind = match data.claims.token_type.as_str() {
            "access" => TokenKind::Access,
            "refresh" => TokenKind::Refresh,
            _ => return Err(TokenError::Invalid),
        };

        let expires_at = DateTime::<Utc>::from_timestamp(data.claims.exp, 0)
            .ok_or(TokenError::Invalid)?;

        Ok(TokenClaims {
            user_id,
            username: data.claims.username,
            kind,
            expires_at,
        })
    }
}
