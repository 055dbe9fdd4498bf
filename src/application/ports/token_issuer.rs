use chrono::{DateTime, Utc};

use crate::domain::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Validated claims decoded from a presented token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub username: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub trait TokenIssuer: Send + Sync {
    /// Issues a fresh access + refresh pair for the given identity.
    fn issue_pair(&self, user_id: UserId, username: &str) -> Result<TokenPair, TokenError>;

    /// Decodes and validates a token, including its expiry.
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    EncodingFailed(String),
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}
