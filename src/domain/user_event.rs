use chrono::{DateTime, Utc};

use super::UserId;

/// Account lifecycle events handed to the event publisher. Each variant
/// carries everything a downstream mailer needs, including the one-time
/// token where applicable.
#[derive(Debug, Clone)]
pub enum UserEvent {
    Registered {
        user_id: UserId,
        email: String,
        username: String,
        verification_token: String,
        verification_token_expires_at: DateTime<Utc>,
    },
    Verified {
        user_id: UserId,
        email: String,
        username: String,
    },
    PasswordResetRequested {
        user_id: UserId,
        email: String,
        username: String,
        reset_token: String,
        reset_token_expires_at: DateTime<Utc>,
    },
}

impl UserEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered { .. } => "user.registered",
            UserEvent::Verified { .. } => "user.verified",
            UserEvent::PasswordResetRequested { .. } => "user.password_reset_requested",
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            UserEvent::Registered { user_id, .. }
            | UserEvent::Verified { user_id, .. }
            | UserEvent::PasswordResetRequested { user_id, .. } => *user_id,
        }
    }
}
