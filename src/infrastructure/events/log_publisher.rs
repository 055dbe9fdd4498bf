use crate::application::ports::EventPublisher;
use crate::domain::UserEvent;

/// Publishes account events to the structured log. A mailer or broker
/// integration would replace this implementation behind the same port; the
/// frontend URL is recorded so the emitted links are reproducible from the
/// log alone.
pub struct LogEventPublisher {
    frontend_url: String,
}

impl LogEventPublisher {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into(),
        }
    }
}

impl EventPublisher for LogEventPublisher {
    fn publish(&self, event: UserEvent) {
        match &event {
            UserEvent::Registered {
                user_id,
                email,
                verification_token,
                ..
            } => {
                tracing::info!(
                    event = event.event_type(),
                    user_id = %user_id.as_uuid(),
                    email = %email,
                    action_url = %format!("{}/verify-email?token={}", self.frontend_url, verification_token),
                    "User event published"
                );
            }
            UserEvent::Verified { user_id, email, .. } => {
                tracing::info!(
                    event = event.event_type(),
                    user_id = %user_id.as_uuid(),
                    email = %email,
                    "User event published"
                );
            }
            UserEvent::PasswordResetRequested {
                user_id,
                email,
                reset_token,
                ..
            } => {
                tracing::info!(
                    event = event.event_type(),
                    user_id = %user_id.as_uuid(),
                    email = %email,
                    action_url = %format!("{}/reset-password?token={}", self.frontend_url, reset_token),
                    "User event published"
                );
            }
        }
    }
}
