mod audio;
mod auth;
mod guest;
mod health;
mod user_settings;

pub use audio::{download_handler, job_status_handler, upload_handler};
pub use auth::{
    forgot_password_handler, login_handler, logout_handler, me_handler, refresh_handler,
    resend_verification_handler, reset_password_handler, signup_handler, verify_email_handler,
};
pub use guest::guest_session_handler;
pub use health::{health_handler, root_handler};
pub use user_settings::{
    change_password_handler, update_username_handler, usage_stats_handler, user_settings_handler,
};
