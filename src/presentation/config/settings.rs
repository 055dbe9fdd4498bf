use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app_name: String,
    pub frontend_url: String,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub audio: AudioSettings,
    pub workers: WorkerSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub verification_token_expire_hours: i64,
    pub password_reset_token_expire_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub upload_dir: PathBuf,
    pub max_file_size_mb: u64,
    pub file_expiry_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct WorkerSettings {
    pub count: usize,
    pub queue_capacity: usize,
    pub maintenance_interval_secs: u64,
    pub stale_after_secs: u64,
}

impl Settings {
    /// Environment-variable configuration with deployable defaults. The only
    /// variables without a usable default are `DATABASE_URL` and
    /// `JWT_SECRET`; everything else matches the standard deployment.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            app_name: env_or("APP_NAME", "Whazz Audio API".to_string()),
            frontend_url: env_or("FRONTEND_URL", "http://localhost:3000".to_string()),
            server: ServerSettings {
                host: env_or("SERVER_HOST", "0.0.0.0".to_string()),
                port: env_parsed("SERVER_PORT", 8000)?,
            },
            database: DatabaseSettings {
                url: std::env::var("DATABASE_URL")
                    .map_err(|_| "DATABASE_URL is required".to_string())?,
                max_connections: env_parsed("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: AuthSettings {
                jwt_secret: SecretString::from(
                    std::env::var("JWT_SECRET").map_err(|_| "JWT_SECRET is required".to_string())?,
                ),
                access_token_expire_minutes: env_parsed("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
                refresh_token_expire_days: env_parsed("REFRESH_TOKEN_EXPIRE_DAYS", 7)?,
                verification_token_expire_hours: env_parsed("VERIFICATION_TOKEN_EXPIRE_HOURS", 24)?,
                password_reset_token_expire_hours: env_parsed(
                    "PASSWORD_RESET_TOKEN_EXPIRE_HOURS",
                    2,
                )?,
            },
            audio: AudioSettings {
                upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "./uploads".to_string())),
                max_file_size_mb: env_parsed("MAX_FILE_SIZE_MB", 100)?,
                file_expiry_hours: env_parsed("FILE_EXPIRY_HOURS", 24)?,
            },
            workers: WorkerSettings {
                count: env_parsed("WORKER_COUNT", 2)?,
                queue_capacity: env_parsed("QUEUE_CAPACITY", 64)?,
                maintenance_interval_secs: env_parsed("MAINTENANCE_INTERVAL_SECS", 900)?,
                stale_after_secs: env_parsed("WORKER_STALE_AFTER_SECS", 30)?,
            },
        })
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| format!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
