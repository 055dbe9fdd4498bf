mod argon2_hasher;
mod jwt_issuer;
mod one_time_token;

pub use argon2_hasher::Argon2PasswordHasher;
pub use jwt_issuer::JwtTokenIssuer;
pub use one_time_token::generate_one_time_token;
