pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordHashError>;

    /// Returns false both for a mismatch and for an undecodable stored hash;
    /// the distinction never reaches the caller.
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordHashError {
    #[error("hashing failed: {0}")]
    HashingFailed(String),
}
