pub mod audio;
pub mod auth;
pub mod events;
pub mod observability;
pub mod persistence;
pub mod storage;
