//! API client authentication
//!
//! Clients authenticate with an opaque API key presented in the
//! `X-Api-Key` header. Only the SHA-256 digest of a key is stored; the
//! plaintext exists once, at generation time.
//!
//! This module contains only pure functions and database operations.
//! No HTTP framework dependencies - those live in module-specific code.

use crate::db::models::User;
use crate::db::queries::find_user_by_api_key_hash;
use crate::Result;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// Header carrying the client API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Hex-encoded SHA-256 digest of an API key
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Generate a fresh 32-byte API key, hex encoded
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Resolve an API key to the user account it belongs to
pub async fn authenticate(db: &SqlitePool, api_key: &str) -> Result<Option<User>> {
    find_user_by_api_key_hash(db, &hash_api_key(api_key)).await
}
