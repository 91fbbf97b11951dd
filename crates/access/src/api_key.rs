use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use database::repositories::ApiKeyRepository;
use ids::IdentifierService;
use shared::ApiError;

use crate::crypto;

const CACHE_TTL: Duration = Duration::from_secs(60);

pub struct IssuedKey {
    pub key_id: String,
    /// Shown to the caller exactly once; never persisted in plain form.
    pub raw_key: String,
}

struct CacheEntry {
    user_id: String,
    expires_at: Instant,
}

/// API-key issuance/validation, surfacing only `user_id` on success. The
/// hash function itself is a contract, not a design concern (see
/// SPEC_FULL.md); [`crypto`] picks one reasonable implementation.
/// Validated `(key_id -> user_id)` pairs are cached briefly to avoid
/// re-hashing on every request, per SPEC_FULL.md §5.
pub struct ApiKeyService {
    repo: ApiKeyRepository,
    ids: Arc<IdentifierService>,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl ApiKeyService {
    pub fn new(repo: ApiKeyRepository, ids: Arc<IdentifierService>) -> Self {
        ApiKeyService { repo, ids, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn issue(&self, user_id: &str, user_key_id: &str) -> Result<IssuedKey, ApiError> {
        let key_id = self.ids.new_accession();
        let secret = crypto::random_secret(40);
        let salt = crypto::generate_salt();
        let hash = crypto::hash_secret(&secret, &salt);

        self.repo.add(&key_id, user_id, user_key_id, &hash, &salt).await.map_err(internal)?;

        Ok(IssuedKey { raw_key: format!("{key_id}.{secret}"), key_id })
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<database::models::ApiKey>, ApiError> {
        self.repo.list_by_user(user_id).await.map_err(internal)
    }

    pub async fn revoke(&self, key_id: &str) -> Result<(), ApiError> {
        let deleted = self.repo.delete_by_id(key_id).await.map_err(internal)?;
        self.cache.lock().unwrap().remove(key_id);
        if !deleted {
            return Err(ApiError::NotFound(format!("no API key '{key_id}'")));
        }
        Ok(())
    }

    /// Returns the owning `user_id` for a raw key presented by a client,
    /// or `None` if it is malformed, unknown, or fails verification.
    pub async fn validate(&self, raw_key: &str) -> Result<Option<String>, ApiError> {
        let Some((key_id, secret)) = raw_key.split_once('.') else {
            return Ok(None);
        };

        if let Some(user_id) = self.cached(key_id) {
            return Ok(Some(user_id));
        }

        let Some(record) = self.repo.get_by_key_id(key_id).await.map_err(internal)? else {
            return Ok(None);
        };

        if crypto::hash_secret(secret, &record.salt) != record.api_key_hash {
            return Ok(None);
        }

        self.cache.lock().unwrap().insert(
            key_id.to_string(),
            CacheEntry { user_id: record.user_id.clone(), expires_at: Instant::now() + CACHE_TTL },
        );
        Ok(Some(record.user_id))
    }

    fn cached(&self, key_id: &str) -> Option<String> {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(key_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.user_id.clone()),
            Some(_) => {
                cache.remove(key_id);
                None
            }
            None => None,
        }
    }
}

fn internal(err: sqlx::Error) -> ApiError {
    ApiError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips_with_its_own_salt() {
        let salt = crypto::generate_salt();
        let hash = crypto::hash_secret("my-secret", &salt);
        assert_eq!(crypto::hash_secret("my-secret", &salt), hash);
        assert_ne!(crypto::hash_secret("other-secret", &salt), hash);
    }
}
