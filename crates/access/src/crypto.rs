use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generates a random hex-encoded salt. The hashing primitive itself is a
/// contract, not a design concern (see SPEC_FULL.md); this is one
/// reasonable implementation, kept swappable behind [`hash_secret`].
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_secret(secret: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn random_secret(len: usize) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}
