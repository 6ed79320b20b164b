/// Viewing keys: per-account shared secrets gating private queries.
///
/// Only the SHA-256 hash of a key is stored; a query proves knowledge of the
/// key by hashing what it was given and comparing.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const VIEWING_KEY_PREFIX: &str = "api_key_";
pub const VIEWING_KEY_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewingKey(pub String);

impl ViewingKey {
    /// Derive a fresh key from the engine's hashed seed, caller entropy, the
    /// current time and OS randomness.
    pub fn new(seed: &[u8], entropy: &[u8], now: u64) -> Self {
        let nonce: [u8; 16] = rand::random();

        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(entropy);
        hasher.update(now.to_be_bytes());
        hasher.update(nonce);

        let digest = hasher.finalize();
        ViewingKey(format!(
            "{}{}",
            VIEWING_KEY_PREFIX,
            &hex::encode(digest)[..VIEWING_KEY_SIZE * 2]
        ))
    }

    /// Hash for storage.
    pub fn hashed(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }

    /// Compare against a stored hash without branching on length.
    pub fn check(&self, stored_hash: &str) -> bool {
        let ours = self.hashed();
        if ours.len() != stored_hash.len() {
            return false;
        }
        ours.bytes()
            .zip(stored_hash.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Display for ViewingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
