// utils/otp_generator.rs
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub fn generate_otp() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(100000..=999999))
}

/// OTPs are stored as hex SHA-256 digests keyed by the recipient.
pub fn hash_otp(recipient: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(recipient.to_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn otp_matches(stored_hash: &str, recipient: &str, code: &str) -> bool {
    let candidate = hash_otp(recipient, code);
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}
