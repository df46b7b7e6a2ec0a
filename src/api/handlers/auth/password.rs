//! Password hashing with bcrypt.
//!
//! The salt is embedded in the produced hash. Plaintext passwords are never
//! stored or logged anywhere in this crate.

use rand::Rng;

/// bcrypt work factor for new hashes.
pub const DEFAULT_COST: u32 = 12;

/// Hash a plaintext password.
///
/// # Errors
/// Returns an error if the cost factor is out of bcrypt's accepted range.
pub fn hash_password(plaintext: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, cost)
}

/// Check a plaintext password against a stored hash.
///
/// Mismatches and malformed stored hashes both return `false`; this function
/// never errors outward.
#[must_use]
pub fn verify_password(plaintext: &str, password_hash: &str) -> bool {
    bcrypt::verify(plaintext, password_hash).unwrap_or(false)
}

/// Generate a random password from a fixed charset.
#[must_use]
pub fn generate_password(length: usize) -> String {
    const CHARSET: &[u8] =
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let index = rng.gen_range(0..CHARSET.len());
            CHARSET[index] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps the test suite fast; production uses DEFAULT_COST.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("hunter42", TEST_COST).expect("hash should succeed");
        assert!(verify_password("hunter42", &hash));
        assert!(!verify_password("hunter43", &hash));
    }

    #[test]
    fn hash_embeds_a_fresh_salt() {
        let first = hash_password("hunter42", TEST_COST).expect("hash should succeed");
        let second = hash_password("hunter42", TEST_COST).expect("hash should succeed");
        assert_ne!(first, second);
        assert!(verify_password("hunter42", &first));
        assert!(verify_password("hunter42", &second));
    }

    #[test]
    fn verify_malformed_hash_is_false_not_error() {
        assert!(!verify_password("hunter42", "not-a-bcrypt-hash"));
        assert!(!verify_password("hunter42", ""));
    }

    #[test]
    fn default_cost_matches_policy() {
        assert_eq!(DEFAULT_COST, 12);
    }

    #[test]
    fn generate_password_length_and_charset() {
        let password = generate_password(12);
        assert_eq!(password.chars().count(), 12);
        assert!(password.chars().all(|c| c.is_ascii_graphic()));

        let other = generate_password(12);
        // Two draws colliding would be astronomically unlikely.
        assert_ne!(password, other);
    }
}
