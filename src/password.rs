//! Password hashing and strength checks for account credentials.
//!
//! Hashes are PBKDF2-HMAC-SHA256, encoded as
//! `pbkdf2_sha256$<iterations>$<salt>$<digest>` with the salt and digest in
//! unpadded standard base64.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;

use crate::error::{CatalogError, CatalogResult};
use crate::forms::FieldError;

const ALGORITHM: &str = "pbkdf2_sha256";
const SALT_BYTES: usize = 16;
const DIGEST_BYTES: usize = 32;

/// Longest password the forms accept.
pub const MAX_PASSWORD_LENGTH: usize = 4096;

pub const DEFAULT_ITERATIONS: u32 = 260_000;
pub const DEFAULT_MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "1234567890", "password", "password1",
    "password123", "qwerty", "qwerty123", "qwertyuiop", "abc123", "abcd1234",
    "letmein", "welcome", "welcome1", "iloveyou", "admin", "administrator",
    "monkey", "dragon", "football", "baseball", "sunshine", "princess",
    "trustno1", "passw0rd", "master", "superman", "starwars", "whatever",
    "1q2w3e4r", "zaq12wsx", "changeme", "secret", "research", "science",
];

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hashes `password` under a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        let salt = generate_salt();
        let digest = derive(password.as_bytes(), salt.as_bytes(), self.iterations);
        format!(
            "{}${}${}${}",
            ALGORITHM,
            self.iterations,
            salt,
            STANDARD_NO_PAD.encode(digest)
        )
    }

    /// Checks `password` against an encoded hash.
    ///
    /// The iteration count stored in the hash wins over this hasher's own, so
    /// hashes written under an older setting keep verifying.
    pub fn verify(&self, password: &str, encoded: &str) -> CatalogResult<bool> {
        let parts: Vec<&str> = encoded.split('$').collect();
        let [algorithm, iterations, salt, digest] = parts.as_slice() else {
            return Err(CatalogError::PasswordHash {
                message: "expected four '$'-separated fields".to_string(),
            });
        };

        if *algorithm != ALGORITHM {
            return Err(CatalogError::PasswordHash {
                message: format!("unsupported algorithm: {}", algorithm),
            });
        }

        let iterations: u32 = iterations.parse().map_err(|e| CatalogError::PasswordHash {
            message: format!("invalid iteration count: {}", e),
        })?;
        if iterations == 0 {
            return Err(CatalogError::PasswordHash {
                message: "iteration count must be positive".to_string(),
            });
        }

        let expected = STANDARD_NO_PAD
            .decode(digest)
            .map_err(|e| CatalogError::PasswordHash {
                message: format!("invalid digest encoding: {}", e),
            })?;

        let actual = derive(password.as_bytes(), salt.as_bytes(), iterations);
        Ok(constant_time_eq(&actual, &expected))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

fn generate_salt() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..SALT_BYTES).map(|_| rng.random::<u8>()).collect();
    STANDARD_NO_PAD.encode(&bytes)
}

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> [u8; DIGEST_BYTES] {
    let mut digest = [0u8; DIGEST_BYTES];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut digest);
    digest
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Account attributes a password must not resemble.
#[derive(Debug, Clone, Copy)]
pub struct UserAttributes<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

impl<'a> UserAttributes<'a> {
    fn named(&self) -> [(&'static str, &'a str); 4] {
        [
            ("username", self.username),
            ("email", self.email.split('@').next().unwrap_or("")),
            ("first name", self.first_name),
            ("last name", self.last_name),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Returns every rule `password` breaks; empty means acceptable.
    pub fn check(&self, password: &str, attributes: &UserAttributes<'_>) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if let Some(attribute) = similar_attribute(password, attributes) {
            errors.push(FieldError::PasswordTooSimilar { attribute });
        }

        if password.chars().count() < self.min_length {
            errors.push(FieldError::PasswordTooShort {
                min: self.min_length,
            });
        }

        if COMMON_PASSWORDS.contains(&password.trim().to_lowercase().as_str()) {
            errors.push(FieldError::PasswordTooCommon);
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            errors.push(FieldError::PasswordEntirelyNumeric);
        }

        errors
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH)
    }
}

fn similar_attribute(password: &str, attributes: &UserAttributes<'_>) -> Option<&'static str> {
    let password = password.to_lowercase();
    for (label, value) in attributes.named() {
        let value = value.to_lowercase();
        let whole = std::iter::once(value.as_str());
        let parts = value.split(|c: char| !c.is_alphanumeric());
        for part in whole.chain(parts) {
            if part.chars().count() < 3 {
                continue;
            }
            if password.contains(part) || part.contains(password.as_str()) {
                return Some(label);
            }
        }
    }
    None
}
