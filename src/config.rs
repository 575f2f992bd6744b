use std::str::FromStr;

use crate::error::CatalogError;
use crate::password::{PasswordHasher, PasswordPolicy, DEFAULT_ITERATIONS, DEFAULT_MIN_LENGTH};

pub const DEFAULT_POOL_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub database_url: Option<String>,
    pub password_min_length: usize,
    pub password_iterations: u32,
    pub pool_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            password_min_length: DEFAULT_MIN_LENGTH,
            password_iterations: DEFAULT_ITERATIONS,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl CatalogConfig {
    /// Reads `DATABASE_URL`, `CATALOG_PASSWORD_MIN_LENGTH`,
    /// `CATALOG_PASSWORD_ITERATIONS` and `CATALOG_DB_POOL_SIZE`.
    pub fn from_env() -> Result<Self, CatalogError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CatalogError> {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            password_min_length: parse_or(
                &lookup,
                "CATALOG_PASSWORD_MIN_LENGTH",
                defaults.password_min_length,
            )?,
            password_iterations: parse_or(
                &lookup,
                "CATALOG_PASSWORD_ITERATIONS",
                defaults.password_iterations,
            )?,
            pool_size: parse_or(&lookup, "CATALOG_DB_POOL_SIZE", defaults.pool_size)?,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, CatalogError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| CatalogError::ConfigError {
                message: "DATABASE_URL environment variable is required".to_string(),
            })
    }

    pub fn password_hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.password_iterations)
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::new(self.password_min_length)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, CatalogError>
where
    T: FromStr + PartialOrd + From<u8>,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value: T = raw.trim().parse().map_err(|e| CatalogError::ConfigError {
        message: format!("Invalid {}: {}", key, e),
    })?;
    if value < T::from(1) {
        return Err(CatalogError::ConfigError {
            message: format!("Invalid {}: must be at least 1", key),
        });
    }
    Ok(value)
}

/// Database URL with the credentials masked, for logging.
pub fn redact_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end + 3 => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
