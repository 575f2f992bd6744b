use thiserror::Error;

use crate::forms::FormErrors;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(FormErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Password hash error: {message}")]
    PasswordHash { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub fn database(context: &str, err: impl std::fmt::Display) -> Self {
        CatalogError::Database {
            message: format!("{}: {}", context, err),
        }
    }

    /// Field errors when this is a validation failure.
    pub fn form_errors(&self) -> Option<&FormErrors> {
        match self {
            CatalogError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FormErrors> for CatalogError {
    fn from(errors: FormErrors) -> Self {
        CatalogError::Validation(errors)
    }
}

impl From<diesel::result::Error> for CatalogError {
    fn from(err: diesel::result::Error) -> Self {
        CatalogError::Database {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::InternalError {
            message: format!("JSON error: {}", err),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
