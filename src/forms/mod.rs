//! Validation boundary between raw submitted fields and catalog entities.
//!
//! Every form declares its accepted fields as a `FieldSpec` list. Binding a
//! form keeps only those keys, so values such as `owner_id` or `created_at`
//! can never be smuggled in through a submission.

mod analysis;
mod dataset;
mod registration;
mod visualization;

pub use analysis::{AnalysisFields, AnalysisForm};
pub use dataset::{DatasetFields, DatasetForm};
pub use registration::{RegistrationForm, ValidatedRegistration};
pub use visualization::{VisualizationFields, VisualizationForm};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;

/// Raw field values as submitted by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormData(HashMap<String, String>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds form data from a JSON object. Scalars are stringified and
    /// nulls are treated as absent.
    pub fn from_json(value: serde_json::Value) -> CatalogResult<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(CatalogError::InternalError {
                message: "form data must be a JSON object".to_string(),
            });
        };

        let mut data = FormData::new();
        for (key, value) in map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => data.insert(key, s),
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
                    data.insert(key, value.to_string())
                }
                other => {
                    return Err(CatalogError::InternalError {
                        message: format!("field '{}' has non-scalar value: {}", key, other),
                    });
                }
            }
        }
        Ok(data)
    }

    /// Copy holding only the fields listed in `specs`.
    pub fn restrict(&self, specs: &[FieldSpec]) -> FormData {
        FormData(
            specs
                .iter()
                .filter_map(|spec| {
                    self.0
                        .get(spec.name)
                        .map(|value| (spec.name.to_string(), value.clone()))
                })
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FormData(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Email,
    Password,
    /// Identifier of another catalog record.
    Reference,
}

/// Declaration of one accepted form field, also used by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub max_length: Option<usize>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            max_length: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("This field is required.")]
    Required,

    #[error("Ensure this value has at most {max} characters (it has {actual}).")]
    MaxLength { max: usize, actual: usize },

    #[error("Select a valid choice. That choice is not one of the available choices.")]
    InvalidChoice,

    #[error("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.")]
    InvalidUsername,

    #[error("Enter a valid email address.")]
    InvalidEmail,

    #[error("A user with that username already exists.")]
    DuplicateUsername,

    #[error("The two password fields didn't match.")]
    PasswordMismatch,

    #[error("This password is too short. It must contain at least {min} characters.")]
    PasswordTooShort { min: usize },

    #[error("This password is entirely numeric.")]
    PasswordEntirelyNumeric,

    #[error("This password is too common.")]
    PasswordTooCommon,

    #[error("The password is too similar to the {attribute}.")]
    PasswordTooSimilar { attribute: &'static str },
}

/// Validation errors collected per field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<FieldError>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, error: FieldError) {
        self.0.entry(field.to_string()).or_default().push(error);
    }

    pub fn get(&self, field: &str) -> &[FieldError] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Human readable messages keyed by field, for redisplaying a form.
    pub fn messages(&self) -> BTreeMap<String, Vec<String>> {
        self.0
            .iter()
            .map(|(field, errors)| {
                (
                    field.clone(),
                    errors.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, errors) in &self.0 {
            for error in errors {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, error)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Pulls cleaned values out of restricted form data, recording field errors.
pub(crate) struct Cleaner<'a> {
    data: &'a FormData,
    errors: FormErrors,
}

impl<'a> Cleaner<'a> {
    pub(crate) fn new(data: &'a FormData) -> Self {
        Self {
            data,
            errors: FormErrors::default(),
        }
    }

    /// Cleaned string value. Surrounding whitespace is stripped except for
    /// passwords; missing optional fields clean to the empty string.
    pub(crate) fn text(&mut self, spec: &FieldSpec) -> String {
        let raw = self.data.get(spec.name).unwrap_or("");
        let value = if spec.kind == FieldKind::Password {
            raw.to_string()
        } else {
            raw.trim().to_string()
        };

        if value.is_empty() {
            if spec.required {
                self.errors.add(spec.name, FieldError::Required);
            }
            return value;
        }

        if let Some(max) = spec.max_length {
            let actual = value.chars().count();
            if actual > max {
                self.errors
                    .add(spec.name, FieldError::MaxLength { max, actual });
            }
        }

        value
    }

    /// Parsed record identifier, `None` when absent or malformed.
    pub(crate) fn reference(&mut self, spec: &FieldSpec) -> Option<Uuid> {
        let value = self.text(spec);
        if value.is_empty() {
            return None;
        }
        match Uuid::parse_str(&value) {
            Ok(id) => Some(id),
            Err(_) => {
                self.errors.add(spec.name, FieldError::InvalidChoice);
                None
            }
        }
    }

    pub(crate) fn add_error(&mut self, field: &str, error: FieldError) {
        self.errors.add(field, error);
    }

    pub(crate) fn has_error(&self, field: &str) -> bool {
        self.errors.has(field)
    }

    pub(crate) fn finish(self) -> FormErrors {
        self.errors
    }
}

/// Checks that the dataset and owner references point at stored records.
pub(crate) async fn resolve_references(
    cleaner: &mut Cleaner<'_>,
    store: &dyn CatalogStore,
    dataset: (&FieldSpec, Option<Uuid>),
    owner: (&FieldSpec, Option<Uuid>),
) -> CatalogResult<()> {
    if let (spec, Some(dataset_id)) = dataset {
        if store.get_dataset(dataset_id).await?.is_none() {
            cleaner.add_error(spec.name, FieldError::InvalidChoice);
        }
    }
    if let (spec, Some(owner_id)) = owner {
        if store.get_account(owner_id).await?.is_none() {
            cleaner.add_error(spec.name, FieldError::InvalidChoice);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: FieldSpec = FieldSpec::new("name", "Name", FieldKind::Text)
        .required()
        .max_length(5);
    const SECRET: FieldSpec = FieldSpec::new("secret", "Secret", FieldKind::Password);
    const REF: FieldSpec = FieldSpec::new("ref", "Reference", FieldKind::Reference).required();

    #[test]
    fn test_restrict_drops_unknown_fields() {
        let data = FormData::new()
            .with("name", "x")
            .with("owner_id", "someone")
            .with("created_at", "2001-01-01");

        let restricted = data.restrict(&[NAME, SECRET]);
        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted.get("name"), Some("x"));
        assert!(!restricted.contains("owner_id"));
    }

    #[test]
    fn test_text_trims_and_checks_length() {
        let data = FormData::new().with("name", "  abc  ").with("secret", " pw ");
        let mut cleaner = Cleaner::new(&data);
        assert_eq!(cleaner.text(&NAME), "abc");
        assert_eq!(cleaner.text(&SECRET), " pw ");
        assert!(cleaner.finish().is_empty());

        let data = FormData::new().with("name", "ąęśćźż");
        let mut cleaner = Cleaner::new(&data);
        cleaner.text(&NAME);
        assert_eq!(
            cleaner.finish().get("name"),
            &[FieldError::MaxLength { max: 5, actual: 6 }]
        );
    }

    #[test]
    fn test_required_blank_value() {
        let data = FormData::new().with("name", "   ");
        let mut cleaner = Cleaner::new(&data);
        cleaner.text(&NAME);
        cleaner.reference(&REF);
        let errors = cleaner.finish();
        assert_eq!(errors.get("name"), &[FieldError::Required]);
        assert_eq!(errors.get("ref"), &[FieldError::Required]);
    }

    #[test]
    fn test_reference_parsing() {
        let id = Uuid::new_v4();
        let data = FormData::new().with("ref", id.to_string());
        let mut cleaner = Cleaner::new(&data);
        assert_eq!(cleaner.reference(&REF), Some(id));

        let data = FormData::new().with("ref", "42");
        let mut cleaner = Cleaner::new(&data);
        assert_eq!(cleaner.reference(&REF), None);
        assert_eq!(cleaner.finish().get("ref"), &[FieldError::InvalidChoice]);
    }

    #[test]
    fn test_from_json() {
        let data = FormData::from_json(serde_json::json!({
            "name": "Genome Survey",
            "count": 3,
            "description": null,
        }))
        .unwrap();

        assert_eq!(data.get("name"), Some("Genome Survey"));
        assert_eq!(data.get("count"), Some("3"));
        assert!(!data.contains("description"));

        assert!(FormData::from_json(serde_json::json!(["name"])).is_err());
        assert!(FormData::from_json(serde_json::json!({"tags": ["a"]})).is_err());
    }

    #[test]
    fn test_form_errors_display_and_messages() {
        let mut errors = FormErrors::default();
        errors.add("name", FieldError::Required);
        errors.add("dataset", FieldError::InvalidChoice);

        assert_eq!(
            errors.to_string(),
            "dataset: Select a valid choice. That choice is not one of the available choices.; name: This field is required."
        );
        assert_eq!(
            errors.messages()["name"],
            vec!["This field is required.".to_string()]
        );
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["dataset", "name"]);
    }
}
