use uuid::Uuid;

use super::{Cleaner, FieldKind, FieldSpec, FormData};
use crate::catalog::{Dataset, NAME_MAX_LENGTH};
use crate::error::CatalogResult;

const NAME: FieldSpec = FieldSpec::new("name", "Name", FieldKind::Text)
    .required()
    .max_length(NAME_MAX_LENGTH);
const DESCRIPTION: FieldSpec = FieldSpec::new("description", "Description", FieldKind::TextArea);

/// Create/edit form for datasets. Owner is assigned by the caller.
#[derive(Debug, Clone)]
pub struct DatasetForm {
    data: FormData,
}

/// Cleaned dataset fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetFields {
    pub name: String,
    pub description: String,
}

impl DatasetForm {
    pub const FIELDS: &'static [FieldSpec] = &[NAME, DESCRIPTION];

    pub fn bind(data: &FormData) -> Self {
        Self {
            data: data.restrict(Self::FIELDS),
        }
    }

    /// Form data pre-filled from an existing dataset, for edit views.
    pub fn initial(dataset: &Dataset) -> FormData {
        FormData::new()
            .with(NAME.name, dataset.name.as_str())
            .with(DESCRIPTION.name, dataset.description.as_str())
    }

    pub fn validate(&self) -> CatalogResult<DatasetFields> {
        let mut cleaner = Cleaner::new(&self.data);
        let fields = DatasetFields {
            name: cleaner.text(&NAME),
            description: cleaner.text(&DESCRIPTION),
        };
        cleaner.finish().into_result(fields).map_err(Into::into)
    }
}

impl DatasetFields {
    pub fn build(self, owner_id: Uuid) -> Dataset {
        Dataset::new(self.name, self.description, owner_id)
    }

    pub fn apply_to(self, dataset: &mut Dataset) {
        dataset.name = self.name;
        dataset.description = self.description;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::forms::FieldError;

    #[test]
    fn test_valid_submission() {
        let data = FormData::new()
            .with("name", " Genome Survey ")
            .with("description", "Whole-genome samples");

        let fields = DatasetForm::bind(&data).validate().unwrap();
        assert_eq!(fields.name, "Genome Survey");

        let owner = Uuid::new_v4();
        let dataset = fields.build(owner);
        assert_eq!(dataset.owner_id, owner);
        assert_eq!(dataset.description, "Whole-genome samples");
    }

    #[test]
    fn test_owner_cannot_be_submitted() {
        let data = FormData::new()
            .with("name", "Survey")
            .with("owner", Uuid::new_v4().to_string())
            .with("owner_id", Uuid::new_v4().to_string());

        let owner = Uuid::new_v4();
        let dataset = DatasetForm::bind(&data).validate().unwrap().build(owner);
        assert_eq!(dataset.owner_id, owner);
    }

    #[test]
    fn test_name_too_long() {
        let data = FormData::new().with("name", "x".repeat(256));

        let err = DatasetForm::bind(&data).validate().unwrap_err();
        let CatalogError::Validation(errors) = err else {
            panic!("expected validation error, got {:?}", err);
        };
        assert_eq!(
            errors.get("name"),
            &[FieldError::MaxLength {
                max: 255,
                actual: 256
            }]
        );
    }

    #[test]
    fn test_description_is_unbounded() {
        let data = FormData::new()
            .with("name", "x".repeat(255))
            .with("description", "d".repeat(10_000));

        assert!(DatasetForm::bind(&data).validate().is_ok());
    }

    #[test]
    fn test_initial_round_trips() {
        let dataset = Dataset::new("Survey", "notes", Uuid::new_v4());
        let fields = DatasetForm::bind(&DatasetForm::initial(&dataset))
            .validate()
            .unwrap();
        assert_eq!(
            fields,
            DatasetFields {
                name: "Survey".to_string(),
                description: "notes".to_string(),
            }
        );
    }
}
