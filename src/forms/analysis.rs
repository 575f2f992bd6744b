use uuid::Uuid;

use super::{resolve_references, Cleaner, FieldKind, FieldSpec, FormData};
use crate::catalog::{Analysis, NAME_MAX_LENGTH};
use crate::error::CatalogResult;
use crate::store::CatalogStore;

const NAME: FieldSpec = FieldSpec::new("name", "Name", FieldKind::Text)
    .required()
    .max_length(NAME_MAX_LENGTH);
const DESCRIPTION: FieldSpec = FieldSpec::new("description", "Description", FieldKind::TextArea);
const DATASET: FieldSpec = FieldSpec::new("dataset", "Dataset", FieldKind::Reference).required();
const OWNER: FieldSpec = FieldSpec::new("owner", "Owner", FieldKind::Reference).required();

#[derive(Debug, Clone)]
pub struct AnalysisForm {
    data: FormData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFields {
    pub name: String,
    pub description: String,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
}

impl AnalysisForm {
    pub const FIELDS: &'static [FieldSpec] = &[NAME, DESCRIPTION, DATASET, OWNER];

    pub fn bind(data: &FormData) -> Self {
        Self {
            data: data.restrict(Self::FIELDS),
        }
    }

    pub fn initial(analysis: &Analysis) -> FormData {
        FormData::new()
            .with(NAME.name, analysis.name.as_str())
            .with(DESCRIPTION.name, analysis.description.as_str())
            .with(DATASET.name, analysis.dataset_id.to_string())
            .with(OWNER.name, analysis.owner_id.to_string())
    }

    /// Validates the submission, resolving dataset and owner in `store`.
    pub async fn validate(&self, store: &dyn CatalogStore) -> CatalogResult<AnalysisFields> {
        let mut cleaner = Cleaner::new(&self.data);
        let name = cleaner.text(&NAME);
        let description = cleaner.text(&DESCRIPTION);
        let dataset_id = cleaner.reference(&DATASET);
        let owner_id = cleaner.reference(&OWNER);

        resolve_references(&mut cleaner, store, (&DATASET, dataset_id), (&OWNER, owner_id))
            .await?;

        let errors = cleaner.finish();
        match (dataset_id, owner_id) {
            (Some(dataset_id), Some(owner_id)) if errors.is_empty() => Ok(AnalysisFields {
                name,
                description,
                dataset_id,
                owner_id,
            }),
            _ => Err(errors.into()),
        }
    }
}

impl AnalysisFields {
    pub fn build(self) -> Analysis {
        Analysis::new(self.name, self.description, self.dataset_id, self.owner_id)
    }

    pub fn apply_to(self, analysis: &mut Analysis) {
        analysis.name = self.name;
        analysis.description = self.description;
        analysis.dataset_id = self.dataset_id;
        analysis.owner_id = self.owner_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{now, Account, Credential, Dataset, Profile};
    use crate::error::CatalogError;
    use crate::forms::{FieldError, FormErrors};
    use crate::memory::MemoryCatalogStore;

    async fn seeded_store() -> (MemoryCatalogStore, Uuid, Uuid) {
        let store = MemoryCatalogStore::new();
        let owner = store
            .create_account(Account {
                id: Uuid::new_v4(),
                credential: Credential {
                    username: "alice".to_string(),
                    email: String::new(),
                    first_name: String::new(),
                    last_name: String::new(),
                    password_hash: "pbkdf2_sha256$1$salt$digest".to_string(),
                    is_active: true,
                    date_joined: now(),
                    last_login: None,
                },
                profile: Profile::default(),
            })
            .await
            .unwrap();
        let dataset = store
            .create_dataset(Dataset::new("Genome Survey", "", owner.id))
            .await
            .unwrap();
        (store, dataset.id, owner.id)
    }

    fn submission(name: &str, dataset: Uuid, owner: Uuid) -> FormData {
        FormData::new()
            .with("name", name)
            .with("description", "Principal components")
            .with("dataset", dataset.to_string())
            .with("owner", owner.to_string())
    }

    async fn errors_for(store: &MemoryCatalogStore, data: FormData) -> FormErrors {
        match AnalysisForm::bind(&data).validate(store).await {
            Err(CatalogError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_valid_submission_resolves_references() {
        let (store, dataset, owner) = seeded_store().await;

        let fields = AnalysisForm::bind(&submission("PCA run", dataset, owner))
            .validate(&store)
            .await
            .unwrap();
        assert_eq!(fields.dataset_id, dataset);
        assert_eq!(fields.owner_id, owner);

        let analysis = fields.build();
        assert_eq!(analysis.name, "PCA run");
        assert_eq!(analysis.created_at, analysis.updated_at);
    }

    #[tokio::test]
    async fn test_name_too_long() {
        let (store, dataset, owner) = seeded_store().await;

        let errors = errors_for(&store, submission(&"x".repeat(256), dataset, owner)).await;
        assert_eq!(
            errors.get("name"),
            &[FieldError::MaxLength {
                max: 255,
                actual: 256
            }]
        );
        assert_eq!(errors.fields().count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_references() {
        let (store, dataset, _) = seeded_store().await;

        let errors = errors_for(&store, submission("PCA run", Uuid::new_v4(), Uuid::new_v4())).await;
        assert_eq!(errors.get("dataset"), &[FieldError::InvalidChoice]);
        assert_eq!(errors.get("owner"), &[FieldError::InvalidChoice]);

        let data = submission("PCA run", dataset, Uuid::new_v4()).with("owner", "not-a-uuid");
        let errors = errors_for(&store, data).await;
        assert!(!errors.has("dataset"));
        assert_eq!(errors.get("owner"), &[FieldError::InvalidChoice]);
    }

    #[tokio::test]
    async fn test_initial_round_trips() {
        let (store, dataset, owner) = seeded_store().await;
        let analysis = Analysis::new("PCA run", "notes", dataset, owner);

        let fields = AnalysisForm::bind(&AnalysisForm::initial(&analysis))
            .validate(&store)
            .await
            .unwrap();
        assert_eq!(
            fields,
            AnalysisFields {
                name: "PCA run".to_string(),
                description: "notes".to_string(),
                dataset_id: dataset,
                owner_id: owner,
            }
        );
    }
}
