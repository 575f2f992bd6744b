use uuid::Uuid;

use super::{resolve_references, Cleaner, FieldKind, FieldSpec, FormData};
use crate::catalog::{Visualization, NAME_MAX_LENGTH, VISUALIZATION_TYPE_MAX_LENGTH};
use crate::error::CatalogResult;
use crate::store::CatalogStore;

const NAME: FieldSpec = FieldSpec::new("name", "Name", FieldKind::Text)
    .required()
    .max_length(NAME_MAX_LENGTH);
const DESCRIPTION: FieldSpec = FieldSpec::new("description", "Description", FieldKind::TextArea);
const VISUALIZATION_TYPE: FieldSpec =
    FieldSpec::new("visualization_type", "Visualization type", FieldKind::Text)
        .max_length(VISUALIZATION_TYPE_MAX_LENGTH);
const DATASET: FieldSpec = FieldSpec::new("dataset", "Dataset", FieldKind::Reference).required();
const OWNER: FieldSpec = FieldSpec::new("owner", "Owner", FieldKind::Reference).required();

#[derive(Debug, Clone)]
pub struct VisualizationForm {
    data: FormData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationFields {
    pub name: String,
    pub description: String,
    /// Free text such as "scatter" or "heatmap"; never interpreted.
    pub visualization_type: String,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
}

impl VisualizationForm {
    pub const FIELDS: &'static [FieldSpec] =
        &[NAME, DESCRIPTION, VISUALIZATION_TYPE, DATASET, OWNER];

    pub fn bind(data: &FormData) -> Self {
        Self {
            data: data.restrict(Self::FIELDS),
        }
    }

    pub fn initial(visualization: &Visualization) -> FormData {
        FormData::new()
            .with(NAME.name, visualization.name.as_str())
            .with(DESCRIPTION.name, visualization.description.as_str())
            .with(
                VISUALIZATION_TYPE.name,
                visualization.visualization_type.as_str(),
            )
            .with(DATASET.name, visualization.dataset_id.to_string())
            .with(OWNER.name, visualization.owner_id.to_string())
    }

    pub async fn validate(&self, store: &dyn CatalogStore) -> CatalogResult<VisualizationFields> {
        let mut cleaner = Cleaner::new(&self.data);
        let name = cleaner.text(&NAME);
        let description = cleaner.text(&DESCRIPTION);
        let visualization_type = cleaner.text(&VISUALIZATION_TYPE);
        let dataset_id = cleaner.reference(&DATASET);
        let owner_id = cleaner.reference(&OWNER);

        resolve_references(&mut cleaner, store, (&DATASET, dataset_id), (&OWNER, owner_id))
            .await?;

        let errors = cleaner.finish();
        match (dataset_id, owner_id) {
            (Some(dataset_id), Some(owner_id)) if errors.is_empty() => Ok(VisualizationFields {
                name,
                description,
                visualization_type,
                dataset_id,
                owner_id,
            }),
            _ => Err(errors.into()),
        }
    }
}

impl VisualizationFields {
    pub fn build(self) -> Visualization {
        Visualization::new(
            self.name,
            self.description,
            self.visualization_type,
            self.dataset_id,
            self.owner_id,
        )
    }

    pub fn apply_to(self, visualization: &mut Visualization) {
        visualization.name = self.name;
        visualization.description = self.description;
        visualization.visualization_type = self.visualization_type;
        visualization.dataset_id = self.dataset_id;
        visualization.owner_id = self.owner_id;
    }
}
