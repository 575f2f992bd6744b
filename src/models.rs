use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::catalog::{Account, Analysis, Credential, Dataset, Profile, Visualization};
use crate::schema::{accounts, analyses, datasets, visualizations};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountModel {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub biography: String,
    pub institution: String,
}

#[derive(Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub biography: &'a str,
    pub institution: &'a str,
}

#[derive(AsChangeset)]
#[diesel(table_name = accounts)]
#[diesel(treat_none_as_null = true)]
pub struct AccountChanges<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub biography: &'a str,
    pub institution: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = datasets)]
#[diesel(belongs_to(AccountModel, foreign_key = owner_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DatasetModel {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = datasets)]
pub struct NewDataset<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns an update may touch; owner and created_at are fixed at insert.
#[derive(AsChangeset)]
#[diesel(table_name = datasets)]
pub struct DatasetChanges<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = analyses)]
#[diesel(belongs_to(DatasetModel, foreign_key = dataset_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AnalysisModel {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = analyses)]
pub struct NewAnalysis<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = analyses)]
pub struct AnalysisChanges<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = visualizations)]
#[diesel(belongs_to(DatasetModel, foreign_key = dataset_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VisualizationModel {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub visualization_type: String,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = visualizations)]
pub struct NewVisualization<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
    pub visualization_type: &'a str,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = visualizations)]
pub struct VisualizationChanges<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub visualization_type: &'a str,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Account> for NewAccount<'a> {
    fn from(account: &'a Account) -> Self {
        let credential = &account.credential;
        NewAccount {
            id: account.id,
            username: &credential.username,
            email: &credential.email,
            first_name: &credential.first_name,
            last_name: &credential.last_name,
            password_hash: &credential.password_hash,
            is_active: credential.is_active,
            date_joined: credential.date_joined,
            last_login: credential.last_login,
            biography: &account.profile.biography,
            institution: &account.profile.institution,
        }
    }
}

impl<'a> From<&'a Account> for AccountChanges<'a> {
    fn from(account: &'a Account) -> Self {
        let credential = &account.credential;
        AccountChanges {
            username: &credential.username,
            email: &credential.email,
            first_name: &credential.first_name,
            last_name: &credential.last_name,
            password_hash: &credential.password_hash,
            is_active: credential.is_active,
            last_login: credential.last_login,
            biography: &account.profile.biography,
            institution: &account.profile.institution,
        }
    }
}

impl<'a> From<&'a Dataset> for NewDataset<'a> {
    fn from(dataset: &'a Dataset) -> Self {
        NewDataset {
            id: dataset.id,
            name: &dataset.name,
            description: &dataset.description,
            owner_id: dataset.owner_id,
            created_at: dataset.created_at,
            updated_at: dataset.updated_at,
        }
    }
}

impl<'a> From<&'a Analysis> for NewAnalysis<'a> {
    fn from(analysis: &'a Analysis) -> Self {
        NewAnalysis {
            id: analysis.id,
            name: &analysis.name,
            description: &analysis.description,
            dataset_id: analysis.dataset_id,
            owner_id: analysis.owner_id,
            created_at: analysis.created_at,
            updated_at: analysis.updated_at,
        }
    }
}

impl<'a> From<&'a Visualization> for NewVisualization<'a> {
    fn from(visualization: &'a Visualization) -> Self {
        NewVisualization {
            id: visualization.id,
            name: &visualization.name,
            description: &visualization.description,
            visualization_type: &visualization.visualization_type,
            dataset_id: visualization.dataset_id,
            owner_id: visualization.owner_id,
            created_at: visualization.created_at,
            updated_at: visualization.updated_at,
        }
    }
}

impl From<AccountModel> for Account {
    fn from(model: AccountModel) -> Self {
        Account {
            id: model.id,
            credential: Credential {
                username: model.username,
                email: model.email,
                first_name: model.first_name,
                last_name: model.last_name,
                password_hash: model.password_hash,
                is_active: model.is_active,
                date_joined: model.date_joined,
                last_login: model.last_login,
            },
            profile: Profile {
                biography: model.biography,
                institution: model.institution,
            },
        }
    }
}

impl From<DatasetModel> for Dataset {
    fn from(model: DatasetModel) -> Self {
        Dataset {
            id: model.id,
            name: model.name,
            description: model.description,
            owner_id: model.owner_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<AnalysisModel> for Analysis {
    fn from(model: AnalysisModel) -> Self {
        Analysis {
            id: model.id,
            name: model.name,
            description: model.description,
            dataset_id: model.dataset_id,
            owner_id: model.owner_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<VisualizationModel> for Visualization {
    fn from(model: VisualizationModel) -> Self {
        Visualization {
            id: model.id,
            name: model.name,
            description: model.description,
            visualization_type: model.visualization_type,
            dataset_id: model.dataset_id,
            owner_id: model.owner_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
