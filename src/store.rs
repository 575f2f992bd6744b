//! Storage abstraction for catalog records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{Account, Analysis, Dataset, DeletionSummary, Visualization};
use crate::error::CatalogResult;

/// Filter options for listing datasets.
#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
    /// Only datasets owned by this account.
    pub owner_id: Option<Uuid>,
}

impl DatasetFilter {
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
        }
    }
}

/// Filter options for listing analyses and visualizations.
#[derive(Debug, Clone, Default)]
pub struct AttachmentFilter {
    pub dataset_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

impl AttachmentFilter {
    pub fn for_dataset(dataset_id: Uuid) -> Self {
        Self {
            dataset_id: Some(dataset_id),
            owner_id: None,
        }
    }

    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            dataset_id: None,
            owner_id: Some(owner_id),
        }
    }

    pub(crate) fn matches(&self, dataset_id: Uuid, owner_id: Uuid) -> bool {
        self.dataset_id.map_or(true, |id| id == dataset_id)
            && self.owner_id.map_or(true, |id| id == owner_id)
    }
}

/// Account listing order shared by every store: case-folded username, then
/// the username itself. Independent of database collation.
pub(crate) fn sort_accounts(accounts: &mut [Account]) {
    accounts.sort_by_cached_key(|account| {
        (
            account.username().to_lowercase(),
            account.username().to_string(),
        )
    });
}

/// Persistence for accounts, datasets, analyses and visualizations.
///
/// Implementations must:
/// - reject records whose owner or dataset reference does not exist;
/// - keep `created_at` as first stored and set `updated_at` on every update,
///   strictly later than the previous value;
/// - cascade deletes from accounts and datasets to their dependents.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Account operations
    // =========================================================================

    /// Stores a new account. Fails with `AlreadyExists` when the username is
    /// taken, compared case-insensitively.
    async fn create_account(&self, account: Account) -> CatalogResult<Account>;

    async fn get_account(&self, id: Uuid) -> CatalogResult<Option<Account>>;

    /// Case-insensitive username lookup.
    async fn find_account_by_username(&self, username: &str) -> CatalogResult<Option<Account>>;

    /// All accounts ordered by username.
    /// All accounts, ordered by username ignoring case.
    async fn list_accounts(&self) -> CatalogResult<Vec<Account>>;

    async fn update_account(&self, account: Account) -> CatalogResult<Account>;

    /// Deletes an account together with everything it owns and every
    /// analysis or visualization attached to its datasets.
    async fn delete_account(&self, id: Uuid) -> CatalogResult<DeletionSummary>;

    // =========================================================================
    // Dataset operations
    // =========================================================================

    async fn create_dataset(&self, dataset: Dataset) -> CatalogResult<Dataset>;

    async fn get_dataset(&self, id: Uuid) -> CatalogResult<Option<Dataset>>;

    /// Datasets matching `filter`, newest first.
    async fn list_datasets(&self, filter: DatasetFilter) -> CatalogResult<Vec<Dataset>>;

    /// Persists name and description. Ownership never changes on update.
    async fn update_dataset(&self, dataset: Dataset) -> CatalogResult<Dataset>;

    /// Deletes a dataset together with its analyses and visualizations.
    async fn delete_dataset(&self, id: Uuid) -> CatalogResult<DeletionSummary>;

    // =========================================================================
    // Analysis operations
    // =========================================================================

    async fn create_analysis(&self, analysis: Analysis) -> CatalogResult<Analysis>;

    async fn get_analysis(&self, id: Uuid) -> CatalogResult<Option<Analysis>>;

    async fn list_analyses(&self, filter: AttachmentFilter) -> CatalogResult<Vec<Analysis>>;

    async fn update_analysis(&self, analysis: Analysis) -> CatalogResult<Analysis>;

    async fn delete_analysis(&self, id: Uuid) -> CatalogResult<()>;

    // =========================================================================
    // Visualization operations
    // =========================================================================

    async fn create_visualization(
        &self,
        visualization: Visualization,
    ) -> CatalogResult<Visualization>;

    async fn get_visualization(&self, id: Uuid) -> CatalogResult<Option<Visualization>>;

    async fn list_visualizations(
        &self,
        filter: AttachmentFilter,
    ) -> CatalogResult<Vec<Visualization>>;

    async fn update_visualization(
        &self,
        visualization: Visualization,
    ) -> CatalogResult<Visualization>;

    async fn delete_visualization(&self, id: Uuid) -> CatalogResult<()>;
}
