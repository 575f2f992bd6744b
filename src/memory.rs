//! In-memory catalog store, used in tests and for embedding without a
//! database.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::catalog::{touch, Account, Analysis, Dataset, DeletionSummary, Visualization};
use crate::error::{CatalogError, CatalogResult};
use crate::store::{sort_accounts, AttachmentFilter, CatalogStore, DatasetFilter};

// Locks are always taken in field order to keep cascades deadlock free.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalogStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
    datasets: Arc<RwLock<HashMap<Uuid, Dataset>>>,
    analyses: Arc<RwLock<HashMap<Uuid, Analysis>>>,
    visualizations: Arc<RwLock<HashMap<Uuid, Visualization>>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut records: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    records.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    records
}

fn require_owner(accounts: &HashMap<Uuid, Account>, owner_id: Uuid) -> CatalogResult<()> {
    if accounts.contains_key(&owner_id) {
        Ok(())
    } else {
        Err(CatalogError::not_found("Account", owner_id))
    }
}

fn require_dataset(datasets: &HashMap<Uuid, Dataset>, dataset_id: Uuid) -> CatalogResult<()> {
    if datasets.contains_key(&dataset_id) {
        Ok(())
    } else {
        Err(CatalogError::not_found("Dataset", dataset_id))
    }
}

/// Removes analyses and visualizations matching `doomed`, returning how many
/// of each were dropped.
fn cascade_attachments(
    analyses: &mut HashMap<Uuid, Analysis>,
    visualizations: &mut HashMap<Uuid, Visualization>,
    doomed: impl Fn(Uuid, Uuid) -> bool,
) -> (usize, usize) {
    let analyses_before = analyses.len();
    analyses.retain(|_, a| !doomed(a.dataset_id, a.owner_id));
    let visualizations_before = visualizations.len();
    visualizations.retain(|_, v| !doomed(v.dataset_id, v.owner_id));
    (
        analyses_before - analyses.len(),
        visualizations_before - visualizations.len(),
    )
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    // =========================================================================
    // Account operations
    // =========================================================================

    async fn create_account(&self, account: Account) -> CatalogResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(CatalogError::already_exists("Account", account.id));
        }
        let username = account.username().to_lowercase();
        if accounts
            .values()
            .any(|a| a.username().to_lowercase() == username)
        {
            return Err(CatalogError::already_exists("Account", account.username()));
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: Uuid) -> CatalogResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> CatalogResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        let username = username.to_lowercase();
        Ok(accounts
            .values()
            .find(|a| a.username().to_lowercase() == username)
            .cloned())
    }

    async fn list_accounts(&self) -> CatalogResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut result: Vec<Account> = accounts.values().cloned().collect();
        sort_accounts(&mut result);
        Ok(result)
    }

    async fn update_account(&self, account: Account) -> CatalogResult<Account> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(CatalogError::not_found("Account", account.id));
        }
        let username = account.username().to_lowercase();
        if accounts
            .values()
            .any(|a| a.id != account.id && a.username().to_lowercase() == username)
        {
            return Err(CatalogError::already_exists("Account", account.username()));
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn delete_account(&self, id: Uuid) -> CatalogResult<DeletionSummary> {
        let mut accounts = self.accounts.write().await;
        let mut datasets = self.datasets.write().await;
        let mut analyses = self.analyses.write().await;
        let mut visualizations = self.visualizations.write().await;

        if accounts.remove(&id).is_none() {
            return Err(CatalogError::not_found("Account", id));
        }

        let owned: HashSet<Uuid> = datasets
            .values()
            .filter(|d| d.owner_id == id)
            .map(|d| d.id)
            .collect();
        datasets.retain(|dataset_id, _| !owned.contains(dataset_id));

        let (analyses_removed, visualizations_removed) =
            cascade_attachments(&mut analyses, &mut visualizations, |dataset_id, owner_id| {
                owner_id == id || owned.contains(&dataset_id)
            });

        let summary = DeletionSummary {
            accounts: 1,
            datasets: owned.len(),
            analyses: analyses_removed,
            visualizations: visualizations_removed,
        };
        debug!("Cascade from account {}: {:?}", id, summary);
        Ok(summary)
    }

    // =========================================================================
    // Dataset operations
    // =========================================================================

    async fn create_dataset(&self, dataset: Dataset) -> CatalogResult<Dataset> {
        let accounts = self.accounts.read().await;
        let mut datasets = self.datasets.write().await;
        require_owner(&accounts, dataset.owner_id)?;
        if datasets.contains_key(&dataset.id) {
            return Err(CatalogError::already_exists("Dataset", dataset.id));
        }
        datasets.insert(dataset.id, dataset.clone());
        Ok(dataset)
    }

    async fn get_dataset(&self, id: Uuid) -> CatalogResult<Option<Dataset>> {
        let datasets = self.datasets.read().await;
        Ok(datasets.get(&id).cloned())
    }

    async fn list_datasets(&self, filter: DatasetFilter) -> CatalogResult<Vec<Dataset>> {
        let datasets = self.datasets.read().await;
        let result: Vec<Dataset> = datasets
            .values()
            .filter(|d| filter.owner_id.map_or(true, |owner| d.owner_id == owner))
            .cloned()
            .collect();
        Ok(newest_first(result, |d| d.created_at))
    }

    async fn update_dataset(&self, dataset: Dataset) -> CatalogResult<Dataset> {
        let mut datasets = self.datasets.write().await;
        let stored = datasets
            .get_mut(&dataset.id)
            .ok_or_else(|| CatalogError::not_found("Dataset", dataset.id))?;
        stored.name = dataset.name;
        stored.description = dataset.description;
        stored.updated_at = touch(stored.updated_at);
        Ok(stored.clone())
    }

    async fn delete_dataset(&self, id: Uuid) -> CatalogResult<DeletionSummary> {
        let mut datasets = self.datasets.write().await;
        let mut analyses = self.analyses.write().await;
        let mut visualizations = self.visualizations.write().await;

        if datasets.remove(&id).is_none() {
            return Err(CatalogError::not_found("Dataset", id));
        }

        let (analyses_removed, visualizations_removed) =
            cascade_attachments(&mut analyses, &mut visualizations, |dataset_id, _| {
                dataset_id == id
            });

        Ok(DeletionSummary {
            accounts: 0,
            datasets: 1,
            analyses: analyses_removed,
            visualizations: visualizations_removed,
        })
    }

    // =========================================================================
    // Analysis operations
    // =========================================================================

    async fn create_analysis(&self, analysis: Analysis) -> CatalogResult<Analysis> {
        let accounts = self.accounts.read().await;
        let datasets = self.datasets.read().await;
        let mut analyses = self.analyses.write().await;
        require_dataset(&datasets, analysis.dataset_id)?;
        require_owner(&accounts, analysis.owner_id)?;
        if analyses.contains_key(&analysis.id) {
            return Err(CatalogError::already_exists("Analysis", analysis.id));
        }
        analyses.insert(analysis.id, analysis.clone());
        Ok(analysis)
    }

    async fn get_analysis(&self, id: Uuid) -> CatalogResult<Option<Analysis>> {
        let analyses = self.analyses.read().await;
        Ok(analyses.get(&id).cloned())
    }

    async fn list_analyses(&self, filter: AttachmentFilter) -> CatalogResult<Vec<Analysis>> {
        let analyses = self.analyses.read().await;
        let result: Vec<Analysis> = analyses
            .values()
            .filter(|a| filter.matches(a.dataset_id, a.owner_id))
            .cloned()
            .collect();
        Ok(newest_first(result, |a| a.created_at))
    }

    async fn update_analysis(&self, analysis: Analysis) -> CatalogResult<Analysis> {
        let accounts = self.accounts.read().await;
        let datasets = self.datasets.read().await;
        let mut analyses = self.analyses.write().await;
        require_dataset(&datasets, analysis.dataset_id)?;
        require_owner(&accounts, analysis.owner_id)?;
        let stored = analyses
            .get_mut(&analysis.id)
            .ok_or_else(|| CatalogError::not_found("Analysis", analysis.id))?;
        stored.name = analysis.name;
        stored.description = analysis.description;
        stored.dataset_id = analysis.dataset_id;
        stored.owner_id = analysis.owner_id;
        stored.updated_at = touch(stored.updated_at);
        Ok(stored.clone())
    }

    async fn delete_analysis(&self, id: Uuid) -> CatalogResult<()> {
        let mut analyses = self.analyses.write().await;
        if analyses.remove(&id).is_none() {
            return Err(CatalogError::not_found("Analysis", id));
        }
        Ok(())
    }

    // =========================================================================
    // Visualization operations
    // =========================================================================

    async fn create_visualization(
        &self,
        visualization: Visualization,
    ) -> CatalogResult<Visualization> {
        let accounts = self.accounts.read().await;
        let datasets = self.datasets.read().await;
        let mut visualizations = self.visualizations.write().await;
        require_dataset(&datasets, visualization.dataset_id)?;
        require_owner(&accounts, visualization.owner_id)?;
        if visualizations.contains_key(&visualization.id) {
            return Err(CatalogError::already_exists(
                "Visualization",
                visualization.id,
            ));
        }
        visualizations.insert(visualization.id, visualization.clone());
        Ok(visualization)
    }

    async fn get_visualization(&self, id: Uuid) -> CatalogResult<Option<Visualization>> {
        let visualizations = self.visualizations.read().await;
        Ok(visualizations.get(&id).cloned())
    }

    async fn list_visualizations(
        &self,
        filter: AttachmentFilter,
    ) -> CatalogResult<Vec<Visualization>> {
        let visualizations = self.visualizations.read().await;
        let result: Vec<Visualization> = visualizations
            .values()
            .filter(|v| filter.matches(v.dataset_id, v.owner_id))
            .cloned()
            .collect();
        Ok(newest_first(result, |v| v.created_at))
    }

    async fn update_visualization(
        &self,
        visualization: Visualization,
    ) -> CatalogResult<Visualization> {
        let accounts = self.accounts.read().await;
        let datasets = self.datasets.read().await;
        let mut visualizations = self.visualizations.write().await;
        require_dataset(&datasets, visualization.dataset_id)?;
        require_owner(&accounts, visualization.owner_id)?;
        let stored = visualizations
            .get_mut(&visualization.id)
            .ok_or_else(|| CatalogError::not_found("Visualization", visualization.id))?;
        stored.name = visualization.name;
        stored.description = visualization.description;
        stored.visualization_type = visualization.visualization_type;
        stored.dataset_id = visualization.dataset_id;
        stored.owner_id = visualization.owner_id;
        stored.updated_at = touch(stored.updated_at);
        Ok(stored.clone())
    }

    async fn delete_visualization(&self, id: Uuid) -> CatalogResult<()> {
        let mut visualizations = self.visualizations.write().await;
        if visualizations.remove(&id).is_none() {
            return Err(CatalogError::not_found("Visualization", id));
        }
        Ok(())
    }
}
