use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{now, Account, Analysis, Dataset, DeletionSummary, Visualization};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::forms::{AnalysisForm, DatasetForm, FormData, RegistrationForm, VisualizationForm};
use crate::password::{PasswordHasher, PasswordPolicy};
use crate::store::{AttachmentFilter, CatalogStore, DatasetFilter};

/// Entry point for the host request layer: binds submitted fields to the
/// matching form and persists the outcome.
pub struct CatalogManager {
    store: Arc<dyn CatalogStore>,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    /// Verified against when the username is unknown, so failed logins cost
    /// the same whether or not the account exists.
    decoy_hash: String,
}

fn log_rejection<T>(form: &str, result: CatalogResult<T>) -> CatalogResult<T> {
    if let Err(CatalogError::Validation(errors)) = &result {
        warn!("{} submission rejected: {}", form, errors);
    }
    result
}

impl CatalogManager {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self::with_password_settings(store, PasswordHasher::default(), PasswordPolicy::default())
    }

    pub fn from_config(store: Arc<dyn CatalogStore>, config: &CatalogConfig) -> Self {
        Self::with_password_settings(store, config.password_hasher(), config.password_policy())
    }

    fn with_password_settings(
        store: Arc<dyn CatalogStore>,
        hasher: PasswordHasher,
        policy: PasswordPolicy,
    ) -> Self {
        Self {
            store,
            decoy_hash: hasher.hash(&Uuid::new_v4().to_string()),
            hasher,
            policy,
        }
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    pub fn password_hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Validates a sign-up submission and builds the account. The account is
    /// stored only when `commit` is set; otherwise the caller gets the
    /// unsaved account back and may persist it later with
    /// `CatalogStore::create_account`.
    pub async fn register_account(&self, data: &FormData, commit: bool) -> CatalogResult<Account> {
        let form = RegistrationForm::bind(data).with_policy(self.policy);
        let registration = log_rejection("Registration", form.validate(self.store()).await)?;
        let account = registration.build(&self.hasher);

        if !commit {
            return Ok(account);
        }

        let account = self.store.create_account(account).await?;
        info!("Registered account {} ({})", account, account.id);
        Ok(account)
    }

    /// Returns the account when `password` matches and the account is active,
    /// recording the login time.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> CatalogResult<Option<Account>> {
        let Some(mut account) = self.store.find_account_by_username(username).await? else {
            self.hasher.verify(password, &self.decoy_hash)?;
            warn!("Failed login for {}", username);
            return Ok(None);
        };

        let verified = self
            .hasher
            .verify(password, &account.credential.password_hash)?;
        if !verified || !account.credential.is_active {
            warn!("Failed login for {}", username);
            return Ok(None);
        }

        account.credential.last_login = Some(now());
        let account = self.store.update_account(account).await?;
        info!("Account {} logged in", account);
        Ok(Some(account))
    }

    pub async fn get_account(&self, id: Uuid) -> CatalogResult<Account> {
        self.store
            .get_account(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Account", id))
    }

    pub async fn list_accounts(&self) -> CatalogResult<Vec<Account>> {
        self.store.list_accounts().await
    }

    pub async fn delete_account(&self, id: Uuid) -> CatalogResult<DeletionSummary> {
        let summary = self.store.delete_account(id).await?;
        info!(
            "Deleted account {} with {} datasets, {} analyses, {} visualizations",
            id, summary.datasets, summary.analyses, summary.visualizations
        );
        Ok(summary)
    }

    // =========================================================================
    // Datasets
    // =========================================================================

    /// Creates a dataset owned by `owner_id`. Ownership always comes from the
    /// caller, never from the submission.
    pub async fn create_dataset(&self, owner_id: Uuid, data: &FormData) -> CatalogResult<Dataset> {
        let fields = log_rejection("Dataset", DatasetForm::bind(data).validate())?;
        let owner = self.get_account(owner_id).await?;

        let dataset = self.store.create_dataset(fields.build(owner.id)).await?;
        info!("Created dataset {} for {}", dataset.id, owner);
        Ok(dataset)
    }

    pub async fn update_dataset(&self, id: Uuid, data: &FormData) -> CatalogResult<Dataset> {
        let mut dataset = self.get_dataset(id).await?;
        let fields = log_rejection("Dataset", DatasetForm::bind(data).validate())?;

        fields.apply_to(&mut dataset);
        let dataset = self.store.update_dataset(dataset).await?;
        info!("Updated dataset {}", dataset.id);
        Ok(dataset)
    }

    pub async fn get_dataset(&self, id: Uuid) -> CatalogResult<Dataset> {
        self.store
            .get_dataset(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Dataset", id))
    }

    pub async fn list_datasets(&self, filter: DatasetFilter) -> CatalogResult<Vec<Dataset>> {
        self.store.list_datasets(filter).await
    }

    pub async fn delete_dataset(&self, id: Uuid) -> CatalogResult<DeletionSummary> {
        let summary = self.store.delete_dataset(id).await?;
        info!(
            "Deleted dataset {} with {} analyses, {} visualizations",
            id, summary.analyses, summary.visualizations
        );
        Ok(summary)
    }

    // =========================================================================
    // Analyses
    // =========================================================================

    pub async fn create_analysis(&self, data: &FormData) -> CatalogResult<Analysis> {
        let form = AnalysisForm::bind(data);
        let fields = log_rejection("Analysis", form.validate(self.store()).await)?;

        let analysis = self.store.create_analysis(fields.build()).await?;
        info!(
            "Created analysis {} on dataset {}",
            analysis.id, analysis.dataset_id
        );
        Ok(analysis)
    }

    pub async fn update_analysis(&self, id: Uuid, data: &FormData) -> CatalogResult<Analysis> {
        let mut analysis = self.get_analysis(id).await?;
        let form = AnalysisForm::bind(data);
        let fields = log_rejection("Analysis", form.validate(self.store()).await)?;

        fields.apply_to(&mut analysis);
        let analysis = self.store.update_analysis(analysis).await?;
        info!(
            "Updated analysis {} on dataset {}",
            analysis.id, analysis.dataset_id
        );
        Ok(analysis)
    }

    pub async fn get_analysis(&self, id: Uuid) -> CatalogResult<Analysis> {
        self.store
            .get_analysis(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Analysis", id))
    }

    pub async fn list_analyses(&self, filter: AttachmentFilter) -> CatalogResult<Vec<Analysis>> {
        self.store.list_analyses(filter).await
    }

    pub async fn delete_analysis(&self, id: Uuid) -> CatalogResult<()> {
        self.store.delete_analysis(id).await?;
        info!("Deleted analysis {}", id);
        Ok(())
    }

    // =========================================================================
    // Visualizations
    // =========================================================================

    pub async fn create_visualization(&self, data: &FormData) -> CatalogResult<Visualization> {
        let form = VisualizationForm::bind(data);
        let fields = log_rejection("Visualization", form.validate(self.store()).await)?;

        let visualization = self.store.create_visualization(fields.build()).await?;
        info!(
            "Created visualization {} on dataset {}",
            visualization.id, visualization.dataset_id
        );
        Ok(visualization)
    }

    pub async fn update_visualization(
        &self,
        id: Uuid,
        data: &FormData,
    ) -> CatalogResult<Visualization> {
        let mut visualization = self.get_visualization(id).await?;
        let form = VisualizationForm::bind(data);
        let fields = log_rejection("Visualization", form.validate(self.store()).await)?;

        fields.apply_to(&mut visualization);
        let visualization = self.store.update_visualization(visualization).await?;
        info!(
            "Updated visualization {} on dataset {}",
            visualization.id, visualization.dataset_id
        );
        Ok(visualization)
    }

    pub async fn get_visualization(&self, id: Uuid) -> CatalogResult<Visualization> {
        self.store
            .get_visualization(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Visualization", id))
    }

    pub async fn list_visualizations(
        &self,
        filter: AttachmentFilter,
    ) -> CatalogResult<Vec<Visualization>> {
        self.store.list_visualizations(filter).await
    }

    pub async fn delete_visualization(&self, id: Uuid) -> CatalogResult<()> {
        self.store.delete_visualization(id).await?;
        info!("Deleted visualization {}", id);
        Ok(())
    }
}
