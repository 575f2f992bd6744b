use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Text;
use diesel_async::{
    async_connection_wrapper::AsyncConnectionWrapper,
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{touch, Account, Analysis, Dataset, DeletionSummary, Visualization};
use crate::config::DEFAULT_POOL_SIZE;
use crate::error::{CatalogError, CatalogResult};
use crate::models::*;
use crate::schema::{accounts, analyses, datasets, visualizations};
use crate::store::{sort_accounts, AttachmentFilter, CatalogStore, DatasetFilter};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

diesel::define_sql_function!(fn lower(x: Text) -> Text);

/// PostgreSQL-backed catalog store. Cascades are enforced by the
/// `ON DELETE CASCADE` foreign keys in the schema.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<AsyncPgConnection>,
}

/// Maps insert/update failures to catalog errors, keeping uniqueness and
/// foreign key violations distinguishable from opaque database errors.
fn write_error(entity: &'static str, key: String) -> impl FnOnce(DieselError) -> CatalogError {
    move |err| match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            CatalogError::already_exists(entity, key)
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            let referenced = if info
                .constraint_name()
                .is_some_and(|name| name.contains("dataset_id"))
            {
                "Dataset"
            } else {
                "Account"
            };
            CatalogError::NotFound {
                entity: referenced,
                id: info.message().to_string(),
            }
        }
        other => CatalogError::database(&format!("Failed to write {} {}", entity, key), other),
    }
}

impl DatabaseManager {
    pub async fn new(database_url: &str) -> CatalogResult<Self> {
        Self::with_pool_size(database_url, DEFAULT_POOL_SIZE).await
    }

    pub async fn with_pool_size(database_url: &str, max_size: usize) -> CatalogResult<Self> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config)
            .max_size(max_size)
            .build()
            .map_err(|e| CatalogError::ConfigError {
                message: format!("Failed to create database pool: {}", e),
            })?;

        let manager = Self { pool };
        manager.run_migrations(database_url).await?;

        Ok(manager)
    }

    pub async fn run_migrations(&self, database_url: &str) -> CatalogResult<()> {
        // diesel_migrations is synchronous; the wrapper drives the async
        // connection from a blocking thread.
        let database_url = database_url.to_string();
        tokio::task::spawn_blocking(move || -> CatalogResult<()> {
            let mut connection =
                <AsyncConnectionWrapper<AsyncPgConnection> as diesel::Connection>::establish(
                    &database_url,
                )
                .map_err(|e| CatalogError::ConfigError {
                    message: format!("Failed to establish connection for migrations: {}", e),
                })?;

            let applied = connection
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| CatalogError::ConfigError {
                    message: format!("Failed to run migrations: {}", e),
                })?;

            info!("Applied {} pending migrations", applied.len());
            Ok(())
        })
        .await
        .map_err(|e| CatalogError::InternalError {
            message: format!("Migration task failed: {}", e),
        })?
    }

    async fn connection(&self) -> CatalogResult<Object<AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|e| CatalogError::ConfigError {
                message: format!("Failed to get database connection: {}", e),
            })
    }
}

#[async_trait]
impl CatalogStore for DatabaseManager {
    // =========================================================================
    // Account operations
    // =========================================================================

    async fn create_account(&self, account: Account) -> CatalogResult<Account> {
        info!("Adding account {} to catalog", account.username());
        let mut conn = self.connection().await?;

        let model = diesel::insert_into(accounts::table)
            .values(NewAccount::from(&account))
            .returning(AccountModel::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(write_error("Account", account.username().to_string()))?;

        Ok(model.into())
    }

    async fn get_account(&self, id: Uuid) -> CatalogResult<Option<Account>> {
        let mut conn = self.connection().await?;

        let model = accounts::table
            .find(id)
            .select(AccountModel::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| CatalogError::database("Failed to fetch account", e))?;

        Ok(model.map(Into::into))
    }

    async fn find_account_by_username(&self, username: &str) -> CatalogResult<Option<Account>> {
        debug!("Looking up account by username {}", username);
        let mut conn = self.connection().await?;

        let model = accounts::table
            .filter(lower(accounts::username).eq(username.to_lowercase()))
            .select(AccountModel::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| CatalogError::database("Failed to fetch account", e))?;

        Ok(model.map(Into::into))
    }

    async fn list_accounts(&self) -> CatalogResult<Vec<Account>> {
        let mut conn = self.connection().await?;

        let models = accounts::table
            .select(AccountModel::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| CatalogError::database("Failed to fetch accounts", e))?;

        let mut accounts: Vec<Account> = models.into_iter().map(Into::into).collect();
        sort_accounts(&mut accounts);
        Ok(accounts)
    }

    async fn update_account(&self, account: Account) -> CatalogResult<Account> {
        let mut conn = self.connection().await?;

        let model = diesel::update(accounts::table.find(account.id))
            .set(AccountChanges::from(&account))
            .returning(AccountModel::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(write_error("Account", account.username().to_string()))?
            .ok_or_else(|| CatalogError::not_found("Account", account.id))?;

        Ok(model.into())
    }

    async fn delete_account(&self, id: Uuid) -> CatalogResult<DeletionSummary> {
        info!("Deleting account {} and everything it owns", id);
        let mut conn = self.connection().await?;

        conn.transaction::<_, CatalogError, _>(|conn| {
            Box::pin(async move {
                let owned: Vec<Uuid> = datasets::table
                    .filter(datasets::owner_id.eq(id))
                    .select(datasets::id)
                    .load(conn)
                    .await?;

                let analyses_removed: i64 = analyses::table
                    .filter(
                        analyses::owner_id
                            .eq(id)
                            .or(analyses::dataset_id.eq_any(owned.clone())),
                    )
                    .count()
                    .get_result(conn)
                    .await?;

                let visualizations_removed: i64 = visualizations::table
                    .filter(
                        visualizations::owner_id
                            .eq(id)
                            .or(visualizations::dataset_id.eq_any(owned.clone())),
                    )
                    .count()
                    .get_result(conn)
                    .await?;

                let deleted = diesel::delete(accounts::table.find(id))
                    .execute(conn)
                    .await?;
                if deleted == 0 {
                    return Err(CatalogError::not_found("Account", id));
                }

                Ok(DeletionSummary {
                    accounts: 1,
                    datasets: owned.len(),
                    analyses: analyses_removed as usize,
                    visualizations: visualizations_removed as usize,
                })
            })
        })
        .await
    }

    // =========================================================================
    // Dataset operations
    // =========================================================================

    async fn create_dataset(&self, dataset: Dataset) -> CatalogResult<Dataset> {
        info!("Adding dataset {} to catalog", dataset.name);
        let mut conn = self.connection().await?;

        let model = diesel::insert_into(datasets::table)
            .values(NewDataset::from(&dataset))
            .returning(DatasetModel::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(write_error("Dataset", dataset.id.to_string()))?;

        Ok(model.into())
    }

    async fn get_dataset(&self, id: Uuid) -> CatalogResult<Option<Dataset>> {
        let mut conn = self.connection().await?;

        let model = datasets::table
            .find(id)
            .select(DatasetModel::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| CatalogError::database("Failed to fetch dataset", e))?;

        Ok(model.map(Into::into))
    }

    async fn list_datasets(&self, filter: DatasetFilter) -> CatalogResult<Vec<Dataset>> {
        let mut conn = self.connection().await?;

        let mut query = datasets::table.into_boxed();
        if let Some(owner_id) = filter.owner_id {
            query = query.filter(datasets::owner_id.eq(owner_id));
        }

        let models = query
            .order(datasets::created_at.desc())
            .select(DatasetModel::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| CatalogError::database("Failed to fetch datasets", e))?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_dataset(&self, dataset: Dataset) -> CatalogResult<Dataset> {
        info!("Updating dataset {}", dataset.id);
        let mut conn = self.connection().await?;

        let model = conn
            .transaction::<_, CatalogError, _>(|conn| {
                Box::pin(async move {
                    let previous: DateTime<Utc> = datasets::table
                        .find(dataset.id)
                        .select(datasets::updated_at)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| CatalogError::not_found("Dataset", dataset.id))?;

                    let changes = DatasetChanges {
                        name: &dataset.name,
                        description: &dataset.description,
                        updated_at: touch(previous),
                    };

                    diesel::update(datasets::table.find(dataset.id))
                        .set(changes)
                        .returning(DatasetModel::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(write_error("Dataset", dataset.id.to_string()))
                })
            })
            .await?;

        Ok(model.into())
    }

    async fn delete_dataset(&self, id: Uuid) -> CatalogResult<DeletionSummary> {
        info!("Deleting dataset {} and its attachments", id);
        let mut conn = self.connection().await?;

        conn.transaction::<_, CatalogError, _>(|conn| {
            Box::pin(async move {
                let analyses_removed: i64 = analyses::table
                    .filter(analyses::dataset_id.eq(id))
                    .count()
                    .get_result(conn)
                    .await?;

                let visualizations_removed: i64 = visualizations::table
                    .filter(visualizations::dataset_id.eq(id))
                    .count()
                    .get_result(conn)
                    .await?;

                let deleted = diesel::delete(datasets::table.find(id))
                    .execute(conn)
                    .await?;
                if deleted == 0 {
                    return Err(CatalogError::not_found("Dataset", id));
                }

                Ok(DeletionSummary {
                    accounts: 0,
                    datasets: 1,
                    analyses: analyses_removed as usize,
                    visualizations: visualizations_removed as usize,
                })
            })
        })
        .await
    }

    // =========================================================================
    // Analysis operations
    // =========================================================================

    async fn create_analysis(&self, analysis: Analysis) -> CatalogResult<Analysis> {
        info!(
            "Adding analysis {} to dataset {}",
            analysis.name, analysis.dataset_id
        );
        let mut conn = self.connection().await?;

        let model = diesel::insert_into(analyses::table)
            .values(NewAnalysis::from(&analysis))
            .returning(AnalysisModel::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(write_error("Analysis", analysis.id.to_string()))?;

        Ok(model.into())
    }

    async fn get_analysis(&self, id: Uuid) -> CatalogResult<Option<Analysis>> {
        let mut conn = self.connection().await?;

        let model = analyses::table
            .find(id)
            .select(AnalysisModel::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| CatalogError::database("Failed to fetch analysis", e))?;

        Ok(model.map(Into::into))
    }

    async fn list_analyses(&self, filter: AttachmentFilter) -> CatalogResult<Vec<Analysis>> {
        let mut conn = self.connection().await?;

        let mut query = analyses::table.into_boxed();
        if let Some(dataset_id) = filter.dataset_id {
            query = query.filter(analyses::dataset_id.eq(dataset_id));
        }
        if let Some(owner_id) = filter.owner_id {
            query = query.filter(analyses::owner_id.eq(owner_id));
        }

        let models = query
            .order(analyses::created_at.desc())
            .select(AnalysisModel::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| CatalogError::database("Failed to fetch analyses", e))?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_analysis(&self, analysis: Analysis) -> CatalogResult<Analysis> {
        info!("Updating analysis {}", analysis.id);
        let mut conn = self.connection().await?;

        let model = conn
            .transaction::<_, CatalogError, _>(|conn| {
                Box::pin(async move {
                    let previous: DateTime<Utc> = analyses::table
                        .find(analysis.id)
                        .select(analyses::updated_at)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| CatalogError::not_found("Analysis", analysis.id))?;

                    let changes = AnalysisChanges {
                        name: &analysis.name,
                        description: &analysis.description,
                        dataset_id: analysis.dataset_id,
                        owner_id: analysis.owner_id,
                        updated_at: touch(previous),
                    };

                    diesel::update(analyses::table.find(analysis.id))
                        .set(changes)
                        .returning(AnalysisModel::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(write_error("Analysis", analysis.id.to_string()))
                })
            })
            .await?;

        Ok(model.into())
    }

    async fn delete_analysis(&self, id: Uuid) -> CatalogResult<()> {
        info!("Deleting analysis {}", id);
        let mut conn = self.connection().await?;

        let deleted = diesel::delete(analyses::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(|e| CatalogError::database("Failed to delete analysis", e))?;
        if deleted == 0 {
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
        info!(
            "Adding visualization {} to dataset {}",
            visualization.name, visualization.dataset_id
        );
        let mut conn = self.connection().await?;

        let model = diesel::insert_into(visualizations::table)
            .values(NewVisualization::from(&visualization))
            .returning(VisualizationModel::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(write_error("Visualization", visualization.id.to_string()))?;

        Ok(model.into())
    }

    async fn get_visualization(&self, id: Uuid) -> CatalogResult<Option<Visualization>> {
        let mut conn = self.connection().await?;

        let model = visualizations::table
            .find(id)
            .select(VisualizationModel::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| CatalogError::database("Failed to fetch visualization", e))?;

        Ok(model.map(Into::into))
    }

    async fn list_visualizations(
        &self,
        filter: AttachmentFilter,
    ) -> CatalogResult<Vec<Visualization>> {
        let mut conn = self.connection().await?;

        let mut query = visualizations::table.into_boxed();
        if let Some(dataset_id) = filter.dataset_id {
            query = query.filter(visualizations::dataset_id.eq(dataset_id));
        }
        if let Some(owner_id) = filter.owner_id {
            query = query.filter(visualizations::owner_id.eq(owner_id));
        }

        let models = query
            .order(visualizations::created_at.desc())
            .select(VisualizationModel::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| CatalogError::database("Failed to fetch visualizations", e))?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_visualization(
        &self,
        visualization: Visualization,
    ) -> CatalogResult<Visualization> {
        info!("Updating visualization {}", visualization.id);
        let mut conn = self.connection().await?;

        let model = conn
            .transaction::<_, CatalogError, _>(|conn| {
                Box::pin(async move {
                    let previous: DateTime<Utc> = visualizations::table
                        .find(visualization.id)
                        .select(visualizations::updated_at)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| {
                            CatalogError::not_found("Visualization", visualization.id)
                        })?;

                    let changes = VisualizationChanges {
                        name: &visualization.name,
                        description: &visualization.description,
                        visualization_type: &visualization.visualization_type,
                        dataset_id: visualization.dataset_id,
                        owner_id: visualization.owner_id,
                        updated_at: touch(previous),
                    };

                    diesel::update(visualizations::table.find(visualization.id))
                        .set(changes)
                        .returning(VisualizationModel::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(write_error("Visualization", visualization.id.to_string()))
                })
            })
            .await?;

        Ok(model.into())
    }

    async fn delete_visualization(&self, id: Uuid) -> CatalogResult<()> {
        info!("Deleting visualization {}", id);
        let mut conn = self.connection().await?;

        let deleted = diesel::delete(visualizations::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(|e| CatalogError::database("Failed to delete visualization", e))?;
        if deleted == 0 {
            return Err(CatalogError::not_found("Visualization", id));
        }
        Ok(())
    }
}
