mod common;

use std::sync::Arc;

use research_catalog::catalog::DeletionSummary;
use research_catalog::forms::{FieldError, FormData};
use research_catalog::store::{AttachmentFilter, DatasetFilter};
use research_catalog::{CatalogError, MemoryCatalogStore};
use uuid::Uuid;

use common::*;

fn memory_manager() -> research_catalog::CatalogManager {
    init_test_logging();
    manager(Arc::new(MemoryCatalogStore::new()))
}

#[tokio::test]
async fn test_account_dataset_analysis_flow() {
    let manager = memory_manager();

    // Given: alice registers with an institution and an empty biography
    let alice = manager
        .register_account(&registration("alice", "MIT"), true)
        .await
        .expect("registration should succeed");

    // When: she creates a dataset and an analysis on it
    let dataset = manager
        .create_dataset(alice.id, &dataset_form("Genome Survey"))
        .await
        .expect("dataset should be created");
    let analysis = manager
        .create_analysis(&analysis_form("PCA run", dataset.id, alice.id))
        .await
        .expect("analysis should be created");

    // Then: every back-reference resolves
    assert_eq!(dataset.owner_id, alice.id);
    assert_eq!(analysis.dataset_id, dataset.id);
    assert_eq!(analysis.owner_id, alice.id);

    let owner = manager.get_account(dataset.owner_id).await.unwrap();
    assert_eq!(owner.username(), "alice");
    assert_eq!(owner.profile.institution, "MIT");
    assert_eq!(owner.profile.biography, "");

    let referenced = manager.get_dataset(analysis.dataset_id).await.unwrap();
    assert_eq!(referenced.name, "Genome Survey");

    let attached = manager
        .list_analyses(AttachmentFilter::for_dataset(dataset.id))
        .await
        .unwrap();
    assert_eq!(attached, vec![analysis]);
}

#[tokio::test]
async fn test_registration_without_commit_is_not_persisted() {
    let manager = memory_manager();

    // When: the form is saved without commit
    let mut account = manager
        .register_account(&registration("bob", "ETH Zurich"), false)
        .await
        .unwrap();

    // Then: the account exists only in memory
    assert!(manager
        .store()
        .find_account_by_username("bob")
        .await
        .unwrap()
        .is_none());
    assert_eq!(account.profile.institution, "ETH Zurich");
    assert_ne!(account.credential.password_hash, PASSWORD);

    // And: the caller can adjust it before persisting
    account.profile.biography = "Added after validation".to_string();
    manager.store().create_account(account.clone()).await.unwrap();

    let stored = manager.get_account(account.id).await.unwrap();
    assert_eq!(stored.profile.biography, "Added after validation");
    assert!(manager
        .password_hasher()
        .verify(PASSWORD, &stored.credential.password_hash)
        .unwrap());
}

#[tokio::test]
async fn test_invalid_registration_persists_nothing() {
    let manager = memory_manager();

    let data = registration("carol", "x".repeat(256).as_str())
        .with("password_confirmation", "something-else-entirely");
    let err = manager.register_account(&data, true).await.unwrap_err();

    let errors = err.form_errors().expect("validation error");
    assert!(errors.has("institution"));
    assert_eq!(
        errors.get("password_confirmation"),
        &[FieldError::PasswordMismatch]
    );
    assert!(manager.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_updates_keep_created_at_and_advance_updated_at() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;

    let dataset = manager
        .create_dataset(alice.id, &dataset_form("Genome Survey"))
        .await
        .unwrap();
    let analysis = manager
        .create_analysis(&analysis_form("PCA run", dataset.id, alice.id))
        .await
        .unwrap();
    let visualization = manager
        .create_visualization(&visualization_form("Loadings", "scatter", dataset.id, alice.id))
        .await
        .unwrap();

    // When: each record is updated twice in quick succession
    let first = manager
        .update_dataset(dataset.id, &dataset_form("Genome Survey v2"))
        .await
        .unwrap();
    let second = manager
        .update_dataset(dataset.id, &dataset_form("Genome Survey v3"))
        .await
        .unwrap();

    // Then: created_at is fixed and updated_at strictly increases
    assert_eq!(first.created_at, dataset.created_at);
    assert_eq!(second.created_at, dataset.created_at);
    assert!(first.updated_at > dataset.updated_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.name, "Genome Survey v3");
    assert_eq!(second.owner_id, alice.id);

    let updated_analysis = manager
        .update_analysis(
            analysis.id,
            &analysis_form("PCA run (scaled)", dataset.id, alice.id),
        )
        .await
        .unwrap();
    assert_eq!(updated_analysis.created_at, analysis.created_at);
    assert!(updated_analysis.updated_at > analysis.updated_at);
    assert_eq!(updated_analysis.name, "PCA run (scaled)");

    let updated_visualization = manager
        .update_visualization(
            visualization.id,
            &visualization_form("Loadings", "heatmap", dataset.id, alice.id),
        )
        .await
        .unwrap();
    assert_eq!(updated_visualization.created_at, visualization.created_at);
    assert!(updated_visualization.updated_at > visualization.updated_at);
    assert_eq!(updated_visualization.visualization_type, "heatmap");
}

#[tokio::test]
async fn test_overlong_dataset_name_leaves_record_untouched() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;
    let dataset = manager
        .create_dataset(alice.id, &dataset_form("Genome Survey"))
        .await
        .unwrap();

    // When: the update carries a 256 character name
    let err = manager
        .update_dataset(dataset.id, &dataset_form(&"n".repeat(256)))
        .await
        .unwrap_err();

    // Then: a length error is reported and the stored record is unchanged
    assert_eq!(
        err.form_errors().unwrap().get("name"),
        &[FieldError::MaxLength {
            max: 255,
            actual: 256
        }]
    );
    assert_eq!(manager.get_dataset(dataset.id).await.unwrap(), dataset);
}

#[tokio::test]
async fn test_rejected_attachment_updates_leave_records_untouched() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;
    let dataset = manager
        .create_dataset(alice.id, &dataset_form("Genome Survey"))
        .await
        .unwrap();
    let analysis = manager
        .create_analysis(&analysis_form("PCA run", dataset.id, alice.id))
        .await
        .unwrap();
    let visualization = manager
        .create_visualization(&visualization_form("Loadings", "scatter", dataset.id, alice.id))
        .await
        .unwrap();

    // When: the analysis is moved to a dataset that does not exist
    let err = manager
        .update_analysis(analysis.id, &analysis_form("PCA rerun", Uuid::new_v4(), alice.id))
        .await
        .unwrap_err();

    // Then: the reference is rejected and the stored analysis is unchanged
    assert_eq!(
        err.form_errors().unwrap().get("dataset"),
        &[FieldError::InvalidChoice]
    );
    assert_eq!(manager.get_analysis(analysis.id).await.unwrap(), analysis);

    // When: the visualization update carries an overlong type and name
    let err = manager
        .update_visualization(
            visualization.id,
            &visualization_form(&"n".repeat(256), &"t".repeat(256), dataset.id, alice.id),
        )
        .await
        .unwrap_err();

    // Then: both length errors are reported and nothing is written
    let errors = err.form_errors().unwrap();
    let too_long = FieldError::MaxLength {
        max: 255,
        actual: 256,
    };
    assert_eq!(errors.get("name"), &[too_long.clone()]);
    assert_eq!(errors.get("visualization_type"), &[too_long]);
    assert_eq!(
        manager.get_visualization(visualization.id).await.unwrap(),
        visualization
    );
}

#[tokio::test]
async fn test_dangling_references_persist_nothing() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;
    let dataset = manager
        .create_dataset(alice.id, &dataset_form("Genome Survey"))
        .await
        .unwrap();

    let err = manager
        .create_analysis(&analysis_form("PCA run", Uuid::new_v4(), alice.id))
        .await
        .unwrap_err();
    assert_eq!(
        err.form_errors().unwrap().get("dataset"),
        &[FieldError::InvalidChoice]
    );

    let err = manager
        .create_visualization(&visualization_form(
            "Loadings",
            "scatter",
            dataset.id,
            Uuid::new_v4(),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err.form_errors().unwrap().get("owner"),
        &[FieldError::InvalidChoice]
    );

    let err = manager
        .create_analysis(&analysis_form("PCA run", "not-a-uuid", ""))
        .await
        .unwrap_err();
    let errors = err.form_errors().unwrap();
    assert_eq!(errors.get("dataset"), &[FieldError::InvalidChoice]);
    assert_eq!(errors.get("owner"), &[FieldError::Required]);

    assert!(manager
        .list_analyses(AttachmentFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(manager
        .list_visualizations(AttachmentFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_dataset_owner_comes_from_caller() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;
    let mallory = register(&manager, "mallory").await;

    let data = dataset_form("Genome Survey").with("owner", mallory.id.to_string());
    let dataset = manager.create_dataset(alice.id, &data).await.unwrap();
    assert_eq!(dataset.owner_id, alice.id);

    let err = manager
        .create_dataset(Uuid::new_v4(), &dataset_form("Orphan"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { entity: "Account", .. }));
}

#[tokio::test]
async fn test_delete_account_cascades() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;
    let bob = register(&manager, "bob").await;

    let survey = manager
        .create_dataset(alice.id, &dataset_form("Genome Survey"))
        .await
        .unwrap();
    let census = manager
        .create_dataset(bob.id, &dataset_form("Census"))
        .await
        .unwrap();
    manager
        .create_analysis(&analysis_form("PCA run", survey.id, alice.id))
        .await
        .unwrap();
    manager
        .create_visualization(&visualization_form("Map", "choropleth", census.id, alice.id))
        .await
        .unwrap();
    let kept = manager
        .create_analysis(&analysis_form("Totals", census.id, bob.id))
        .await
        .unwrap();

    // When: alice's account is deleted
    let summary = manager.delete_account(alice.id).await.unwrap();

    // Then: her dataset, analysis and visualization go with it
    assert_eq!(
        summary,
        DeletionSummary {
            accounts: 1,
            datasets: 1,
            analyses: 1,
            visualizations: 1,
        }
    );
    assert!(manager
        .list_datasets(DatasetFilter::owned_by(alice.id))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        manager
            .list_analyses(AttachmentFilter::default())
            .await
            .unwrap(),
        vec![kept]
    );
    assert!(manager
        .list_visualizations(AttachmentFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        manager.get_account(alice.id).await,
        Err(CatalogError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_dataset_cascades() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;
    let bob = register(&manager, "bob").await;
    let survey = manager
        .create_dataset(alice.id, &dataset_form("Genome Survey"))
        .await
        .unwrap();

    manager
        .create_analysis(&analysis_form("PCA run", survey.id, alice.id))
        .await
        .unwrap();
    manager
        .create_analysis(&analysis_form("Replication", survey.id, bob.id))
        .await
        .unwrap();
    manager
        .create_visualization(&visualization_form("Loadings", "", survey.id, bob.id))
        .await
        .unwrap();

    let summary = manager.delete_dataset(survey.id).await.unwrap();

    assert_eq!(summary.datasets, 1);
    assert_eq!(summary.analyses, 2);
    assert_eq!(summary.visualizations, 1);
    assert_eq!(summary.total(), 4);
    assert!(manager
        .list_analyses(AttachmentFilter::owned_by(bob.id))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(manager.list_accounts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_authenticate() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;
    assert!(alice.credential.last_login.is_none());

    let logged_in = manager
        .authenticate("ALICE", PASSWORD)
        .await
        .unwrap()
        .expect("credentials should match");
    assert_eq!(logged_in.id, alice.id);
    assert!(logged_in.credential.last_login.is_some());

    assert!(manager
        .authenticate("alice", "wrong-password")
        .await
        .unwrap()
        .is_none());
    assert!(manager
        .authenticate("nobody", PASSWORD)
        .await
        .unwrap()
        .is_none());

    let mut disabled = manager.get_account(alice.id).await.unwrap();
    disabled.credential.is_active = false;
    manager.store().update_account(disabled).await.unwrap();
    assert!(manager
        .authenticate("alice", PASSWORD)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_update_missing_record() {
    let manager = memory_manager();

    let err = manager
        .update_dataset(Uuid::new_v4(), &dataset_form("Anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { entity: "Dataset", .. }));

    let err = manager
        .update_analysis(Uuid::new_v4(), &FormData::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { entity: "Analysis", .. }));
}

#[tokio::test]
async fn test_forms_accept_json_submissions() {
    let manager = memory_manager();
    let alice = register(&manager, "alice").await;

    let data = FormData::from_json(serde_json::json!({
        "name": "Genome Survey",
        "description": null,
        "created_at": "1999-01-01T00:00:00Z",
    }))
    .unwrap();

    let dataset = manager.create_dataset(alice.id, &data).await.unwrap();
    assert_eq!(dataset.description, "");
    assert!(dataset.created_at.timestamp() > 946_684_800);
}
