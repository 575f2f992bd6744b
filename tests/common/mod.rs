#![allow(dead_code)]

use std::sync::{Arc, Once};

use research_catalog::catalog::Account;
use research_catalog::config::CatalogConfig;
use research_catalog::forms::FormData;
use research_catalog::{CatalogManager, CatalogStore};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

pub const PASSWORD: &str = "tundra-Orbit-58";

/// Manager with a cheap hash setting so tests stay fast.
pub fn manager(store: Arc<dyn CatalogStore>) -> CatalogManager {
    let config = CatalogConfig {
        password_iterations: 16,
        ..CatalogConfig::default()
    };
    CatalogManager::from_config(store, &config)
}

pub fn registration(username: &str, institution: &str) -> FormData {
    FormData::new()
        .with("username", username)
        .with("email", format!("{}@example.org", username))
        .with("first_name", "Test")
        .with("last_name", "Researcher")
        .with("biography", "")
        .with("institution", institution)
        .with("password", PASSWORD)
        .with("password_confirmation", PASSWORD)
}

pub async fn register(manager: &CatalogManager, username: &str) -> Account {
    manager
        .register_account(&registration(username, "MIT"), true)
        .await
        .expect("registration should succeed")
}

pub fn dataset_form(name: &str) -> FormData {
    FormData::new()
        .with("name", name)
        .with("description", "collected in the field")
}

pub fn analysis_form(name: &str, dataset: impl ToString, owner: impl ToString) -> FormData {
    FormData::new()
        .with("name", name)
        .with("description", "")
        .with("dataset", dataset.to_string())
        .with("owner", owner.to_string())
}

pub fn visualization_form(
    name: &str,
    kind: &str,
    dataset: impl ToString,
    owner: impl ToString,
) -> FormData {
    analysis_form(name, dataset, owner).with("visualization_type", kind)
}
