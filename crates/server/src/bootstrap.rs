use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use bookdesk_agent::conversation::ConversationDriver;
use bookdesk_agent::llm::OpenAiChatModel;
use bookdesk_core::catalog::CatalogStore;
use bookdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use bookdesk_core::domain::book::Book;
use bookdesk_core::ledger::ReservationLedger;
use bookdesk_core::notify::Notifier;
use bookdesk_core::reserve::ReservationService;
use thiserror::Error;
use tracing::info;

use crate::notify::NotificationFanout;
use crate::{books, chat, health, reserve};

pub struct Application {
    pub config: AppConfig,
    pub catalog: Arc<CatalogStore>,
    pub ledger: Arc<ReservationLedger>,
    pub reservations: Arc<ReservationService>,
    pub notifier: Arc<dyn Notifier>,
    pub driver: Arc<ConversationDriver>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not read catalog seed `{path}`: {source}")]
    SeedRead { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog seed `{path}`: {source}")]
    SeedParse { path: PathBuf, source: serde_json::Error },
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let catalog = Arc::new(load_catalog(&config)?);
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        book_count = catalog.len(),
        seeded_from_file = config.catalog.seed_path.is_some(),
        "catalog loaded"
    );

    let ledger = Arc::new(ReservationLedger::new());
    let reservations =
        Arc::new(ReservationService::new(Arc::clone(&catalog), Arc::clone(&ledger)));
    let notifier: Arc<dyn Notifier> = Arc::new(NotificationFanout::from_config(&config));
    let model = Arc::new(OpenAiChatModel::new(&config.llm));
    let driver = Arc::new(ConversationDriver::new(
        model,
        Arc::clone(&catalog),
        Arc::clone(&reservations),
        Arc::clone(&notifier),
    ));

    Ok(Application { config, catalog, ledger, reservations, notifier, driver })
}

impl Application {
    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(Arc::clone(&self.catalog)))
            .merge(books::router(Arc::clone(&self.catalog)))
            .merge(reserve::router(Arc::clone(&self.reservations), Arc::clone(&self.notifier)))
            .merge(chat::router(Arc::clone(&self.driver)))
    }
}

fn load_catalog(config: &AppConfig) -> Result<CatalogStore, BootstrapError> {
    let Some(path) = &config.catalog.seed_path else {
        return Ok(CatalogStore::seed());
    };

    let raw = fs::read_to_string(path)
        .map_err(|source| BootstrapError::SeedRead { path: path.clone(), source })?;
    let books: Vec<Book> = serde_json::from_str(&raw)
        .map_err(|source| BootstrapError::SeedParse { path: path.clone(), source })?;
    Ok(CatalogStore::new(books))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use bookdesk_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    #[test]
    fn bootstrap_with_defaults_serves_the_built_in_catalog() {
        let app = bootstrap(LoadOptions::default()).expect("defaults should bootstrap");

        assert_eq!(app.catalog.all().len(), 5);
        assert!(app.ledger.is_empty());
        assert_eq!(app.config.server.port, 3000);
    }

    #[test]
    fn bootstrap_loads_a_catalog_seed_file_when_configured() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[{{"bookId": "X001", "title": "Compilers", "author": "Aho",
                 "category": "Programming", "location": "4th Floor",
                 "availableCopies": 2}}]"#
        )
        .expect("write seed");

        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                catalog_seed_path: Some(file.path().to_path_buf()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("seed file should bootstrap");

        assert_eq!(app.catalog.all().len(), 1);
        let book = app.catalog.get("X001").expect("seeded book");
        assert_eq!(book.title, "Compilers");
        assert_eq!(book.available_copies, 2);
    }

    #[test]
    fn missing_seed_file_fails_fast() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                catalog_seed_path: Some(PathBuf::from("/nonexistent/catalog.json")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(BootstrapError::SeedRead { .. })));
    }
}
