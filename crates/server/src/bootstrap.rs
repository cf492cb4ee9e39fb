use std::sync::Arc;

use cotiza_agent::collaborators::{PhrasingService, TemplatePhrasing};
use cotiza_agent::runtime::IntakeRuntime;
use cotiza_core::config::{AppConfig, ConfigError, LoadOptions, PhrasingMode};
use thiserror::Error;
use tracing::info;

use crate::document::DocumentGenerator;
use crate::notify::WebhookNotifier;
use crate::phrasing::HttpPhrasing;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<IntakeRuntime>,
    pub phrasing: Arc<dyn PhrasingService>,
    pub documents: Arc<DocumentGenerator>,
    pub notifier: Option<Arc<WebhookNotifier>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("collaborator setup failed: {0}")]
    Collaborator(String),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let phrasing: Arc<dyn PhrasingService> = match config.phrasing.mode {
        PhrasingMode::Template => Arc::new(TemplatePhrasing),
        PhrasingMode::Http => Arc::new(
            HttpPhrasing::from_config(&config.phrasing)
                .map_err(|error| BootstrapError::Collaborator(error.to_string()))?,
        ),
    };
    info!(
        event_name = "system.bootstrap.phrasing_ready",
        mode = ?config.phrasing.mode,
        "phrasing collaborator initialized"
    );

    let documents = Arc::new(DocumentGenerator::new(&config.documents));
    info!(
        event_name = "system.bootstrap.documents_ready",
        pdf_available = documents.pdf_available(),
        "document renderer initialized"
    );

    let notifier = WebhookNotifier::from_config(&config.notifications)
        .map_err(|error| BootstrapError::Collaborator(error.to_string()))?
        .map(Arc::new);
    info!(
        event_name = "system.bootstrap.notifications_ready",
        enabled = notifier.is_some(),
        "notification dispatcher initialized"
    );

    Ok(Application {
        config,
        runtime: Arc::new(IntakeRuntime::new()),
        phrasing,
        documents,
        notifier,
    })
}
