use std::sync::Arc;

use courier_core::config::{AppConfig, ConfigError, LoadOptions};
use courier_slack::{
    client::{ClientError, SlackApiClient},
    events::{default_dispatcher, CallbackDispatcher},
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: Arc<CallbackDispatcher>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client initialization failed: {0}")]
    Client(#[from] ClientError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let client = SlackApiClient::new(config.slack.bot_token.clone())?.into_shared();
    let dispatcher = Arc::new(default_dispatcher(client));

    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        handler_count = dispatcher.handler_count(),
        "callback dispatcher assembled"
    );

    Ok(Application { config, dispatcher })
}
