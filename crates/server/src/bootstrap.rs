use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use innkeeper_core::config::{AppConfig, ConfigError, LoadOptions};
use innkeeper_messenger::events::{default_dispatcher, EventDispatcher};
use innkeeper_messenger::send::SendClient;
use tower_http::services::ServeDir;
use tracing::info;

/// Shared per-request state. Config is resolved once at startup; nothing
/// reads the ambient environment after this point.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<EventDispatcher>,
    pub send_client: Arc<SendClient>,
    /// Resolved static asset directory, shared by the form page loader and
    /// the `/public` file service. Anchored at build time unless configured,
    /// so it does not depend on the process working directory.
    pub assets_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let options_url =
            format!("{}/options", config.server.public_base_url.trim_end_matches('/'));
        let dispatcher = Arc::new(default_dispatcher(options_url));
        let send_client = Arc::new(SendClient::new(
            config.messenger.api_base_url.clone(),
            config.messenger.page_access_token.clone(),
        ));
        let assets_dir =
            Arc::new(config.server.assets_dir.clone().unwrap_or_else(default_assets_dir));

        Self { config: Arc::new(config), dispatcher, send_client, assets_dir }
    }
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/public"))
}

pub struct Application {
    pub state: AppState,
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, ConfigError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    Application { state: AppState::new(config) }
}

impl Application {
    pub fn router(&self) -> Router {
        Router::new()
            .merge(crate::webhook::router(self.state.clone()))
            .merge(crate::webview::router(self.state.clone()))
            .merge(crate::health::router())
            .nest_service("/public", ServeDir::new(self.state.assets_dir.as_ref()))
    }
}
