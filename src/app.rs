use crate::config::Config;
use crate::gateway::profile::{ContentClass, Targets};
use crate::services::manager::ServiceManager;
use crate::services::web::WebService;
use crate::state::AppState;
use anyhow::Context;
use std::process::ExitCode;
use tracing::info;
use url::Url;

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    service_manager: ServiceManager,
}

impl App {
    /// Create a new App instance with all necessary components initialized
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let targets = Targets::new(
            &config.default_target_url,
            &config.anime_target_url,
            &config.movies_target_url,
        )
        .context("Invalid upstream target configuration")?;

        for class in ContentClass::ALL {
            info!(%class, upstream = %targets.upstream(class), "upstream configured");
        }

        let public_origin = config
            .public_origin
            .as_deref()
            .filter(|origin| !origin.is_empty())
            .map(Url::parse)
            .transpose()
            .context("PUBLIC_ORIGIN is not a valid URL")?;
        if let Some(origin) = &public_origin {
            info!(origin = %origin, "using fixed public origin for rewritten links");
        }

        let app_state = AppState::new(targets, public_origin, config.port)?;

        Ok(App {
            config,
            app_state,
            service_manager: ServiceManager::new(),
        })
    }

    /// Register and spawn the web service
    pub fn start_services(&mut self) {
        let web_service = WebService::new(self.config.port, self.app_state.clone());
        self.service_manager
            .spawn("web", move |shutdown_rx| web_service.run(shutdown_rx));
    }

    /// Run the application and handle shutdown signals
    pub async fn run(self) -> ExitCode {
        use crate::services::signals::handle_shutdown_signals;
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await
    }
}
