use crate::config::Config;
use crate::jobs::JobsService;
use crate::scraper::Scraper;
use crate::services::manager::ServiceManager;
use crate::services::web::WebService;
use crate::state::AppState;
use crate::utils::fmt_duration;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    service_manager: ServiceManager,
}

impl App {
    /// Build the shared state around the configured scraper.
    pub fn new(config: Config) -> Self {
        let scraper: Arc<dyn Scraper> = Arc::new(config.scraper());
        Self::with_scraper(config, scraper)
    }

    pub fn with_scraper(config: Config, scraper: Arc<dyn Scraper>) -> Self {
        let policy = config.refresh_policy();
        let ttls = config.cache_ttls();

        info!(
            query = %policy.query,
            max_results = policy.max_results,
            refresh_interval = fmt_duration(policy.refresh_interval),
            drain_check_interval = fmt_duration(policy.drain_check_interval),
            navigation_timeout = fmt_duration(policy.navigation_timeout),
            live_ttl = ttls.live.map(fmt_duration).unwrap_or_else(|| "permanent".into()),
            avatar_ttl = fmt_duration(ttls.avatar),
            subscriber_ttl = fmt_duration(ttls.subscribers),
            "refresh policy loaded"
        );

        let app_state = AppState::new(scraper, policy, ttls);
        let service_manager = ServiceManager::new(app_state.service_statuses.clone());
        App {
            config,
            app_state,
            service_manager,
        }
    }

    /// Register the web server and the background jobs.
    pub fn setup_services(&mut self) {
        let web_service = Box::new(WebService::new(
            self.config.port,
            self.app_state.clone(),
            self.config.rate_limit_per_minute,
        ));
        self.service_manager.register_service("web", web_service);

        let jobs_service = Box::new(JobsService::new(self.app_state.clone()));
        self.service_manager.register_service("jobs", jobs_service);
    }

    /// Start all registered services
    pub fn start_services(&mut self) {
        self.service_manager.spawn_all();
    }

    /// Run the application and handle shutdown signals
    pub async fn run(self) -> ExitCode {
        use crate::services::signals::handle_shutdown_signals;
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await
    }
}
