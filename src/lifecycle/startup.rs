//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build every service in dependency order: users, security, routes,
//!   templates, injector, resolvers
//! - Check each route target against the resolver that will serve it
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{load_config, AppConfig, ConfigError};
use crate::controllers;
use crate::dispatch::{AutowireResolver, RequestInfo, StandardResolver};
use crate::injector::{InjectError, Injector, InjectorBuilder};
use crate::routing::{ControllerTarget, RouteError, RouteTable, UrlGenerator};
use crate::security::{
    MemoryUserStore, Security, SecurityContext, SecurityError, SessionHandle, SessionStore,
    StoreError, UserProvider,
};
use crate::templating::Templates;

/// The resolver chain every request goes through.
pub type AppResolver = AutowireResolver<StandardResolver>;

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Inject(#[from] InjectError),

    #[error("route \"{route}\" targets unknown controller \"{target}\"")]
    UnknownTarget { route: String, target: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The wired application, ready to be served.
pub struct Application {
    config: AppConfig,
    routes: Arc<RouteTable>,
    injector: Arc<Injector>,
    resolver: Arc<AppResolver>,
    security: Arc<Security>,
}

impl Application {
    /// Load the configuration directory and build the application.
    pub fn from_dir(config_dir: &Path) -> Result<Self, AppError> {
        Self::new(load_config(config_dir)?)
    }

    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let environment = config.environment;
        tracing::info!(
            environment = %environment,
            debug = environment.is_debug(),
            "Registering environment parameters"
        );

        let users_file = config.resolve_path(&config.database.users_file);
        let store = MemoryUserStore::from_yaml_file(&users_file)?;
        let provider = UserProvider::new(Arc::new(store));

        let sessions = Arc::new(SessionStore::with_idle_ttl(Duration::from_secs(
            config.timeouts.session_idle_secs,
        )));
        let security = Arc::new(Security::new(&config.security, provider.clone(), sessions)?);

        let routes = Arc::new(RouteTable::from_config(&config.routes)?);
        let urls = Arc::new(UrlGenerator::new(&routes));

        let templates = Arc::new(Templates::new(
            &config.resolve_path(&config.templates.path),
            &config.assets.base_url,
            Arc::clone(&urls),
            environment,
        ));

        let mut builder = InjectorBuilder::new();
        builder
            .share(templates)
            .share(Arc::clone(&urls))
            .share(Arc::new(provider))
            .delayed::<RequestInfo>("request")
            .delayed::<SessionHandle>("session")
            .request_scoped::<SecurityContext>();
        controllers::register_autowired(&mut builder);
        let injector = Arc::new(builder.build(&config.injector)?);

        let mut standard = StandardResolver::new();
        controllers::register_standard(&mut standard, environment);

        check_targets(&routes, &injector, &standard)?;

        let resolver = Arc::new(AutowireResolver::new(standard, Arc::clone(&injector)));

        tracing::info!(
            routes = routes.len(),
            controllers = injector.controllers().count(),
            bindings = ?injector.bindings(),
            "Application ready"
        );

        Ok(Self {
            config,
            routes,
            injector,
            resolver,
            security,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn injector(&self) -> &Arc<Injector> {
        &self.injector
    }

    pub fn resolver(&self) -> &Arc<AppResolver> {
        &self.resolver
    }

    pub fn security(&self) -> &Arc<Security> {
        &self.security
    }
}

/// Every route must name a controller its resolver knows.
fn check_targets(
    routes: &RouteTable,
    injector: &Injector,
    standard: &StandardResolver,
) -> Result<(), AppError> {
    for route in routes.routes() {
        match &route.target {
            ControllerTarget::Autowired { class, method } => {
                let controller = injector
                    .controller(class)
                    .ok_or_else(|| InjectError::UnknownController(class.clone()))?;
                if !controller.has_action(method) {
                    return Err(InjectError::UnknownAction {
                        class: class.clone(),
                        method: method.clone(),
                    }
                    .into());
                }
            }
            target => {
                let target = target.to_string();
                if !standard.contains(&target) {
                    return Err(AppError::UnknownTarget {
                        route: route.name.clone(),
                        target,
                    });
                }
            }
        }
    }
    Ok(())
}
