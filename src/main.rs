//! app-skeleton
//!
//! A web application bootstrap built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ security firewall ──▶ route handler
//!                     (request id,    (session, login,      (RequestContext)
//!                      trace, limits)  access rules)              │
//!                                                                 ▼
//!                                                   AutowireResolver
//!                                             Class:method │      │ anything else
//!                                                          ▼      ▼
//!                                                    injector   StandardResolver
//!                                                          │      │
//!     Client Response                                      ▼      ▼
//!     ◀───────────────────────────────────────────── controller action
//!
//!     Cross-cutting: config (YAML) · observability (tracing, metrics)
//!                    lifecycle (startup checks, graceful shutdown)
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use app_skeleton::config::load_config;
use app_skeleton::http::HttpServer;
use app_skeleton::lifecycle::{signals, Application, Shutdown};
use app_skeleton::observability::{logging, metrics};
use app_skeleton::security::hash_password;

#[derive(Parser)]
#[command(name = "app-skeleton")]
#[command(
    about = "Web application skeleton with an autowiring controller resolver",
    long_about = None
)]
struct Cli {
    /// Directory holding global.yml, <environment>.yml, security.yml and routes.yml
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve HTTP (the default)
    Serve,
    /// Print the route table and how each target is resolved
    Routes,
    /// Look a user up by username or email
    User { name: String },
    /// Hash a password for the users fixture
    HashPassword { password: String },
    /// Load and validate the configuration and the injector graph
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::HashPassword { password }) = &cli.command {
        println!("{}", hash_password(password)?);
        return Ok(());
    }

    let config = load_config(&cli.config_dir)?;
    logging::init_logging(&config.observability, config.environment);

    tracing::info!(
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let app = Application::new(config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(app).await?,
        Commands::Routes => {
            for route in app.routes().routes() {
                let methods: Vec<&str> = route.methods.iter().map(|m| m.as_str()).collect();
                println!(
                    "{:<12} {:<10} {:<24} {:<36} {}",
                    route.name,
                    methods.join("|"),
                    route.pattern,
                    route.target,
                    route.target.strategy()
                );
            }
        }
        Commands::User { name } => {
            let user = app.security().provider().load_user_by_username(&name)?;
            println!("{}", serde_json::to_string_pretty(&user.without_credentials())?);
        }
        Commands::Check => {
            println!(
                "configuration OK: {} routes, {} controllers, bindings {:?}",
                app.routes().len(),
                app.injector().controllers().count(),
                app.injector().bindings()
            );
        }
        // Handled before the configuration is loaded.
        Commands::HashPassword { .. } => {}
    }

    Ok(())
}

async fn serve(app: Application) -> Result<(), Box<dyn std::error::Error>> {
    let config = app.config();

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let server = HttpServer::new(&app)?;
    let shutdown = Shutdown::new();
    signals::trigger_on_signal(&shutdown);

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
