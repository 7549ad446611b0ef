//! Configuration schema definitions.
//!
//! This module defines the merged configuration structure for the application.
//! All types derive Serde traits for deserialization from the YAML files in the
//! config directory.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Deployment environment selected by `global.yml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Verbose logging, error details in responses, template debug.
    #[default]
    Dev,
    /// Production: JSON logs, opaque error pages.
    Live,
    /// Used by the integration tests.
    Test,
}

impl Environment {
    /// Name used for the `<environment>.yml` file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Live => "live",
            Environment::Test => "test",
        }
    }

    /// Whether responses and templates expose debugging information.
    pub fn is_debug(&self) -> bool {
        matches!(self, Environment::Dev)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Environment::Dev),
            "live" => Ok(Environment::Live),
            "test" => Ok(Environment::Test),
            other => Err(other.to_string()),
        }
    }
}

/// Root configuration, merged from `global.yml`, `<environment>.yml`,
/// `security.yml` and `routes.yml`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Selected environment.
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// User store settings.
    pub database: DatabaseConfig,

    /// Template directory.
    pub templates: TemplatesConfig,

    /// Asset URL settings used by the `asset()` template function.
    pub assets: AssetsConfig,

    /// Autowiring injector settings.
    pub injector: InjectorConfig,

    /// Firewalls, role hierarchy and access rules.
    pub security: SecurityConfig,

    /// Route name to route definition.
    pub routes: BTreeMap<String, RouteConfig>,

    /// Project root that relative paths are resolved against.
    #[serde(skip)]
    pub root: PathBuf,
}

impl AppConfig {
    /// Resolve a configured path against the project root.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Sessions untouched for this many seconds are discarded.
    pub session_idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            session_idle_secs: 1800,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// User store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// YAML file holding the `users` table rows.
    pub users_file: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            users_file: "config/users.yml".to_string(),
        }
    }
}

/// Template configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory containing the view templates.
    pub path: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            path: "web/views".to_string(),
        }
    }
}

/// Asset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Prefix prepended by `asset()`, and the URL the directory is served at.
    pub base_url: String,

    /// Directory holding the static files.
    pub dir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            base_url: "/assets".to_string(),
            dir: "web/assets".to_string(),
        }
    }
}

/// Injector configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct InjectorConfig {
    /// Interface name to implementation name.
    pub alias: BTreeMap<String, String>,

    /// Interfaces whose implementation is built once and reused.
    pub share: Vec<String>,

    /// Request-scoped values registered on every autowired dispatch.
    pub delay: Vec<String>,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Firewalls by name, evaluated in name order.
    pub firewalls: BTreeMap<String, FirewallConfig>,

    /// Role to the roles it implies.
    #[serde(alias = "heirarchy")]
    pub hierarchy: HashMap<String, Vec<String>>,

    /// Ordered `[path_regex, role]` pairs. First match wins.
    pub access_rules: Vec<(String, String)>,
}

/// A single firewall.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// Path regex this firewall covers.
    pub pattern: String,

    /// Allow unauthenticated requests through the firewall.
    pub anonymous: bool,

    /// Form login settings.
    pub form: Option<FormLoginConfig>,

    /// Logout settings.
    pub logout: Option<LogoutConfig>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            pattern: "^/".to_string(),
            anonymous: true,
            form: None,
            logout: None,
        }
    }
}

/// Form login paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormLoginConfig {
    /// Page rendering the login form.
    pub login_path: String,

    /// Path the login form posts to.
    pub check_path: String,

    /// Redirect target after a successful login.
    #[serde(default = "default_target_path")]
    pub default_target_path: String,
}

/// Logout paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogoutConfig {
    /// Path that ends the session.
    pub logout_path: String,

    /// Redirect target after logout.
    #[serde(default = "default_target_path")]
    pub target: String,
}

fn default_target_path() -> String {
    "/".to_string()
}

/// A route as written in `routes.yml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// URL pattern, `{name}` marks a route parameter.
    pub pattern: String,

    /// Route defaults, holding the controller target.
    #[serde(default)]
    pub defaults: RouteDefaults,

    /// `GET`, `POST` or `GET|POST`. Defaults to `GET`.
    #[serde(default)]
    pub method: Option<String>,
}

/// Route defaults block.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteDefaults {
    /// Controller target, `Class:method` or `Class::method`.
    #[serde(rename = "_controller", default)]
    pub controller: Option<String>,
}
