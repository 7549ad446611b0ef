//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::config::schema::{AppConfig, Environment};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0} must contain a top-level mapping")]
    NotAMapping(PathBuf),

    #[error("global.yml does not declare an environment")]
    MissingEnvironment,

    #[error("Invalid environment \"{0}\" (expected dev, live or test)")]
    InvalidEnvironment(String),

    #[error("Invalid configuration: {0}")]
    Schema(#[source] serde_yaml::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, merge and validate the configuration in `dir`.
///
/// `global.yml` selects the environment; `<environment>.yml` (optional),
/// `security.yml` and `routes.yml` are merged over it in that order. A key
/// defined in a later file replaces the whole top-level value of earlier ones.
/// Relative paths in the result resolve against the parent of `dir`.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let mut merged = read_mapping(&dir.join("global.yml"))?;

    let name = merged
        .get("environment")
        .and_then(Value::as_str)
        .ok_or(ConfigError::MissingEnvironment)?;
    let environment: Environment = name.parse().map_err(ConfigError::InvalidEnvironment)?;

    let env_file = dir.join(format!("{}.yml", environment.as_str()));
    if env_file.exists() {
        merge_into(&mut merged, read_mapping(&env_file)?);
    } else {
        tracing::debug!(path = %env_file.display(), "No environment config file");
    }

    merge_into(&mut merged, read_mapping(&dir.join("security.yml"))?);
    merge_into(&mut merged, read_mapping(&dir.join("routes.yml"))?);

    let mut config: AppConfig =
        serde_yaml::from_value(Value::Mapping(merged)).map_err(ConfigError::Schema)?;
    config.root = dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        environment = %config.environment,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    Ok(config)
}

fn read_mapping(path: &Path) -> Result<Mapping, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Mapping(map) => Ok(map),
        // An empty file parses as null.
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
    }
}

/// Shallow merge: top-level keys of `overlay` replace those of `base`.
fn merge_into(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn minimal_dir(environment: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("config");
        fs::create_dir(&dir).unwrap();
        write(
            &dir,
            "global.yml",
            &format!("environment: {environment}\nlistener:\n  bind_address: \"127.0.0.1:1\"\n"),
        );
        write(&dir, "security.yml", "security:\n  access_rules: []\n");
        write(
            &dir,
            "routes.yml",
            "routes:\n  home:\n    pattern: /\n    defaults: { _controller: \"HomeController:indexAction\" }\n",
        );
        root
    }

    #[test]
    fn test_merges_files_in_order() {
        let root = minimal_dir("dev");
        let dir = root.path().join("config");
        write(&dir, "dev.yml", "listener:\n  bind_address: \"127.0.0.1:2\"\n");

        let config = load_config(&dir).unwrap();
        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.listener.bind_address, "127.0.0.1:2");
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.root, root.path());
    }

    #[test]
    fn test_environment_file_is_optional() {
        let root = minimal_dir("live");
        let config = load_config(&root.path().join("config")).unwrap();
        assert_eq!(config.environment, Environment::Live);
        assert_eq!(config.listener.bind_address, "127.0.0.1:1");
    }

    #[test]
    fn test_invalid_environment_is_rejected() {
        let root = minimal_dir("staging");
        let err = load_config(&root.path().join("config")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(ref e) if e == "staging"));
    }

    #[test]
    fn test_missing_environment_is_rejected() {
        let root = minimal_dir("dev");
        let dir = root.path().join("config");
        write(&dir, "global.yml", "templates:\n  path: views\n");
        assert!(matches!(load_config(&dir), Err(ConfigError::MissingEnvironment)));
    }

    #[test]
    fn test_missing_routes_file_is_an_io_error() {
        let root = minimal_dir("dev");
        let dir = root.path().join("config");
        fs::remove_file(dir.join("routes.yml")).unwrap();
        assert!(matches!(load_config(&dir), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_loads_shipped_config() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let config = load_config(&dir).unwrap();
        assert!(config.routes.contains_key("home"));
        assert_eq!(
            config.injector.alias.get("Greeting").map(String::as_str),
            Some("ConsoleGreeting")
        );
        assert_eq!(config.security.hierarchy["ROLE_ADMIN"], vec!["ROLE_USER".to_string()]);
    }
}
