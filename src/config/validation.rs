//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check route definitions (pattern, controller target, methods)
//! - Compile every firewall and access-rule regex once
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Controller targets are checked against the registries later, when the
//!   route table is built

use std::net::SocketAddr;

use regex::Regex;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::parse_methods;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address \"{0}\" is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address \"{0}\" is not a socket address")]
    MetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("timeouts.session_idle_secs must be greater than zero")]
    ZeroSessionTimeout,

    #[error("route \"{0}\" pattern must start with '/'")]
    RoutePattern(String),

    #[error("route \"{0}\" has no defaults._controller")]
    MissingController(String),

    #[error("route \"{route}\" has unsupported method \"{method}\"")]
    RouteMethod { route: String, method: String },

    #[error("{location} pattern \"{pattern}\" is not a valid regex")]
    Regex { location: String, pattern: String },

    #[error("firewall \"{0}\" uses form login without allowing anonymous access to its login path")]
    LoginPathUnreachable(String),
}

/// Validate a merged configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.timeouts.session_idle_secs == 0 {
        errors.push(ValidationError::ZeroSessionTimeout);
    }

    for (name, route) in &config.routes {
        if !route.pattern.starts_with('/') {
            errors.push(ValidationError::RoutePattern(name.clone()));
        }

        match route.defaults.controller.as_deref() {
            Some(target) if !target.trim().is_empty() => {}
            _ => errors.push(ValidationError::MissingController(name.clone())),
        }

        if let Err(method) = parse_methods(route.method.as_deref()) {
            errors.push(ValidationError::RouteMethod {
                route: name.clone(),
                method,
            });
        }
    }

    for (name, firewall) in &config.security.firewalls {
        check_regex(&mut errors, format!("firewall \"{name}\""), &firewall.pattern);

        if firewall.form.is_some() && !firewall.anonymous {
            errors.push(ValidationError::LoginPathUnreachable(name.clone()));
        }
    }

    for (pattern, _) in &config.security.access_rules {
        check_regex(&mut errors, "access rule".to_string(), pattern);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_regex(errors: &mut Vec<ValidationError>, location: String, pattern: &str) {
    if Regex::new(pattern).is_err() {
        errors.push(ValidationError::Regex {
            location,
            pattern: pattern.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FirewallConfig, FormLoginConfig, RouteConfig, RouteDefaults};

    fn route(pattern: &str, controller: Option<&str>, method: Option<&str>) -> RouteConfig {
        RouteConfig {
            pattern: pattern.to_string(),
            defaults: RouteDefaults {
                controller: controller.map(str::to_string),
            },
            method: method.map(str::to_string),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.routes.insert("a".into(), route("nope", None, Some("FETCH")));
        config
            .security
            .access_rules
            .push(("^/admin(".into(), "ROLE_ADMIN".into()));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::MissingController("a".into())));
        assert!(errors.contains(&ValidationError::RouteMethod {
            route: "a".into(),
            method: "FETCH".into()
        }));
    }

    #[test]
    fn test_form_login_requires_anonymous_firewall() {
        let mut config = AppConfig::default();
        config.security.firewalls.insert(
            "main".into(),
            FirewallConfig {
                anonymous: false,
                form: Some(FormLoginConfig {
                    login_path: "/login".into(),
                    check_path: "/login_check".into(),
                    default_target_path: "/".into(),
                }),
                ..FirewallConfig::default()
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::LoginPathUnreachable("main".into())]);
    }
}
