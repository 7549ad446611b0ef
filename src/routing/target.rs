//! Controller target parsing.
//!
//! # Responsibilities
//! - Decide, once per route at load time, which resolver owns a target
//! - Split `Class:method` and `Class::method` into their parts
//!
//! # Design Decisions
//! - A single colon between a class name (letters, digits, `.`, `_`, `-`) and
//!   a bare identifier selects the autowiring injector
//! - Everything else belongs to the standard resolver, unchanged
//! - The whole string must match; `Class::method` never matches the
//!   autowire form

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static AUTOWIRE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._\-]+:[A-Za-z_\x{7f}-\x{ff}][A-Za-z0-9_\x{7f}-\x{ff}]*$")
        .expect("autowire pattern should be valid")
});

/// Where a route's controller comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControllerTarget {
    /// `Class:method`, built by the autowiring injector.
    Autowired { class: String, method: String },
    /// `Class::method`, handled by the standard resolver.
    Standard { class: String, method: String },
    /// Any other target string. Only the standard resolver can know it.
    Other(String),
}

impl ControllerTarget {
    /// Classify a raw `_controller` value.
    pub fn parse(raw: &str) -> Self {
        if is_autowire(raw) {
            if let Some((class, method)) = raw.split_once(':') {
                return ControllerTarget::Autowired {
                    class: class.to_string(),
                    method: method.to_string(),
                };
            }
        }

        match raw.split_once("::") {
            Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                ControllerTarget::Standard {
                    class: class.to_string(),
                    method: method.to_string(),
                }
            }
            _ => ControllerTarget::Other(raw.to_string()),
        }
    }

    /// Whether the autowiring injector owns this target.
    pub fn is_autowired(&self) -> bool {
        matches!(self, ControllerTarget::Autowired { .. })
    }

    /// Name of the resolution strategy, used in logs and metrics.
    pub fn strategy(&self) -> &'static str {
        match self {
            ControllerTarget::Autowired { .. } => "autowire",
            _ => "standard",
        }
    }
}

impl fmt::Display for ControllerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerTarget::Autowired { class, method } => write!(f, "{class}:{method}"),
            ControllerTarget::Standard { class, method } => write!(f, "{class}::{method}"),
            ControllerTarget::Other(raw) => f.write_str(raw),
        }
    }
}

/// Whether `raw` uses the single-colon autowire syntax.
pub fn is_autowire(raw: &str) -> bool {
    AUTOWIRE_PATTERN.is_match(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_colon_is_autowired() {
        assert_eq!(
            ControllerTarget::parse("HomeController:indexAction"),
            ControllerTarget::Autowired {
                class: "HomeController".into(),
                method: "indexAction".into()
            }
        );
        assert!(is_autowire("app.home-controller_2:index"));
        assert!(is_autowire("Home:_private"));
    }

    #[test]
    fn test_double_colon_is_standard() {
        let target = ControllerTarget::parse("HomeController::indexAction");
        assert_eq!(
            target,
            ControllerTarget::Standard {
                class: "HomeController".into(),
                method: "indexAction".into()
            }
        );
        assert!(!target.is_autowired());
        assert_eq!(target.to_string(), "HomeController::indexAction");
    }

    #[test]
    fn test_non_matching_targets() {
        for raw in [
            "",
            "indexAction",
            "Home:1index",
            "Home:index-action",
            ":index",
            "Home:",
            "Ns\\Home:index",
            "Home:index:extra",
        ] {
            assert!(!is_autowire(raw), "{raw} should not be autowired");
            assert!(matches!(
                ControllerTarget::parse(raw),
                ControllerTarget::Other(_)
            ));
        }
    }

    #[test]
    fn test_method_allows_high_latin_characters() {
        assert!(is_autowire("Home:café"));
    }
}
