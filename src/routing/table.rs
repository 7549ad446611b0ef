//! Route table built from `routes.yml`.
//!
//! # Responsibilities
//! - Turn route configs into immutable descriptors
//! - Parse each controller target once
//! - Reject routes the HTTP router could not register
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - Routes sharing a pattern are merged; the same pattern and method twice is
//!   an error instead of a panic at router build time
//! - Patterns that differ only in parameter names conflict

use std::collections::{BTreeMap, HashMap};

use axum::http::Method;
use thiserror::Error;

use crate::config::RouteConfig;
use crate::routing::target::ControllerTarget;

/// Errors raised while building the route table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route \"{route}\" has unsupported method \"{method}\"")]
    Method { route: String, method: String },

    #[error("routes \"{first}\" and \"{second}\" both handle {method} {pattern}")]
    Duplicate {
        first: String,
        second: String,
        method: Method,
        pattern: String,
    },

    #[error("route patterns \"{first}\" and \"{second}\" differ only in parameter names")]
    Conflict { first: String, second: String },

    #[error("route \"{0}\" has no controller")]
    MissingController(String),
}

/// A route after load-time parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Route name, used by the URL generator.
    pub name: String,
    /// URL pattern with `{param}` placeholders.
    pub pattern: String,
    /// Parsed controller target.
    pub target: ControllerTarget,
    /// Accepted methods.
    pub methods: Vec<Method>,
    /// Placeholder names, in pattern order.
    pub params: Vec<String>,
}

/// All routes of the application.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Build the table from the merged configuration.
    pub fn from_config(routes: &BTreeMap<String, RouteConfig>) -> Result<Self, RouteError> {
        let mut descriptors = Vec::with_capacity(routes.len());
        let mut seen: HashMap<(String, Method), String> = HashMap::new();
        let mut shapes: HashMap<String, String> = HashMap::new();

        for (name, route) in routes {
            let raw = route
                .defaults
                .controller
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| RouteError::MissingController(name.clone()))?;

            let methods = parse_methods(route.method.as_deref()).map_err(|method| {
                RouteError::Method {
                    route: name.clone(),
                    method,
                }
            })?;

            let shape = pattern_shape(&route.pattern);
            match shapes.get(&shape) {
                Some(other) if other != &route.pattern => {
                    return Err(RouteError::Conflict {
                        first: other.clone(),
                        second: route.pattern.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    shapes.insert(shape, route.pattern.clone());
                }
            }

            for method in &methods {
                let key = (route.pattern.clone(), method.clone());
                if let Some(first) = seen.insert(key, name.clone()) {
                    return Err(RouteError::Duplicate {
                        first,
                        second: name.clone(),
                        method: method.clone(),
                        pattern: route.pattern.clone(),
                    });
                }
            }

            descriptors.push(RouteDescriptor {
                name: name.clone(),
                pattern: route.pattern.clone(),
                target: ControllerTarget::parse(raw),
                methods,
                params: pattern_params(&route.pattern),
            });
        }

        Ok(Self {
            routes: descriptors,
        })
    }

    /// All routes, in name order.
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Look up a route by name.
    pub fn get(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Routes grouped by pattern, as the HTTP router registers them.
    pub fn by_pattern(&self) -> BTreeMap<&str, Vec<&RouteDescriptor>> {
        let mut grouped: BTreeMap<&str, Vec<&RouteDescriptor>> = BTreeMap::new();
        for route in &self.routes {
            grouped.entry(route.pattern.as_str()).or_default().push(route);
        }
        grouped
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Parse a `GET|POST` style method list. `None` means `GET`.
///
/// Returns the offending token on failure.
pub fn parse_methods(list: Option<&str>) -> Result<Vec<Method>, String> {
    let Some(list) = list else {
        return Ok(vec![Method::GET]);
    };

    let mut methods = Vec::new();
    for token in list.split('|') {
        let method = match token.trim().to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            _ => return Err(token.trim().to_string()),
        };
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    Ok(methods)
}

/// Placeholder names of a pattern, in order.
pub fn pattern_params(pattern: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else { break };
        let name = after[..end].trim_start_matches('*');
        if !name.is_empty() {
            params.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    params
}

fn pattern_shape(pattern: &str) -> String {
    let mut shape = String::with_capacity(pattern.len());
    let mut in_param = false;
    for c in pattern.chars() {
        match c {
            '{' => {
                in_param = true;
                shape.push_str("{}");
            }
            '}' => in_param = false,
            _ if in_param => {}
            _ => shape.push(c),
        }
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteDefaults;

    fn route(pattern: &str, controller: &str, method: Option<&str>) -> RouteConfig {
        RouteConfig {
            pattern: pattern.to_string(),
            defaults: RouteDefaults {
                controller: Some(controller.to_string()),
            },
            method: method.map(str::to_string),
        }
    }

    #[test]
    fn test_builds_descriptors() {
        let mut routes = BTreeMap::new();
        routes.insert("home".to_string(), route("/", "HomeController:indexAction", None));
        routes.insert(
            "login".to_string(),
            route("/login", "HomeController:loginAction", Some("GET|POST")),
        );
        routes.insert(
            "post".to_string(),
            route("/posts/{year}/{slug}", "PostController::showAction", None),
        );

        let table = RouteTable::from_config(&routes).unwrap();
        assert_eq!(table.len(), 3);

        let home = table.get("home").unwrap();
        assert_eq!(home.methods, vec![Method::GET]);
        assert!(home.target.is_autowired());

        let login = table.get("login").unwrap();
        assert_eq!(login.methods, vec![Method::GET, Method::POST]);

        let post = table.get("post").unwrap();
        assert_eq!(post.params, vec!["year".to_string(), "slug".to_string()]);
        assert_eq!(post.target.strategy(), "standard");
    }

    #[test]
    fn test_shared_pattern_with_distinct_methods() {
        let mut routes = BTreeMap::new();
        routes.insert("form".to_string(), route("/contact", "Contact:show", None));
        routes.insert("submit".to_string(), route("/contact", "Contact:submit", Some("POST")));

        let table = RouteTable::from_config(&routes).unwrap();
        assert_eq!(table.by_pattern()["/contact"].len(), 2);
    }

    #[test]
    fn test_duplicate_method_is_rejected() {
        let mut routes = BTreeMap::new();
        routes.insert("a".to_string(), route("/same", "A:one", None));
        routes.insert("b".to_string(), route("/same", "B:two", Some("get")));

        let err = RouteTable::from_config(&routes).unwrap_err();
        assert!(matches!(
            err,
            RouteError::Duplicate { ref first, ref second, .. } if first == "a" && second == "b"
        ));
    }

    #[test]
    fn test_parameter_name_conflict_is_rejected() {
        let mut routes = BTreeMap::new();
        routes.insert("a".to_string(), route("/users/{id}", "A:one", None));
        routes.insert("b".to_string(), route("/users/{name}", "B:two", Some("POST")));

        assert!(matches!(
            RouteTable::from_config(&routes),
            Err(RouteError::Conflict { .. })
        ));
    }

    #[test]
    fn test_parse_methods() {
        assert_eq!(parse_methods(None).unwrap(), vec![Method::GET]);
        assert_eq!(
            parse_methods(Some("post | get|POST")).unwrap(),
            vec![Method::POST, Method::GET]
        );
        assert_eq!(parse_methods(Some("GET|FETCH")).unwrap_err(), "FETCH");
    }
}
