//! URL generation from route names.

use std::collections::HashMap;

use thiserror::Error;

use crate::routing::table::RouteTable;

/// Errors raised while generating a URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Route \"{0}\" does not exist")]
    UnknownRoute(String),

    #[error("Route \"{route}\" requires parameter \"{param}\"")]
    MissingParameter { route: String, param: String },
}

/// Builds paths for named routes.
#[derive(Debug, Clone, Default)]
pub struct UrlGenerator {
    patterns: HashMap<String, String>,
}

impl UrlGenerator {
    /// Index every route of the table by name.
    pub fn new(table: &RouteTable) -> Self {
        Self {
            patterns: table
                .routes()
                .iter()
                .map(|r| (r.name.clone(), r.pattern.clone()))
                .collect(),
        }
    }

    /// Path for `name` with `params` substituted into its placeholders.
    ///
    /// Parameters that are not placeholders are appended as a query string. A
    /// `{*name}` wildcard keeps the `/` separators of its value.
    pub fn generate(&self, name: &str, params: &[(&str, &str)]) -> Result<String, UrlError> {
        let pattern = self
            .patterns
            .get(name)
            .ok_or_else(|| UrlError::UnknownRoute(name.to_string()))?;

        let mut path = String::with_capacity(pattern.len());
        let mut used = Vec::new();
        let mut rest = pattern.as_str();

        while let Some(start) = rest.find('{') {
            path.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                path.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let raw = &after[..end];
            let wildcard = raw.starts_with('*');
            let param = raw.trim_start_matches('*');
            let value = params
                .iter()
                .find(|(k, _)| *k == param)
                .map(|(_, v)| *v)
                .ok_or_else(|| UrlError::MissingParameter {
                    route: name.to_string(),
                    param: param.to_string(),
                })?;
            if wildcard {
                let segments: Vec<String> = value.split('/').map(encode).collect();
                path.push_str(&segments.join("/"));
            } else {
                path.push_str(&encode(value));
            }
            used.push(param);
            rest = &after[end + 1..];
        }
        path.push_str(rest);

        let extra: Vec<String> = params
            .iter()
            .filter(|(k, _)| !used.contains(k))
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect();
        if !extra.is_empty() {
            path.push('?');
            path.push_str(&extra.join("&"));
        }

        Ok(path)
    }
}

fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, RouteDefaults};
    use std::collections::BTreeMap;

    fn generator() -> UrlGenerator {
        let mut routes = BTreeMap::new();
        for (name, pattern) in [
            ("home", "/"),
            ("account", "/account/{section}"),
            ("files", "/files/{*rest}"),
        ] {
            routes.insert(
                name.to_string(),
                RouteConfig {
                    pattern: pattern.to_string(),
                    defaults: RouteDefaults {
                        controller: Some("HomeController:indexAction".to_string()),
                    },
                    method: None,
                },
            );
        }
        UrlGenerator::new(&RouteTable::from_config(&routes).unwrap())
    }

    #[test]
    fn test_generate_static_route() {
        assert_eq!(generator().generate("home", &[]).unwrap(), "/");
    }

    #[test]
    fn test_generate_substitutes_and_encodes() {
        let url = generator()
            .generate("account", &[("section", "my profile"), ("tab", "a&b")])
            .unwrap();
        assert_eq!(url, "/account/my%20profile?tab=a%26b");
    }

    #[test]
    fn test_generate_fills_wildcard() {
        let url = generator()
            .generate("files", &[("rest", "docs/read me.txt")])
            .unwrap();
        assert_eq!(url, "/files/docs/read%20me.txt");
    }

    #[test]
    fn test_generate_errors() {
        let gen = generator();
        assert_eq!(
            gen.generate("nope", &[]).unwrap_err(),
            UrlError::UnknownRoute("nope".into())
        );
        assert!(matches!(
            gen.generate("account", &[]),
            Err(UrlError::MissingParameter { .. })
        ));
    }
}
