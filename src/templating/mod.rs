//! View rendering.
//!
//! # Responsibilities
//! - Load templates from the configured directory
//! - Provide `asset()`, `path()` and `is_granted()` to every view
//!
//! # Design Decisions
//! - One environment for the process; templates are cached after first load
//! - `is_granted` and `app.user` are bound per render from the request's
//!   security context, never stored on the environment

use std::path::Path;
use std::sync::Arc;

use minijinja::value::{Kwargs, Value};
use minijinja::{context, path_loader, Environment};
use serde::Serialize;
use thiserror::Error;

use crate::config::Environment as AppEnvironment;
use crate::routing::UrlGenerator;
use crate::security::SecurityContext;

/// Errors raised while rendering a view.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Render(#[from] minijinja::Error),
}

/// The template environment.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new(
        dir: &Path,
        asset_base: &str,
        urls: Arc<UrlGenerator>,
        environment: AppEnvironment,
    ) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(dir));
        env.set_debug(environment.is_debug());
        env.add_global("environment", environment.as_str());
        env.add_global("debug", environment.is_debug());

        let base = asset_base.trim_end_matches('/').to_string();
        env.add_function("asset", move |path: String| {
            Value::from_safe_string(format!("{base}/{}", path.trim_start_matches('/')))
        });

        env.add_function(
            "path",
            move |name: String, kwargs: Kwargs| -> Result<Value, minijinja::Error> {
                let mut params = Vec::new();
                for key in kwargs.args() {
                    params.push((key.to_string(), kwargs.get::<String>(key)?));
                }
                kwargs.assert_all_used()?;

                let borrowed: Vec<(&str, &str)> = params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                urls.generate(&name, &borrowed)
                    .map(Value::from_safe_string)
                    .map_err(|e| {
                        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string())
                    })
            },
        );

        Self { env }
    }

    /// Render `name` with `ctx` plus the per-request security helpers.
    pub fn render<S: Serialize>(
        &self,
        name: &str,
        ctx: S,
        security: &Arc<SecurityContext>,
    ) -> Result<String, TemplateError> {
        let granted = Arc::clone(security);
        let is_granted =
            Value::from_function(move |attribute: String| granted.is_granted(&attribute));

        let user = security.user().map(|u| u.username.clone());

        let template = self.env.get_template(name)?;
        let rendered = template.render(context! {
            is_granted => is_granted,
            app => context! { user => user },
            ..Value::from_serialize(&ctx)
        })?;
        Ok(rendered)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}
