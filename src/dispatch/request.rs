//! What a resolver sees of the current request.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::Method;

use crate::injector::Entry;
use crate::routing::ControllerTarget;
use crate::security::{SecurityContext, SessionHandle};

/// Plain request data, available to controllers as the `request` value.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Decoded `application/x-www-form-urlencoded` body, if any.
    pub form: BTreeMap<String, String>,
    pub request_id: Option<String>,
}

impl RequestInfo {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            form: BTreeMap::new(),
            request_id: None,
        }
    }

    /// A query or form value, query first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .or_else(|| self.form.get(key))
            .map(String::as_str)
    }
}

/// Everything known about a matched request at dispatch time.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Name of the matched route.
    pub route: String,
    /// Controller target, parsed when the route table was loaded.
    pub target: Option<ControllerTarget>,
    /// Route parameters by name.
    pub params: BTreeMap<String, String>,
    pub request: Arc<RequestInfo>,
    pub security: Arc<SecurityContext>,
    /// Named per-request values offered to the injector's `delay` list.
    attributes: BTreeMap<String, Entry>,
}

impl RequestContext {
    pub fn new(
        route: impl Into<String>,
        target: Option<ControllerTarget>,
        request: RequestInfo,
        security: Arc<SecurityContext>,
    ) -> Self {
        let request = Arc::new(request);
        let mut attributes = BTreeMap::new();
        attributes.insert("request".to_string(), Entry::new(Arc::clone(&request)));

        Self {
            route: route.into(),
            target,
            params: BTreeMap::new(),
            request,
            security,
            attributes,
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Attach the session, offered as the `session` value.
    pub fn with_session(self, session: SessionHandle) -> Self {
        self.with_attribute("session", Entry::new(Arc::new(session)))
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Entry) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Entry> {
        self.attributes.get(name)
    }
}
