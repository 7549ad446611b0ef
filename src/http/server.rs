//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Register every route of the table on the Axum router
//! - Wire up middleware (firewall, limits, timeout, request ID, tracing)
//! - Build the dispatch context for each matched request
//! - Serve until the shutdown coordinator fires

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{FromRequest, Path, Query, Request, State},
    http::{Method, StatusCode},
    middleware,
    response::Response,
    routing::{MethodFilter, MethodRouter},
    Form, Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::dispatch::{dispatch, RequestContext, RequestInfo};
use crate::http::error::error_response;
use crate::lifecycle::{AppResolver, Application, Shutdown};
use crate::observability::metrics;
use crate::routing::{ControllerTarget, RouteDescriptor};
use crate::security::{firewall_middleware, Security, SecurityContext, SessionHandle};

const X_REQUEST_ID: &str = "x-request-id";

/// Errors raised while building the router.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("route \"{route}\" uses method {method}, which cannot be routed")]
    Method { route: String, method: Method },
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AppResolver>,
    pub security: Arc<Security>,
    pub debug: bool,
}

/// What a route handler needs to know about its route.
#[derive(Debug)]
struct RouteHandle {
    name: String,
    target: ControllerTarget,
}

/// HTTP server for the application.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(app: &Application) -> Result<Self, ServerError> {
        let state = AppState {
            resolver: Arc::clone(app.resolver()),
            security: Arc::clone(app.security()),
            debug: app.config().environment.is_debug(),
        };

        let router = Self::build_router(app, state)?;
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(app: &Application, state: AppState) -> Result<Router, ServerError> {
        let config = app.config();
        let mut router = Router::new();

        for (pattern, routes) in app.routes().by_pattern() {
            let mut method_router = MethodRouter::new();
            for route in routes {
                method_router = add_route(method_router, route)?;
            }
            router = router.route(pattern, method_router);
        }

        let assets = &config.assets.base_url;
        if assets.starts_with('/') && assets.len() > 1 {
            router = router.nest_service(
                assets.trim_end_matches('/'),
                ServeDir::new(config.resolve_path(&config.assets.dir)),
            );
        }

        let router = router
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn_with_state(
                Arc::clone(&state.security),
                firewall_middleware,
            ))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Ok(router)
    }

    /// The fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn add_route(
    method_router: MethodRouter<AppState>,
    route: &RouteDescriptor,
) -> Result<MethodRouter<AppState>, ServerError> {
    let handle = Arc::new(RouteHandle {
        name: route.name.clone(),
        target: route.target.clone(),
    });

    let mut method_router = method_router;
    for method in &route.methods {
        let filter = MethodFilter::try_from(method.clone()).map_err(|_| ServerError::Method {
            route: route.name.clone(),
            method: method.clone(),
        })?;

        let handle = Arc::clone(&handle);
        method_router = method_router.on(
            filter,
            move |State(state): State<AppState>,
                  params: Option<Path<BTreeMap<String, String>>>,
                  request: Request| {
                let handle = Arc::clone(&handle);
                async move { route_handler(state, &handle, params, request).await }
            },
        );
    }
    Ok(method_router)
}

/// Build the dispatch context for a matched route and run the resolver chain.
async fn route_handler(
    state: AppState,
    route: &RouteHandle,
    params: Option<Path<BTreeMap<String, String>>>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let security = request
        .extensions()
        .get::<Arc<SecurityContext>>()
        .cloned()
        .unwrap_or_else(|| Arc::new(SecurityContext::anonymous()));
    let session = request
        .extensions()
        .get::<SessionHandle>()
        .cloned()
        .unwrap_or_else(|| state.security.sessions().open(request.headers()));

    let query = Query::<BTreeMap<String, String>>::try_from_uri(&uri)
        .map(|Query(query)| query)
        .unwrap_or_default();
    let form = if method == Method::POST {
        Form::<BTreeMap<String, String>>::from_request(request, &())
            .await
            .map(|Form(form)| form)
            .unwrap_or_default()
    } else {
        BTreeMap::new()
    };

    let mut info = RequestInfo::new(method.clone(), uri.path());
    info.query = query;
    info.form = form;
    info.request_id = request_id;

    let context =
        RequestContext::new(route.name.clone(), Some(route.target.clone()), info, security)
            .with_params(params.map(|Path(params)| params).unwrap_or_default())
            .with_session(session);

    let (response, strategy) = match dispatch(state.resolver.as_ref(), &context) {
        Ok(dispatched) => dispatched,
        Err(e) => {
            tracing::error!(
                route = %route.name,
                target = %route.target,
                error = %e,
                "Dispatch failed"
            );
            (error_response(&e, state.debug), route.target.strategy())
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), strategy, start);
    response
}
