//! Firewall middleware.
//!
//! # Responsibilities
//! - Open the session and refresh its user through the provider
//! - Handle the form login check and logout paths
//! - Enforce access rules before any controller runs
//! - Hand the `SecurityContext` and session to the dispatcher
//!
//! # Design Decisions
//! - Firewalls are tried in name order; the first matching pattern wins
//! - Access rules are ordered; the first matching path decides
//! - Unknown user and wrong password report the same message
//! - Password verification runs on the blocking pool

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{FormLoginConfig, LogoutConfig, SecurityConfig};
use crate::observability::metrics;
use crate::security::context::{
    SecurityContext, AUTHENTICATION_ERROR, LAST_USERNAME, SESSION_USER,
};
use crate::security::hierarchy::RoleHierarchy;
use crate::security::password::verify_password;
use crate::security::provider::UserProvider;
use crate::security::session::{SessionHandle, SessionStore};
use crate::security::user::User;

/// Errors raised while compiling the security configuration.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("invalid pattern \"{pattern}\" in {location}: {source}")]
    Pattern {
        location: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Login failures, shown to the user on the login page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Bad credentials.")]
    BadCredentials,

    #[error("User account is disabled.")]
    Disabled,
}

#[derive(Debug)]
struct Firewall {
    name: String,
    pattern: Regex,
    anonymous: bool,
    form: Option<FormLoginConfig>,
    logout: Option<LogoutConfig>,
}

#[derive(Debug)]
struct AccessRule {
    pattern: Regex,
    role: String,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(rename = "_username", default)]
    username: String,
    #[serde(rename = "_password", default)]
    password: String,
}

/// Compiled firewalls and access rules plus what they need at request time.
pub struct Security {
    firewalls: Vec<Firewall>,
    access_rules: Vec<AccessRule>,
    hierarchy: RoleHierarchy,
    provider: UserProvider,
    sessions: Arc<SessionStore>,
}

impl Security {
    pub fn new(
        config: &SecurityConfig,
        provider: UserProvider,
        sessions: Arc<SessionStore>,
    ) -> Result<Self, SecurityError> {
        let compile = |location: String, pattern: &str| {
            Regex::new(pattern).map_err(|source| SecurityError::Pattern {
                location,
                pattern: pattern.to_string(),
                source,
            })
        };

        let firewalls = config
            .firewalls
            .iter()
            .map(|(name, firewall)| {
                Ok(Firewall {
                    name: name.clone(),
                    pattern: compile(format!("firewall \"{name}\""), &firewall.pattern)?,
                    anonymous: firewall.anonymous,
                    form: firewall.form.clone(),
                    logout: firewall.logout.clone(),
                })
            })
            .collect::<Result<Vec<_>, SecurityError>>()?;

        let access_rules = config
            .access_rules
            .iter()
            .enumerate()
            .map(|(i, (pattern, role))| {
                Ok(AccessRule {
                    pattern: compile(format!("access rule {i}"), pattern)?,
                    role: role.clone(),
                })
            })
            .collect::<Result<Vec<_>, SecurityError>>()?;

        Ok(Self {
            firewalls,
            access_rules,
            hierarchy: RoleHierarchy::new(config.hierarchy.clone()),
            provider,
            sessions,
        })
    }

    pub fn provider(&self) -> &UserProvider {
        &self.provider
    }

    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Check a username or email and a password against the users table.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self.provider.load_user_by_username(username).map_err(|e| {
            tracing::debug!(error = %e, "Login for unknown user");
            AuthError::BadCredentials
        })?;

        if !user.enabled {
            return Err(AuthError::Disabled);
        }

        match verify_password(password, &user.password) {
            Ok(true) => Ok(user),
            Ok(false) => Err(AuthError::BadCredentials),
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "Stored password hash unusable");
                Err(AuthError::BadCredentials)
            }
        }
    }

    /// Security context for the user stored in `session`, reloaded from the
    /// users table. A user that vanished or was disabled is logged out.
    pub fn context_for(&self, session: &SessionHandle) -> SecurityContext {
        let Some(raw) = session.get(SESSION_USER) else {
            return SecurityContext::anonymous();
        };

        let refreshed = serde_json::from_str::<User>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|stored| self.provider.refresh_user(&stored).map_err(|e| e.to_string()));

        match refreshed {
            Ok(user) if user.enabled => SecurityContext::authenticated(user, &self.hierarchy),
            Ok(user) => {
                tracing::info!(user_id = user.id, "Session user disabled, logging out");
                session.remove(SESSION_USER);
                SecurityContext::anonymous()
            }
            Err(reason) => {
                tracing::info!(%reason, "Session user could not be refreshed, logging out");
                session.remove(SESSION_USER);
                SecurityContext::anonymous()
            }
        }
    }

    fn firewall_for(&self, path: &str) -> Option<&Firewall> {
        self.firewalls.iter().find(|f| f.pattern.is_match(path))
    }

    fn access_rule_for(&self, path: &str) -> Option<&AccessRule> {
        self.access_rules.iter().find(|r| r.pattern.is_match(path))
    }
}

/// Axum middleware running the firewall in front of every route.
pub async fn firewall_middleware(
    State(security): State<Arc<Security>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = security.sessions.open(request.headers());
    let path = request.uri().path().to_string();
    let context = security.context_for(&session);
    let firewall = security.firewall_for(&path);

    if let Some(firewall) = firewall {
        if let Some(form) = &firewall.form {
            if request.method() == Method::POST && path == form.check_path {
                let response = login_check(&security, &session, form, request).await;
                return with_cookie(&session, response);
            }
        }

        if let Some(logout) = &firewall.logout {
            if path == logout.logout_path {
                tracing::info!(
                    firewall = %firewall.name,
                    user = context.user().map(|u| u.username.as_str()).unwrap_or("-"),
                    "Logout"
                );
                session.invalidate();
                return with_cookie(&session, Redirect::to(&logout.target).into_response());
            }
        }

        if !firewall.anonymous && !context.is_authenticated() {
            return with_cookie(&session, entry_point(firewall));
        }
    }

    if let Some(rule) = security.access_rule_for(&path) {
        if !context.is_granted(&rule.role) {
            let response = match (context.is_authenticated(), firewall) {
                (false, Some(firewall)) => entry_point(firewall),
                (false, None) => StatusCode::UNAUTHORIZED.into_response(),
                (true, _) => {
                    tracing::info!(path = %path, role = %rule.role, "Access denied");
                    StatusCode::FORBIDDEN.into_response()
                }
            };
            return with_cookie(&session, response);
        }
    }

    request.extensions_mut().insert(Arc::new(context));
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;
    with_cookie(&session, response)
}

async fn login_check(
    security: &Arc<Security>,
    session: &SessionHandle,
    form: &FormLoginConfig,
    request: Request,
) -> Response {
    let Form(login) = match Form::<LoginForm>::from_request(request, &()).await {
        Ok(login) => login,
        Err(rejection) => return rejection.into_response(),
    };

    let username = login.username.clone();
    let checker = Arc::clone(security);
    let outcome = tokio::task::spawn_blocking(move || {
        checker.authenticate(&login.username, &login.password)
    })
    .await;

    match outcome {
        Ok(Ok(user)) => {
            let stored = match serde_json::to_string(&user.without_credentials()) {
                Ok(stored) => stored,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize session user");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            session.migrate();
            session.insert(SESSION_USER, stored);
            session.remove(AUTHENTICATION_ERROR);
            session.remove(LAST_USERNAME);

            tracing::info!(user_id = user.id, username = %user.username, "Login succeeded");
            metrics::record_login("success");
            Redirect::to(&form.default_target_path).into_response()
        }
        Ok(Err(e)) => {
            tracing::info!(username = %username, reason = %e, "Login failed");
            metrics::record_login(match e {
                AuthError::BadCredentials => "bad_credentials",
                AuthError::Disabled => "disabled",
            });
            session.insert(AUTHENTICATION_ERROR, e.to_string());
            session.insert(LAST_USERNAME, username);
            Redirect::to(&form.login_path).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Password check task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn entry_point(firewall: &Firewall) -> Response {
    match &firewall.form {
        Some(form) => Redirect::to(&form.login_path).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

fn with_cookie(session: &SessionHandle, mut response: Response) -> Response {
    if let Some(cookie) = session.set_cookie() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FirewallConfig;
    use crate::security::password::hash_password;
    use crate::security::store::{MemoryUserStore, UserRow};
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use std::collections::HashMap;
    use std::time::Duration;
    use tower::ServiceExt;

    fn security() -> Arc<Security> {
        security_with(SessionStore::new())
    }

    fn security_with(sessions: SessionStore) -> Arc<Security> {
        let password = hash_password("pw").unwrap();
        let rows = vec![
            UserRow {
                id: 1,
                username: "admin".into(),
                email: "admin@x.com".into(),
                password: password.clone(),
                roles: "ROLE_ADMIN".into(),
                enabled: true,
            },
            UserRow {
                id: 2,
                username: "carol".into(),
                email: "carol@x.com".into(),
                password: password.clone(),
                roles: "ROLE_USER".into(),
                enabled: false,
            },
            UserRow {
                id: 3,
                username: "dave".into(),
                email: "dave@x.com".into(),
                password,
                roles: "ROLE_USER".into(),
                enabled: true,
            },
        ];
        let provider = UserProvider::new(Arc::new(MemoryUserStore::from_rows(rows).unwrap()));

        let mut firewalls = std::collections::BTreeMap::new();
        firewalls.insert(
            "default".to_string(),
            FirewallConfig {
                pattern: "^/".into(),
                anonymous: true,
                form: Some(FormLoginConfig {
                    login_path: "/login".into(),
                    check_path: "/login_check".into(),
                    default_target_path: "/".into(),
                }),
                logout: Some(LogoutConfig {
                    logout_path: "/logout".into(),
                    target: "/".into(),
                }),
            },
        );
        let mut hierarchy = HashMap::new();
        hierarchy.insert("ROLE_ADMIN".to_string(), vec!["ROLE_USER".to_string()]);
        let config = SecurityConfig {
            firewalls,
            hierarchy,
            access_rules: vec![
                ("^/admin".into(), "ROLE_ADMIN".into()),
                ("^/account".into(), "ROLE_USER".into()),
            ],
        };

        Arc::new(Security::new(&config, provider, Arc::new(sessions)).unwrap())
    }

    fn app(security: Arc<Security>) -> Router {
        let whoami = |Extension(context): Extension<Arc<SecurityContext>>| async move {
            context
                .user()
                .map(|u| u.username.clone())
                .unwrap_or_else(|| "anonymous".to_string())
        };
        Router::new()
            .route("/", get(whoami))
            .route("/account", get(whoami))
            .route("/admin", get(whoami))
            .layer(middleware::from_fn_with_state(security, firewall_middleware))
    }

    fn login_request(username: &str, password: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/login_check")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("_username={username}&_password={password}")))
            .unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let value = response.headers()[header::SET_COOKIE].to_str().unwrap();
        value.split(';').next().unwrap().to_string()
    }

    async fn get_with(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[test]
    fn test_invalid_patterns_are_rejected() {
        let config = SecurityConfig {
            access_rules: vec![("^/(".into(), "ROLE_USER".into())],
            ..SecurityConfig::default()
        };
        let provider = UserProvider::new(Arc::new(MemoryUserStore::default()));
        assert!(matches!(
            Security::new(&config, provider, Arc::new(SessionStore::new())),
            Err(SecurityError::Pattern { .. })
        ));
    }

    #[test]
    fn test_authenticate() {
        let security = security();
        assert_eq!(security.authenticate("ADMIN@X.COM", "pw").unwrap().id, 1);
        assert_eq!(
            security.authenticate("admin", "nope").unwrap_err(),
            AuthError::BadCredentials
        );
        assert_eq!(
            security.authenticate("nobody", "pw").unwrap_err(),
            AuthError::BadCredentials
        );
        assert_eq!(security.authenticate("carol", "pw").unwrap_err(), AuthError::Disabled);
    }

    #[tokio::test]
    async fn test_failed_logins_do_not_pile_up_sessions() {
        let security = security_with(SessionStore::with_idle_ttl(Duration::from_millis(100)));
        let app = app(Arc::clone(&security));

        for _ in 0..20 {
            let response = app.clone().oneshot(login_request("nobody", "nope")).await.unwrap();
            assert_eq!(response.headers()[header::LOCATION], "/login");
        }
        assert_eq!(security.sessions().len(), 20);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let response = get_with(&app, "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(security.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_request_passes() {
        let response = get_with(&app(security()), "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_protected_path_redirects_to_login() {
        let response = get_with(&app(security()), "/account", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_login_then_access_then_logout() {
        let security = security();
        let app = app(Arc::clone(&security));

        let response = app.clone().oneshot(login_request("admin", "pw")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let cookie = session_cookie(&response);

        let response = get_with(&app, "/account", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_with(&app, "/logout", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(security.sessions().is_empty());

        let response = get_with(&app, "/account", Some(&cookie)).await;
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_failed_login_is_remembered_in_the_session() {
        let security = security();
        let app = app(Arc::clone(&security));

        let response = app.oneshot(login_request("admin", "wrong")).await.unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let cookie = session_cookie(&response);
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, cookie.parse().unwrap());
        let session = security.sessions().open(&headers);
        assert_eq!(session.get(AUTHENTICATION_ERROR).as_deref(), Some("Bad credentials."));
        assert_eq!(session.get(LAST_USERNAME).as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_missing_role_is_forbidden() {
        let app = app(security());
        let response = app.clone().oneshot(login_request("dave", "pw")).await.unwrap();
        let cookie = session_cookie(&response);

        let response = get_with(&app, "/account", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_with(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_refresh_reloads_roles() {
        let security = security();
        let session = security.sessions().open(&axum::http::HeaderMap::new());
        let user = security.provider().load_user_by_username("admin").unwrap();
        let mut plain = user.without_credentials();
        plain.roles = User::parse_roles("ROLE_USER");
        session.insert(SESSION_USER, serde_json::to_string(&plain).unwrap());
        let cookie = format!("APPSESSID={}", session.id().unwrap());

        // Refresh reloads the admin role from the table.
        let response = get_with(&app(Arc::clone(&security)), "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_vanished_user_is_logged_out() {
        let security = security();
        let session = security.sessions().open(&axum::http::HeaderMap::new());
        let mut ghost = security.provider().load_user_by_username("admin").unwrap();
        ghost.username = "ghost".into();
        session.insert(SESSION_USER, serde_json::to_string(&ghost).unwrap());

        let context = security.context_for(&session);
        assert!(!context.is_authenticated());
        assert!(!session.has(SESSION_USER));
    }
}
