//! Shared utilities for integration testing.

use std::path::Path;

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Client, Response};
use tokio::net::TcpListener;

use app_skeleton::config::{load_config, Environment};
use app_skeleton::{Application, HttpServer, Shutdown};

/// A running server built from the shipped configuration.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    shutdown: Shutdown,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build the application from `config/` in the test environment and serve it
/// on an ephemeral port.
pub async fn spawn_app() -> TestApp {
    let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
    let mut config = load_config(&config_dir).unwrap();
    config.environment = Environment::Test;

    let app = Application::new(config).unwrap();
    let server = HttpServer::new(&app).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    tokio::spawn(server.run(listener, shutdown.clone()));

    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        base_url: format!("http://{addr}"),
        client,
        shutdown,
    }
}

#[allow(dead_code)]
impl TestApp {
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut request = self.client.get(format!("{}{path}", self.base_url));
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// Post the login form to the check path.
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/login_check", self.base_url))
            .form(&[("_username", username), ("_password", password)])
            .send()
            .await
            .unwrap()
    }
}

/// The `name=value` part of the response's session cookie.
#[allow(dead_code)]
pub fn session_cookie(response: &Response) -> String {
    let value = response.headers()[SET_COOKIE].to_str().unwrap();
    value.split(';').next().unwrap().to_string()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}
