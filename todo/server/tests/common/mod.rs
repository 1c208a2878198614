#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use migration::MigratorTrait;
use regex::Regex;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use todo_server::config::Config;
use tower::ServiceExt;

/// Opens a fresh in-memory SQLite database with all migrations applied.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();

    // A single pooled connection keeps every query on the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Builds the full application router over a fresh database.
pub async fn setup_app() -> anyhow::Result<(Router, DatabaseConnection)> {
    let db = setup_db().await?;
    let app = todo_server::web::create_app(db.clone(), &Config::default())?;
    Ok((app, db))
}

/// A fully buffered HTTP response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("location")
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the `name=value` pair of a cookie set by this response, ignoring removals.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let pattern = Regex::new(&format!(r"^{}=([^;]+)", regex::escape(name))).unwrap();
        self.set_cookie_headers().find_map(|header| {
            pattern
                .captures(header)
                .map(|captures| format!("{}={}", name, &captures[1]))
        })
    }

    /// Returns true if this response tells the browser to drop the cookie.
    pub fn removes_cookie(&self, name: &str) -> bool {
        let prefix = format!("{}=;", name);
        self.set_cookie_headers()
            .any(|header| header.starts_with(&prefix) && header.contains("Max-Age=0"))
    }

    fn set_cookie_headers(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|value| value.to_str().ok())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

/// Signs up through the HTTP surface and returns the session cookie (`session_id=...`).
pub async fn sign_up(app: &Router, email: &str, name: &str, password: &str) -> String {
    let form = format!("email={}&name={}&password={}", email, name, password);
    let response = send(app, post_form("/signup", &form, None)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    response
        .cookie("session_id")
        .expect("Expected signup to open a session")
}

/// Adds an activity through the HTTP surface.
pub async fn add_activity(app: &Router, session: &str, activity: &str, date: &str, time: &str) {
    let form = format!("activity={}&date={}&time={}", activity, date, time);
    let response = send(app, post_form("/add-list", &form, Some(session))).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}
