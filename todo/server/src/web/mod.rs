use askama::Template;
use axum::Router;
use axum::extract::{Extension, MatchedPath};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::Html;
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;

use crate::auth::session::SessionService;
use crate::auth::{
    AuthState, CurrentUser, auth_user_middleware, create_auth_router, create_logout_router,
    login_redirect_middleware,
};
use crate::config::{self, Config, ConfigError};
use crate::todo::web::{TodoState, create_todo_router};

pub mod flash;

/// Routes whose requests carry passwords.
const SENSITIVE_PATHS: [&str; 3] = ["/login", "/signup", "/reset-password"];

/// Custom error type for web handler operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Represents an error during template rendering.
    /// The specific `askama::Error` is captured as the source of this error.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
}

impl axum::response::IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("Web request failed: {:?}", self);
        let user_facing_error_message =
            "An unexpected error occurred while processing your request. Please try again later.";
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!(
                "<h1>Internal Server Error</h1><p>{}</p>",
                user_facing_error_message
            )),
        )
            .into_response()
    }
}

/// Builds the full application router on top of an already migrated database.
pub fn create_app(
    db: sea_orm::DatabaseConnection,
    config: &Config,
) -> Result<Router, ConfigError> {
    let db = Arc::new(db);
    let auth_state = Arc::new(AuthState::new(db.clone(), config)?);
    let todo_state = Arc::new(TodoState { db });

    let protected_routes = Router::new()
        .merge(create_todo_router(todo_state))
        .merge(create_logout_router(auth_state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(auth_state.clone(), auth_user_middleware))
                .layer(from_fn(login_redirect_middleware)),
        );

    let public_routes = Router::new()
        .route("/health", get(health_check_handler))
        .route("/", get(welcome_handler))
        .merge(create_auth_router(auth_state.clone()))
        .layer(from_fn_with_state(auth_state, auth_user_middleware));

    let app = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http().make_span_with(FilteredMakeSpan));
    Ok(app)
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");
    SessionService::new(&db).delete_expired_sessions().await?;

    let app = create_app(db, &config)?;

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

/// Renders the home page, greeting the user when logged in.
#[tracing::instrument]
pub async fn welcome_handler(
    current_user: Option<Extension<CurrentUser>>,
) -> Result<Html<String>, WebError> {
    let template = IndexTemplate::new(current_user.map(|Extension(user)| user.name));
    template.render().map(Html).map_err(WebError::from)
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    logged_in: bool,
    user_name: Option<String>,
}

impl IndexTemplate {
    pub fn new(user_name: Option<String>) -> Self {
        Self {
            logged_in: user_name.is_some(),
            user_name,
        }
    }
}

/// Custom span maker that filters sensitive data from authentication requests.
/// This implementation avoids logging request bodies and cookies for security.
#[derive(Clone, Debug)]
pub struct FilteredMakeSpan;

impl<B> MakeSpan<B> for FilteredMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let uri = request.uri();
        let method = request.method();
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);

        if SENSITIVE_PATHS.contains(&uri.path()) {
            tracing::info_span!(
                "request",
                method = %method,
                uri = %uri,
                matched_path,
                sensitive_route = true,
            )
        } else {
            tracing::info_span!(
                "request",
                method = %method,
                uri = %uri,
                matched_path,
            )
        }
    }
}
