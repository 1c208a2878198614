use askama::Template;
use axum::Router;
use axum::extract::{Extension, Form, Request, State};
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::user::{User, UserService, UserServiceError};
use crate::web::flash::{self, Flash};

pub mod session;

use session::{SessionService, SessionServiceError};

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "session_id";

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: u32,
    pub email: String,
    pub name: String,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id(),
            email: user.email().to_string(),
            name: user.name().to_string(),
        }
    }
}

/// Authentication state shared by the auth routes and middleware.
#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub session_ttl: chrono::Duration,
    pub secure_cookies: bool,
}

impl AuthState {
    /// Creates a new AuthState from the application config.
    pub fn new(
        db: Arc<sea_orm::DatabaseConnection>,
        config: &Config,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            db,
            session_ttl: config.session_ttl()?,
            secure_cookies: config.secure_cookies,
        })
    }
}

/// Creates the router for the public authentication pages.
pub fn create_auth_router(state: Arc<AuthState>) -> Router<()> {
    Router::new()
        .route("/login", get(login_page_handler).post(login_handler))
        .route("/signup", get(signup_page_handler).post(signup_handler))
        .route(
            "/reset-password",
            get(reset_password_page_handler).post(reset_password_handler),
        )
        .with_state(state)
}

/// Creates the router for `/logout`. Mount it behind [`login_redirect_middleware`].
pub fn create_logout_router(state: Arc<AuthState>) -> Router<()> {
    Router::new()
        .route("/logout", get(logout_handler))
        .with_state(state)
}

/// Authentication middleware that resolves the session cookie and sets the CurrentUser extension.
/// A cookie that no longer maps to a live session is removed, logging the browser out.
/// This middleware does not perform redirects.
pub async fn auth_user_middleware(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()) else {
        return next.run(request).await;
    };

    match SessionService::new(&state.db).resolve_user(&token).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(CurrentUser::from(user));
            next.run(request).await
        }
        Ok(None) => {
            let response = next.run(request).await;
            // The handler may already have issued a fresh session (e.g. a login).
            if sets_cookie(&response, SESSION_COOKIE) {
                response
            } else {
                (jar.remove(removal_cookie(SESSION_COOKIE)), response).into_response()
            }
        }
        Err(err) => {
            tracing::error!("Failed to resolve session: {}", err);
            next.run(request).await
        }
    }
}

/// Login redirect middleware that redirects unauthenticated users to the login page.
/// This middleware should be applied after auth_user_middleware to check for CurrentUser extension.
pub async fn login_redirect_middleware(request: Request, next: Next) -> Response {
    let is_authenticated = request.extensions().get::<CurrentUser>().is_some();

    if !is_authenticated {
        return Redirect::to("/login").into_response();
    }

    next.run(request).await
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

#[derive(serde::Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(serde::Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(serde::Deserialize)]
pub struct ResetPasswordForm {
    pub email: String,
    pub newpassword: String,
    pub confirmpassword: String,
}

/// Custom error type for authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Represents an error during template rendering.
    /// The specific `askama::Error` is captured as the source of this error.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    #[error("User service error")]
    User(#[from] UserServiceError),
    #[error("Session service error")]
    Session(#[from] SessionServiceError),
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("Authentication request failed: {:?}", self);
        let user_facing_error_message =
            "An unexpected error occurred while processing your request. Please try again later.";
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!(
                "<h1>Internal Server Error</h1><p>{}</p>",
                user_facing_error_message
            )),
        )
            .into_response()
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub logged_in: bool,
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "reset_password.html")]
pub struct ResetPasswordTemplate {
    pub logged_in: bool,
    pub message: Option<String>,
}

fn render_login(logged_in: bool, message: Option<&str>) -> Result<Html<String>, AuthError> {
    let template = LoginTemplate {
        logged_in,
        message: message.map(str::to_string),
    };
    template.render().map(Html).map_err(AuthError::from)
}

fn render_reset_password(
    logged_in: bool,
    message: Option<&str>,
) -> Result<Html<String>, AuthError> {
    let template = ResetPasswordTemplate {
        logged_in,
        message: message.map(str::to_string),
    };
    template.render().map(Html).map_err(AuthError::from)
}

/// Opens a new session for `user` and adds its cookie to the jar.
/// A session the browser already held is deleted first.
#[tracing::instrument(skip(state, jar))]
async fn start_session(
    state: &AuthState,
    jar: CookieJar,
    user: &User,
) -> Result<CookieJar, AuthError> {
    let sessions = SessionService::new(&state.db);

    if let Some(previous) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()) {
        sessions.delete_session(&previous).await?;
    }

    let session = sessions.create_session(user.id(), state.session_ttl).await?;
    let cookie = Cookie::build((SESSION_COOKIE, session.token().to_owned()))
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(state.session_ttl.num_seconds()))
        .path("/")
        .build();

    Ok(jar.add(cookie))
}

/// Handles GET requests to display the login page.
#[tracing::instrument(skip(current_user, jar))]
pub async fn login_page_handler(
    current_user: Option<Extension<CurrentUser>>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AuthError> {
    let (jar, flash) = flash::take(jar);
    let html = render_login(current_user.is_some(), flash.map(Flash::message))?;
    Ok((jar, html))
}

/// Handles the login request.
/// On success a session is opened and the browser is sent to the todo list;
/// otherwise the form is rendered again with the reason.
#[tracing::instrument(skip(state, current_user, jar, form))]
pub async fn login_handler(
    State(state): State<Arc<AuthState>>,
    current_user: Option<Extension<CurrentUser>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AuthError> {
    let user_service = UserService::new(&state.db);

    match user_service.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            tracing::info!("User {} logged in", user.id());
            let jar = start_session(&state, jar, &user).await?;
            Ok((jar, Redirect::to("/todo-list")).into_response())
        }
        Err(UserServiceError::UserNotFound(_)) => {
            Ok(render_login(current_user.is_some(), Some("Email not found"))?.into_response())
        }
        Err(UserServiceError::WrongPassword) => {
            Ok(render_login(current_user.is_some(), Some("Wrong password"))?.into_response())
        }
        Err(err) => Err(AuthError::User(err)),
    }
}

/// Handles GET requests to display the signup page.
#[tracing::instrument(skip(current_user))]
pub async fn signup_page_handler(
    current_user: Option<Extension<CurrentUser>>,
) -> Result<Html<String>, AuthError> {
    let template = SignupTemplate {
        logged_in: current_user.is_some(),
    };
    template.render().map(Html).map_err(AuthError::from)
}

/// Handles the signup request.
/// A taken email sends the browser to the login page with a flash instead of creating a user.
#[tracing::instrument(skip(state, jar, form))]
pub async fn signup_handler(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AuthError> {
    let user_service = UserService::new(&state.db);

    match user_service
        .create_user(form.email, form.name, &form.password)
        .await
    {
        Ok(user) => {
            tracing::info!("User {} signed up", user.id());
            let jar = start_session(&state, jar, &user).await?;
            Ok((jar, Redirect::to("/todo-list")).into_response())
        }
        Err(UserServiceError::DuplicateEmail(_)) => {
            let jar = flash::set(jar, Flash::EmailExists);
            Ok((jar, Redirect::to("/login")).into_response())
        }
        Err(err) => Err(AuthError::User(err)),
    }
}

/// Handles GET requests to display the password reset page.
#[tracing::instrument(skip(current_user))]
pub async fn reset_password_page_handler(
    current_user: Option<Extension<CurrentUser>>,
) -> Result<Html<String>, AuthError> {
    render_reset_password(current_user.is_some(), None)
}

/// Handles the password reset request.
#[tracing::instrument(skip(state, current_user, jar, form))]
pub async fn reset_password_handler(
    State(state): State<Arc<AuthState>>,
    current_user: Option<Extension<CurrentUser>>,
    jar: CookieJar,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AuthError> {
    let user_service = UserService::new(&state.db);

    match user_service
        .reset_password(&form.email, &form.newpassword, &form.confirmpassword)
        .await
    {
        Ok(()) => {
            let jar = flash::set(jar, Flash::PasswordUpdated);
            Ok((jar, Redirect::to("/login")).into_response())
        }
        Err(UserServiceError::PasswordMismatch) => Ok(render_reset_password(
            current_user.is_some(),
            Some("Passwords do not match"),
        )?
        .into_response()),
        Err(UserServiceError::UserNotFound(_)) => Ok(render_reset_password(
            current_user.is_some(),
            Some("User not found, check the email or create account."),
        )?
        .into_response()),
        Err(err) => Err(AuthError::User(err)),
    }
}

/// Ends the current session and sends the browser home.
#[tracing::instrument(skip(state, jar))]
pub async fn logout_handler(
    State(state): State<Arc<AuthState>>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()) {
        SessionService::new(&state.db).delete_session(&token).await?;
    }
    tracing::info!("User {} logged out", user.id);

    Ok((jar.remove(removal_cookie(SESSION_COOKIE)), Redirect::to("/")))
}
