use askama::Template;
use axum::{
    Form, Router,
    extract::{Extension, FromRequestParts, Path, State, rejection::PathRejection},
    http::{StatusCode, request::Parts},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::todo::{Todo, TodoDetails, TodoService, TodoServiceError};
use crate::web::flash::{self, Flash};

#[derive(Clone, Debug)]
pub struct TodoState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// Custom error type for todo handler operations.
#[derive(Debug, thiserror::Error)]
enum TodoError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a todo service error.
    #[error("Todo service error")]
    Service(#[from] TodoServiceError),
    /// The `{id}` path segment is not a todo id.
    #[error("Malformed todo id")]
    MalformedId(#[from] PathRejection),
}

impl axum::response::IntoResponse for TodoError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            TodoError::Service(TodoServiceError::NotFound(id)) => {
                tracing::warn!("Todo {} not found for current user", id);
                return not_found_page();
            }
            TodoError::MalformedId(rejection) => {
                tracing::warn!("Rejected todo path: {}", rejection);
                return not_found_page();
            }
            _ => {}
        }

        tracing::error!("Todo request failed: {:?}", self);
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

fn not_found_page() -> axum::response::Response {
    let template = NotFoundTemplate { logged_in: true };
    let Ok(rendered) = template.render() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    (StatusCode::NOT_FOUND, Html(rendered)).into_response()
}

/// The `{id}` of a todo route. Anything that is not a valid id is treated as a missing todo.
#[derive(Debug)]
struct TodoId(u32);

impl<S> FromRequestParts<S> for TodoId
where
    S: Send + Sync,
{
    type Rejection = TodoError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<u32>::from_request_parts(parts, state).await?;
        Ok(TodoId(id))
    }
}

#[derive(Template)]
#[template(path = "todo/list.html")]
struct TodoListTemplate {
    logged_in: bool,
    user_name: String,
    todos: Vec<Todo>,
    message: Option<String>,
}

#[derive(Template)]
#[template(path = "todo/add.html")]
struct AddTodoFormTemplate {
    logged_in: bool,
}

#[derive(Template)]
#[template(path = "todo/update.html")]
struct UpdateTodoFormTemplate {
    logged_in: bool,
    todo: Todo,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    logged_in: bool,
}

/// Handler for GET /todo-list that displays the current user's todos.
#[tracing::instrument(skip(state, jar))]
async fn todo_list_handler(
    State(state): State<Arc<TodoState>>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), TodoError> {
    let todo_service = TodoService::new(&state.db);
    let todos = todo_service.get_todos_for_user(user.id).await?;

    let (jar, flash) = flash::take(jar);
    let template = TodoListTemplate {
        logged_in: true,
        user_name: user.name,
        todos,
        message: flash.map(|flash| flash.message().to_string()),
    };
    let html = template.render().map_err(TodoError::from)?;
    Ok((jar, Html(html)))
}

/// Handler for serving the add activity form.
#[tracing::instrument]
async fn add_todo_form_handler() -> Result<Html<String>, TodoError> {
    let template = AddTodoFormTemplate { logged_in: true };
    template.render().map(Html).map_err(TodoError::from)
}

/// Handler for creating a new todo via POST request.
#[tracing::instrument(skip(state, jar))]
async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
    Form(details): Form<TodoDetails>,
) -> Result<(CookieJar, Redirect), TodoError> {
    let todo_service = TodoService::new(&state.db);
    todo_service.create_todo(user.id, details).await?;

    let jar = flash::set(jar, Flash::ActivityAdded);
    Ok((jar, Redirect::to("/todo-list")))
}

/// Handler for serving the edit form pre-filled with the todo's current values.
#[tracing::instrument(skip(state))]
async fn edit_todo_form_handler(
    State(state): State<Arc<TodoState>>,
    Extension(user): Extension<CurrentUser>,
    TodoId(id): TodoId,
) -> Result<Html<String>, TodoError> {
    let todo_service = TodoService::new(&state.db);
    let todo = todo_service.get_todo(id, user.id).await?;

    let template = UpdateTodoFormTemplate {
        logged_in: true,
        todo,
    };
    template.render().map(Html).map_err(TodoError::from)
}

/// Handler for updating a todo via POST request.
#[tracing::instrument(skip(state))]
async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    Extension(user): Extension<CurrentUser>,
    TodoId(id): TodoId,
    Form(details): Form<TodoDetails>,
) -> Result<Redirect, TodoError> {
    let todo_service = TodoService::new(&state.db);
    todo_service.update_todo(id, user.id, details).await?;
    Ok(Redirect::to("/todo-list"))
}

/// Handler for deleting a todo. There is no confirmation step.
#[tracing::instrument(skip(state, jar))]
async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Extension(user): Extension<CurrentUser>,
    TodoId(id): TodoId,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), TodoError> {
    let todo_service = TodoService::new(&state.db);
    todo_service.delete_todo(id, user.id).await?;

    let jar = flash::set(jar, Flash::ActivityDeleted);
    Ok((jar, Redirect::to("/todo-list")))
}

/// Creates and returns the todo router. Every route expects a CurrentUser extension,
/// so mount it behind the login redirect middleware.
pub fn create_todo_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/todo-list", get(todo_list_handler))
        .route(
            "/add-list",
            get(add_todo_form_handler).post(create_todo_handler),
        )
        .route(
            "/update-list/{id}",
            get(edit_todo_form_handler).post(update_todo_handler),
        )
        .route("/delete/{id}", get(delete_todo_handler))
        .with_state(state)
}
