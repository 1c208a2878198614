use crate::entities::todo;
use sea_orm::*;
use serde::Deserialize;

pub mod web;

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Todo {
    id: u32,
    user_id: u32,
    activity: String,
    date: String,
    time: String,
}

impl Todo {
    pub fn new(id: u32, user_id: u32, activity: String, date: String, time: String) -> Self {
        Self {
            id,
            user_id,
            activity,
            date,
            time,
        }
    }

    /// Returns the ID of the todo.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the ID of the owning user.
    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Todo::new(
            model.id as u32,
            model.user_id as u32,
            model.activity,
            model.date,
            model.time,
        )
    }
}

/// The user-editable part of a todo. Date and time are free text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TodoDetails {
    pub activity: String,
    pub date: String,
    pub time: String,
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// No todo with this ID is owned by the requesting user.
    #[error("Todo with ID {0} not found")]
    NotFound(u32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Todo persistence scoped to an owning user.
///
/// Every lookup by ID also filters on the owner, so a todo belonging to someone else is
/// indistinguishable from a missing one.
pub struct TodoService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TodoService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TodoService<'_> {
        TodoService { db }
    }

    /// Retrieves all todos owned by `user_id`, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_todos_for_user(&self, user_id: u32) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = todo::Entity::find()
            .filter(todo::Column::UserId.eq(user_id as i32))
            .order_by_asc(todo::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Todo::from)
            .collect();
        Ok(todos)
    }

    /// Creates a new todo owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn create_todo(
        &self,
        user_id: u32,
        details: TodoDetails,
    ) -> Result<Todo, TodoServiceError> {
        let active_model = todo::ActiveModel {
            user_id: ActiveValue::Set(user_id as i32),
            activity: ActiveValue::Set(details.activity),
            date: ActiveValue::Set(details.date),
            time: ActiveValue::Set(details.time),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(Todo::from(created_model))
    }

    /// Retrieves a todo by its ID if it is owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn get_todo(&self, id: u32, user_id: u32) -> Result<Todo, TodoServiceError> {
        let model = self.find_owned(id, user_id).await?;
        Ok(Todo::from(model))
    }

    /// Overwrites activity, date and time of a todo owned by `user_id`.
    ///
    /// # Returns
    ///
    /// The updated `Todo`; its ID and owner are unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn update_todo(
        &self,
        id: u32,
        user_id: u32,
        details: TodoDetails,
    ) -> Result<Todo, TodoServiceError> {
        let todo_to_update = self.find_owned(id, user_id).await?;

        let mut active_model: todo::ActiveModel = todo_to_update.into();
        active_model.activity = ActiveValue::Set(details.activity);
        active_model.date = ActiveValue::Set(details.date);
        active_model.time = ActiveValue::Set(details.time);
        let updated_model = active_model.update(self.db).await?;

        Ok(Todo::from(updated_model))
    }

    /// Deletes a todo owned by `user_id`.
    ///
    /// # Returns
    ///
    /// The deleted `Todo`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo(&self, id: u32, user_id: u32) -> Result<Todo, TodoServiceError> {
        let todo_to_delete = self.find_owned(id, user_id).await?;

        todo::Entity::delete_by_id(todo_to_delete.id)
            .exec(self.db)
            .await?;
        Ok(Todo::from(todo_to_delete))
    }

    async fn find_owned(&self, id: u32, user_id: u32) -> Result<todo::Model, TodoServiceError> {
        todo::Entity::find_by_id(id as i32)
            .filter(todo::Column::UserId.eq(user_id as i32))
            .one(self.db)
            .await?
            .ok_or(TodoServiceError::NotFound(id))
    }
}
