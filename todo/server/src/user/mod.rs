use crate::entities::*;
use sea_orm::*;

pub mod password;

/// A registered user. The password hash never leaves this module.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct User {
    id: u32,
    email: String,
    name: String,
}

impl User {
    pub fn new(id: u32, email: String, name: String) -> Self {
        Self { id, email, name }
    }

    /// Returns the ID of the user.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the email the user signed up with.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        User::new(model.id as u32, model.email, model.name)
    }
}

/// Error type for UserService operations.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),
    #[error("No user with email '{0}'")]
    UserNotFound(String),
    #[error("Wrong password")]
    WrongPassword,
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Represents a failure to hash or parse a password hash.
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
}

pub struct UserService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl UserService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> UserService<'_> {
        UserService { db }
    }

    /// Registers a new user with a salted hash of `password`.
    ///
    /// Uniqueness of `email` is enforced by the unique constraint on `users.email`, so
    /// concurrent signups with the same email cannot both succeed.
    ///
    /// # Returns
    ///
    /// The created `User`, or `UserServiceError::DuplicateEmail` if the email is taken.
    #[tracing::instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        email: String,
        name: String,
        password: &str,
    ) -> Result<User, UserServiceError> {
        let password_hash = password::hash_password(password)?;
        let active_model = users::ActiveModel {
            email: ActiveValue::Set(email.clone()),
            name: ActiveValue::Set(name),
            password_hash: ActiveValue::Set(password_hash),
            ..Default::default()
        };

        match active_model.insert(self.db).await {
            Ok(created_model) => Ok(User::from(created_model)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(UserServiceError::DuplicateEmail(email))
            }
            Err(err) => Err(UserServiceError::Database(err)),
        }
    }

    /// Verifies an email/password pair.
    ///
    /// # Returns
    ///
    /// The matching `User`, `UserNotFound` for an unknown email, or `WrongPassword`.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let model = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| UserServiceError::UserNotFound(email.to_string()))?;

        if !password::verify_password(password, &model.password_hash)? {
            return Err(UserServiceError::WrongPassword);
        }
        Ok(User::from(model))
    }

    /// Overwrites the password hash of the user registered under `email`.
    ///
    /// The confirmation is checked before the user lookup, so a mismatch never touches
    /// the stored hash.
    #[tracing::instrument(skip(self, new_password, confirm_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), UserServiceError> {
        if new_password != confirm_password {
            return Err(UserServiceError::PasswordMismatch);
        }

        let model = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| UserServiceError::UserNotFound(email.to_string()))?;

        let mut active_model: users::ActiveModel = model.into();
        active_model.password_hash = ActiveValue::Set(password::hash_password(new_password)?);
        active_model.update(self.db).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, UserServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(self.db)
            .await?;
        Ok(model)
    }
}
