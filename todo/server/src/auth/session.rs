//! Server-side login sessions.
//!
//! The browser only holds an opaque random token; the user it belongs to and its expiry
//! live in the `sessions` table.

use crate::entities::{session, users};
use crate::user::User;
use sea_orm::*;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Session {
    token: String,
    user_id: u32,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    /// Returns the opaque token stored in the session cookie.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.expires_at
    }
}

/// Error type for SessionService operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionServiceError {
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// The requested lifetime pushes the expiry past the representable range.
    #[error("Session lifetime of {0} is out of range")]
    TtlOutOfRange(chrono::Duration),
}

pub struct SessionService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl SessionService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> SessionService<'_> {
        SessionService { db }
    }

    /// Opens a session for `user_id` that stays valid for `ttl`.
    ///
    /// Sessions that have already expired are swept out first.
    #[tracing::instrument(skip(self))]
    pub async fn create_session(
        &self,
        user_id: u32,
        ttl: chrono::Duration,
    ) -> Result<Session, SessionServiceError> {
        let expires_at = chrono::Utc::now()
            .checked_add_signed(ttl)
            .ok_or(SessionServiceError::TtlOutOfRange(ttl))?;
        self.delete_expired_sessions().await?;

        let token = uuid::Uuid::new_v4().to_string();

        let active_model = session::ActiveModel {
            id: ActiveValue::Set(token.clone()),
            user_id: ActiveValue::Set(user_id as i32),
            expires_at: ActiveValue::Set(expires_at.timestamp()),
        };
        active_model.insert(self.db).await?;

        Ok(Session {
            token,
            user_id,
            expires_at,
        })
    }

    /// Resolves a session token to its user.
    ///
    /// Returns `Ok(None)` when the token is unknown, expired, or its user no longer
    /// exists. Expired and dangling sessions are deleted on the way out.
    #[tracing::instrument(skip(self, token))]
    pub async fn resolve_user(&self, token: &str) -> Result<Option<User>, SessionServiceError> {
        let Some((session, user)) = session::Entity::find_by_id(token.to_owned())
            .find_also_related(users::Entity)
            .one(self.db)
            .await?
        else {
            return Ok(None);
        };

        match user {
            Some(user) if session.expires_at > chrono::Utc::now().timestamp() => {
                Ok(Some(User::from(user)))
            }
            _ => {
                tracing::info!("Discarding stale session for user {}", session.user_id);
                self.delete_session(token).await?;
                Ok(None)
            }
        }
    }

    /// Deletes a session. Unknown tokens are ignored.
    #[tracing::instrument(skip(self, token))]
    pub async fn delete_session(&self, token: &str) -> Result<(), SessionServiceError> {
        session::Entity::delete_by_id(token.to_owned())
            .exec(self.db)
            .await?;
        Ok(())
    }

    /// Deletes every session whose expiry has passed.
    ///
    /// # Returns
    ///
    /// The number of sessions removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_expired_sessions(&self) -> Result<u64, SessionServiceError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(chrono::Utc::now().timestamp()))
            .exec(self.db)
            .await?;
        if result.rows_affected > 0 {
            tracing::info!("Removed {} expired sessions", result.rows_affected);
        }
        Ok(result.rows_affected)
    }
}
