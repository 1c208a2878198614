//! One-shot messages carried across a redirect in a cookie.
//!
//! The cookie only ever holds a [`Flash`] key, so no user-controlled text round-trips
//! through it.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    EmailExists,
    PasswordUpdated,
    ActivityAdded,
    ActivityDeleted,
}

impl Flash {
    pub fn key(self) -> &'static str {
        match self {
            Flash::EmailExists => "email_exists",
            Flash::PasswordUpdated => "password_updated",
            Flash::ActivityAdded => "activity_added",
            Flash::ActivityDeleted => "activity_deleted",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "email_exists" => Some(Flash::EmailExists),
            "password_updated" => Some(Flash::PasswordUpdated),
            "activity_added" => Some(Flash::ActivityAdded),
            "activity_deleted" => Some(Flash::ActivityDeleted),
            _ => None,
        }
    }

    /// Returns the text shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            Flash::EmailExists => "Email exists. Login instead",
            Flash::PasswordUpdated => "Password updated successfully",
            Flash::ActivityAdded => "Activity added successfully",
            Flash::ActivityDeleted => "Deleted Successfully",
        }
    }
}

/// Queues `flash` for the next page that displays flashes.
pub fn set(jar: CookieJar, flash: Flash) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.key()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/"),
    )
}

/// Takes the pending flash, if any, and clears the cookie.
/// Unrecognised keys are cleared and dropped.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(key) = jar.get(FLASH_COOKIE).map(|cookie| cookie.value().to_owned()) else {
        return (jar, None);
    };

    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, Flash::from_key(&key))
}
