//! SeaORM entities for the `users`, `todo` and `sessions` tables.

pub mod session;
pub mod todo;
pub mod users;
