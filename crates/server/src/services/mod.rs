//! Business logic sitting between handlers and repositories.

pub mod auth;
pub mod orders;
