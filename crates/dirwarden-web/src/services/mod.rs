//! Service layer sitting between the HTTP handlers and the stores.

mod user_service;

pub use user_service::{UpdateStrategy, UserService, UserUpdate};
