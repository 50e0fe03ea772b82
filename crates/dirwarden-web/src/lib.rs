//! # dirwarden-web
//!
//! The administration front-end: the [`services::UserService`] that
//! keeps user identity and group membership consistent, and the axum
//! handlers plus askama templates that expose it as server-rendered
//! HTML pages and form posts.

pub mod departments;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use departments::DepartmentCatalog;
pub use error::WebError;
pub use router::{app_router, AppState};
pub use services::{UpdateStrategy, UserService, UserUpdate};
