//! Router assembly and shared application state.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use dirwarden_directory::GroupRepo;

use crate::departments::DepartmentCatalog;
use crate::handlers::{groups, users};
use crate::services::UserService;

/// Shared state for all page handlers.
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub group_repo: Arc<dyn GroupRepo>,
    pub departments: Arc<DepartmentCatalog>,
    /// Next employee number handed out by the new-user form.
    pub next_employee_number: Arc<AtomicU32>,
}

impl AppState {
    /// Assemble the state. Employee numbering starts at 10, below
    /// which the seed data lives.
    pub fn new(
        user_service: UserService,
        group_repo: Arc<dyn GroupRepo>,
        departments: DepartmentCatalog,
    ) -> Self {
        Self {
            user_service: Arc::new(user_service),
            group_repo,
            departments: Arc::new(departments),
            next_employee_number: Arc::new(AtomicU32::new(10)),
        }
    }
}

/// Build the application router.
///
/// # Routes
///
/// - `GET /`, `GET /users` - user list with optional `?name=` search
/// - `GET /users/:user_id` - edit form; `POST` applies the update
/// - `GET /newuser` - new-user form; `POST` creates the user
/// - `GET /groups` - group list; `POST` creates a group
/// - `GET /newGroup` - new-group form
/// - `GET /groups/:name` - group detail
/// - `POST /groups/:name/members` - add member;
///   `DELETE` (with `?userId=`) removes one
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(users::list_users))
        .route("/users", get(users::list_users))
        .route(
            "/users/:user_id",
            get(users::edit_user).post(users::update_user),
        )
        .route("/newuser", get(users::new_user).post(users::create_user))
        .route(
            "/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route("/newGroup", get(groups::new_group))
        .route("/groups/:name", get(groups::edit_group))
        .route(
            "/groups/:name/members",
            axum::routing::post(groups::add_member).delete(groups::remove_member),
        )
        .with_state(state)
}
