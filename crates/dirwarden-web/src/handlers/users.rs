//! User page handlers: list/search, create, edit.

use std::sync::atomic::Ordering;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use axum::Form;
use tracing::info;

use super::{encode_segment, UserRow};
use crate::error::WebError;
use crate::models::{CreateUserForm, SearchQuery, UpdateUserForm};
use crate::router::AppState;

/// User list page.
#[derive(Template)]
#[template(path = "list_users.html")]
pub struct ListUsersTemplate {
    pub users: Vec<UserRow>,
    pub query: String,
}

/// Edit-user form page.
#[derive(Template)]
#[template(path = "edit_user.html")]
pub struct EditUserTemplate {
    pub user: UserRow,
    pub departments: Vec<String>,
    pub departments_json: String,
}

/// New-user form page.
#[derive(Template)]
#[template(path = "new_user.html")]
pub struct NewUserTemplate {
    pub employee_number: u32,
    pub departments: Vec<String>,
    pub departments_json: String,
}

/// `GET /` and `GET /users` - list users, optionally filtered by a
/// full-name fragment.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, WebError> {
    let name = query.name.unwrap_or_default();
    let users = if name.trim().is_empty() {
        state.user_service.find_all().await?
    } else {
        state.user_service.search_by_name(name.trim()).await?
    };

    let template = ListUsersTemplate {
        users: users.iter().map(UserRow::from).collect(),
        query: name,
    };
    Ok(Html(template.render()?))
}

/// `GET /users/:user_id` - edit form for one user.
pub async fn edit_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Html<String>, WebError> {
    let user = state.user_service.find_user(&user_id).await?;

    let template = EditUserTemplate {
        user: UserRow::from(&user),
        departments: state
            .departments
            .department_names()
            .map(str::to_string)
            .collect(),
        departments_json: state.departments.as_json(),
    };
    Ok(Html(template.render()?))
}

/// `POST /users/:user_id` - apply the form post and redirect to the
/// user's page under its (possibly new) identifier.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Form(form): Form<UpdateUserForm>,
) -> Result<Redirect, WebError> {
    let saved = state.user_service.update_user(&user_id, form.into()).await?;
    Ok(Redirect::to(&format!(
        "/users/{}",
        encode_segment(&saved.id.to_string())
    )))
}

/// `GET /newuser` - blank form with the next employee number assigned.
pub async fn new_user(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let employee_number = state.next_employee_number.fetch_add(1, Ordering::SeqCst);

    let template = NewUserTemplate {
        employee_number,
        departments: state
            .departments
            .department_names()
            .map(str::to_string)
            .collect(),
        departments_json: state.departments.as_json(),
    };
    Ok(Html(template.render()?))
}

/// `POST /newuser` - create the user and redirect to its page.
pub async fn create_user(
    State(state): State<AppState>,
    Form(form): Form<CreateUserForm>,
) -> Result<Redirect, WebError> {
    info!(full_name = %form.full_name, "creating user");
    let saved = state.user_service.create_user(form.into_user()).await?;
    Ok(Redirect::to(&format!(
        "/users/{}",
        encode_segment(&saved.id.to_string())
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirwarden_core::Dn;
    use dirwarden_directory::User;

    fn alice() -> User {
        User {
            id: Dn::parse("cn=Alice Smith,ou=people").unwrap(),
            employee_number: 7,
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            full_name: "Alice Smith".into(),
            email: "alice@example.com".into(),
            phone: "555-0100".into(),
            title: "Engineer".into(),
            department: "Engineering".into(),
            unit: "Platform".into(),
        }
    }

    #[test]
    fn list_template_renders_rows_and_edit_links() {
        let user = alice();
        let html = ListUsersTemplate {
            users: vec![UserRow::from(&user)],
            query: String::new(),
        }
        .render()
        .unwrap();
        assert!(html.contains("Alice Smith"));
        assert!(html.contains("/users/cn%3DAlice%20Smith%2Cou%3Dpeople"));
    }

    #[test]
    fn edit_template_posts_back_to_the_user_path() {
        let user = alice();
        let html = EditUserTemplate {
            user: UserRow::from(&user),
            departments: vec!["Engineering".into()],
            departments_json: r#"{"Engineering":["Platform"]}"#.into(),
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"action="/users/cn%3DAlice%20Smith%2Cou%3Dpeople""#));
        assert!(html.contains("alice@example.com"));
    }

    #[test]
    fn new_user_template_carries_employee_number() {
        let html = NewUserTemplate {
            employee_number: 11,
            departments: vec!["Engineering".into()],
            departments_json: "{}".into(),
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"name="employee_number" value="11""#));
    }
}
