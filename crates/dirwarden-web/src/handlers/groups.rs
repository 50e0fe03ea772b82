//! Group page handlers: list, create, membership management.

use std::collections::HashSet;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use axum::Form;
use dirwarden_core::Dn;
use dirwarden_directory::error::DirectoryError;
use tracing::info;

use super::{encode_segment, GroupRow, UserRow};
use crate::error::WebError;
use crate::models::{CreateGroupForm, MembershipParams};
use crate::router::AppState;

/// Group list page.
#[derive(Template)]
#[template(path = "list_groups.html")]
pub struct ListGroupsTemplate {
    pub groups: Vec<GroupRow>,
}

/// New-group form page.
#[derive(Template)]
#[template(path = "new_group.html")]
pub struct NewGroupTemplate;

/// Group detail page: members and candidates to add.
#[derive(Template)]
#[template(path = "edit_group.html")]
pub struct EditGroupTemplate {
    pub name: String,
    pub name_segment: String,
    pub members: Vec<UserRow>,
    pub non_members: Vec<UserRow>,
}

/// `GET /groups` - all group names.
pub async fn list_groups(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let names = state.group_repo.get_all_group_names().await?;
    let template = ListGroupsTemplate {
        groups: names.into_iter().map(GroupRow::new).collect(),
    };
    Ok(Html(template.render()?))
}

/// `GET /newGroup` - blank group form.
pub async fn new_group() -> Result<Html<String>, WebError> {
    Ok(Html(NewGroupTemplate.render()?))
}

/// `POST /groups` - create a group and redirect to its page.
pub async fn create_group(
    State(state): State<AppState>,
    Form(form): Form<CreateGroupForm>,
) -> Result<Redirect, WebError> {
    info!(group = %form.name, "creating group");
    let group = state
        .group_repo
        .create(dirwarden_directory::Group::new(form.name))
        .await?;
    Ok(Redirect::to(&format!(
        "/groups/{}",
        encode_segment(&group.name)
    )))
}

/// `GET /groups/:name` - group detail with resolved members and the
/// remaining users as add candidates.
pub async fn edit_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Html<String>, WebError> {
    let group = state.group_repo.find_by_name(&name).await?;

    // Member references are absolute DNs; the service strips the base
    // path before resolving them to user records.
    let members = state
        .user_service
        .find_all_members(group.members().iter())
        .await?;

    let member_ids: HashSet<&Dn> = members.iter().map(|u| &u.id).collect();
    let non_members: Vec<UserRow> = state
        .user_service
        .find_all()
        .await?
        .iter()
        .filter(|u| !member_ids.contains(&u.id))
        .map(UserRow::from)
        .collect();

    let template = EditGroupTemplate {
        name_segment: encode_segment(&group.name),
        name: group.name,
        members: members.iter().map(UserRow::from).collect(),
        non_members,
    };
    Ok(Html(template.render()?))
}

/// `POST /groups/:name/members` - add a user to the group.
pub async fn add_member(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Form(params): Form<MembershipParams>,
) -> Result<Redirect, WebError> {
    let mut group = state.group_repo.find_by_name(&name).await?;

    let user_id = Dn::parse(&params.user_id).map_err(DirectoryError::from)?;
    group.add_member(state.user_service.to_absolute_dn(&user_id));
    state.group_repo.save(group).await?;

    Ok(Redirect::to(&format!("/groups/{}", encode_segment(&name))))
}

/// `DELETE /groups/:name/members?userId=…` - remove a user from the
/// group.
pub async fn remove_member(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<MembershipParams>,
) -> Result<Redirect, WebError> {
    let mut group = state.group_repo.find_by_name(&name).await?;

    let user_id = Dn::parse(&params.user_id).map_err(DirectoryError::from)?;
    group.remove_member(&state.user_service.to_absolute_dn(&user_id));
    state.group_repo.save(group).await?;

    Ok(Redirect::to(&format!("/groups/{}", encode_segment(&name))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirwarden_directory::User;

    #[test]
    fn group_list_links_each_group() {
        let html = ListGroupsTemplate {
            groups: vec![GroupRow::new("engineers")],
        }
        .render()
        .unwrap();
        assert!(html.contains("/groups/engineers"));
    }

    #[test]
    fn group_detail_separates_members_from_candidates() {
        let member = User {
            id: Dn::parse("cn=Alice Smith,ou=people").unwrap(),
            full_name: "Alice Smith".into(),
            ..User::blank(1)
        };
        let candidate = User {
            id: Dn::parse("cn=Bob Jones,ou=people").unwrap(),
            full_name: "Bob Jones".into(),
            ..User::blank(2)
        };

        let html = EditGroupTemplate {
            name: "engineers".into(),
            name_segment: "engineers".into(),
            members: vec![UserRow::from(&member)],
            non_members: vec![UserRow::from(&candidate)],
        }
        .render()
        .unwrap();

        assert!(html.contains("Alice Smith"));
        assert!(html.contains("Bob Jones"));
        assert!(html.contains(r#"action="/groups/engineers/members""#));
    }
}
