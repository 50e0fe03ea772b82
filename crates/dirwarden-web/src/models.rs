//! Form and query models for the admin pages.

use dirwarden_core::Dn;
use dirwarden_directory::User;
use serde::Deserialize;

use crate::services::UserUpdate;

/// Optional `?name=` filter on the user list.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

/// New-user form post.
#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    pub employee_number: u32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub unit: String,
}

impl CreateUserForm {
    /// Build the user record to persist. The id is left blank; the
    /// store derives it from the attributes.
    #[must_use]
    pub fn into_user(self) -> User {
        User {
            id: Dn::default(),
            employee_number: self.employee_number,
            first_name: self.first_name,
            last_name: self.last_name,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            title: self.title,
            department: self.department,
            unit: self.unit,
        }
    }
}

/// Edit-user form post. Employee number and DN-forming attributes are
/// not part of the submitted set.
#[derive(Debug, Deserialize)]
pub struct UpdateUserForm {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub unit: String,
}

impl From<UpdateUserForm> for UserUpdate {
    fn from(form: UpdateUserForm) -> Self {
        UserUpdate {
            first_name: form.first_name,
            last_name: form.last_name,
            full_name: form.full_name,
            email: form.email,
            phone: form.phone,
            title: form.title,
            department: form.department,
            unit: form.unit,
        }
    }
}

/// New-group form post.
#[derive(Debug, Deserialize)]
pub struct CreateGroupForm {
    pub name: String,
}

/// Add/remove group member parameter (`userId`, as the forms post it).
#[derive(Debug, Deserialize)]
pub struct MembershipParams {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_form_leaves_id_for_the_store() {
        let form = CreateUserForm {
            employee_number: 10,
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            full_name: "Alice Smith".into(),
            email: String::new(),
            phone: String::new(),
            title: String::new(),
            department: String::new(),
            unit: String::new(),
        };
        let user = form.into_user();
        assert!(user.id.is_empty());
        assert_eq!(user.employee_number, 10);
    }

    #[test]
    fn membership_params_use_the_form_field_name() {
        let params: MembershipParams =
            serde_json::from_str(r#"{"userId":"cn=emp001,ou=people"}"#).unwrap();
        assert_eq!(params.user_id, "cn=emp001,ou=people");
    }
}
