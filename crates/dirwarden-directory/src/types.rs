//! Domain models owned by the directory stores.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use dirwarden_core::Dn;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Which directory product's write semantics apply.
///
/// Active Directory clears a group's `member` reference as a side
/// effect of renaming the referenced entry, which forces the update
/// path to capture group membership before writing. Standard LDAP
/// servers keep membership references intact across a modify-DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryType {
    Standard,
    ActiveDirectory,
}

impl FromStr for DirectoryType {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "ldap" | "openldap" => Ok(DirectoryType::Standard),
            "ad" | "active_directory" | "activedirectory" => Ok(DirectoryType::ActiveDirectory),
            other => Err(DirectoryError::invalid_configuration(format!(
                "unknown directory type '{other}' (expected 'standard' or 'ad')"
            ))),
        }
    }
}

impl Display for DirectoryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryType::Standard => write!(f, "standard"),
            DirectoryType::ActiveDirectory => write!(f, "active_directory"),
        }
    }
}

/// A directory user.
///
/// `id` is the relative distinguished name under the configured base
/// path, and it is mutable: the user store derives the DN from
/// attributes, so a save can come back with a different `id` than it
/// went in with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Relative DN (e.g. `cn=Alice Smith,ou=people`).
    pub id: Dn,
    pub employee_number: u32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub title: String,
    pub department: String,
    pub unit: String,
}

impl User {
    /// A blank user record, as rendered into the new-user form.
    #[must_use]
    pub fn blank(employee_number: u32) -> Self {
        Self {
            id: Dn::default(),
            employee_number,
            first_name: String::new(),
            last_name: String::new(),
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            title: String::new(),
            department: String::new(),
            unit: String::new(),
        }
    }
}

/// A directory group, identified by name.
///
/// Members are **absolute** DNs (base path included) - never relative
/// ones. The set has no meaningful order; `BTreeSet` gives
/// deterministic iteration for rendering and comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    members: BTreeSet<Dn>,
}

impl Group {
    /// An empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
        }
    }

    /// A group with the given absolute member DNs.
    pub fn with_members(name: impl Into<String>, members: impl IntoIterator<Item = Dn>) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().collect(),
        }
    }

    /// The member references, in deterministic order.
    #[must_use]
    pub fn members(&self) -> &BTreeSet<Dn> {
        &self.members
    }

    /// Add a member reference. The DN must be absolute.
    pub fn add_member(&mut self, member: Dn) {
        self.members.insert(member);
    }

    /// Remove a member reference. Returns whether it was present.
    pub fn remove_member(&mut self, member: &Dn) -> bool {
        self.members.remove(member)
    }

    /// Whether the given absolute DN is a member.
    #[must_use]
    pub fn has_member(&self, member: &Dn) -> bool {
        self.members.contains(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn directory_type_parsing() {
        assert_eq!(
            "standard".parse::<DirectoryType>().unwrap(),
            DirectoryType::Standard
        );
        assert_eq!(
            "AD".parse::<DirectoryType>().unwrap(),
            DirectoryType::ActiveDirectory
        );
        assert_eq!(
            "active_directory".parse::<DirectoryType>().unwrap(),
            DirectoryType::ActiveDirectory
        );
        assert!("novell".parse::<DirectoryType>().is_err());
    }

    #[test]
    fn group_membership_is_a_set() {
        let mut group = Group::new("engineers");
        let member = dn("cn=emp001,ou=people,dc=example,dc=com");

        group.add_member(member.clone());
        group.add_member(member.clone());
        assert_eq!(group.members().len(), 1);
        assert!(group.has_member(&member));

        assert!(group.remove_member(&member));
        assert!(!group.remove_member(&member));
        assert!(group.members().is_empty());
    }

    #[test]
    fn group_member_order_is_deterministic() {
        let group = Group::with_members(
            "engineers",
            [
                dn("cn=b,ou=people,dc=example,dc=com"),
                dn("cn=a,ou=people,dc=example,dc=com"),
            ],
        );
        let rendered: Vec<String> = group.members().iter().map(Dn::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "cn=a,ou=people,dc=example,dc=com",
                "cn=b,ou=people,dc=example,dc=com"
            ]
        );
    }

    #[test]
    fn blank_user_carries_employee_number() {
        let user = User::blank(42);
        assert_eq!(user.employee_number, 42);
        assert!(user.id.is_empty());
        assert!(user.full_name.is_empty());
    }
}
