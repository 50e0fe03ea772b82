//! User store backed by `inetOrgPerson` entries.

use std::collections::HashSet;

use async_trait::async_trait;
use dirwarden_core::{Dn, DnResolver, Rdn};
use ldap3::{Mod, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use super::{check_result, escape_filter_value, first_attr, map_search_err, LdapHandle};
use crate::error::{DirectoryError, DirectoryResult};
use crate::traits::UserRepo;
use crate::types::User;

const USER_FILTER: &str = "(objectClass=inetOrgPerson)";

const USER_ATTRS: [&str; 9] = [
    "cn",
    "sn",
    "givenName",
    "mail",
    "telephoneNumber",
    "title",
    "departmentNumber",
    "ou",
    "employeeNumber",
];

/// User repository over the configured user container.
///
/// The entry DN is derived from attributes (`cn=<full name>` inside the
/// container), so [`UserRepo::save`] renames the entry when the full
/// name changed and reports the new relative id back to the caller.
#[derive(Debug, Clone)]
pub struct LdapUserRepo {
    handle: LdapHandle,
    resolver: DnResolver,
    container: Dn,
}

impl LdapUserRepo {
    /// Create a repository sharing the given connection handle.
    pub fn new(handle: LdapHandle, resolver: DnResolver) -> DirectoryResult<Self> {
        let container = Dn::parse(&handle.config().user_container)?;
        Ok(Self {
            handle,
            resolver,
            container,
        })
    }

    /// Relative DN the store derives for this user's attributes.
    fn derive_id(&self, user: &User) -> Dn {
        Dn::from_rdns(vec![Rdn::new("cn", user.full_name.as_str())]).append(&self.container)
    }

    fn entry_to_user(&self, entry: &SearchEntry) -> DirectoryResult<User> {
        let absolute = Dn::parse(&entry.dn)?;
        let id = self.resolver.to_relative(&absolute)?;
        Ok(User {
            id,
            employee_number: first_attr(entry, "employeeNumber").parse().unwrap_or(0),
            first_name: first_attr(entry, "givenName"),
            last_name: first_attr(entry, "sn"),
            full_name: first_attr(entry, "cn"),
            email: first_attr(entry, "mail"),
            phone: first_attr(entry, "telephoneNumber"),
            title: first_attr(entry, "title"),
            department: first_attr(entry, "departmentNumber"),
            unit: first_attr(entry, "ou"),
        })
    }

    /// Attribute replacements for an update. `cn` is not here: the
    /// naming attribute changes through modify-DN, never modify.
    fn attribute_mods(user: &User) -> Vec<Mod<String>> {
        fn replace(attr: &str, value: &str) -> Mod<String> {
            let mut values = HashSet::new();
            if !value.is_empty() {
                values.insert(value.to_string());
            }
            Mod::Replace(attr.to_string(), values)
        }

        vec![
            replace("sn", &user.last_name),
            replace("givenName", &user.first_name),
            replace("mail", &user.email),
            replace("telephoneNumber", &user.phone),
            replace("title", &user.title),
            replace("departmentNumber", &user.department),
            replace("ou", &user.unit),
            replace("employeeNumber", &user.employee_number.to_string()),
        ]
    }

    /// Full attribute set for a new entry.
    fn entry_attributes(user: &User) -> Vec<(String, HashSet<String>)> {
        fn single(attr: &str, value: String) -> Option<(String, HashSet<String>)> {
            if value.is_empty() {
                return None;
            }
            let mut values = HashSet::new();
            values.insert(value);
            Some((attr.to_string(), values))
        }

        let object_classes: HashSet<String> = [
            "top",
            "person",
            "organizationalPerson",
            "inetOrgPerson",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let mut attrs = vec![("objectClass".to_string(), object_classes)];
        attrs.extend(
            [
                single("cn", user.full_name.clone()),
                single("sn", user.last_name.clone()),
                single("givenName", user.first_name.clone()),
                single("mail", user.email.clone()),
                single("telephoneNumber", user.phone.clone()),
                single("title", user.title.clone()),
                single("departmentNumber", user.department.clone()),
                single("ou", user.unit.clone()),
                single("employeeNumber", user.employee_number.to_string()),
            ]
            .into_iter()
            .flatten(),
        );
        attrs
    }

    async fn search_users(&self, filter: &str) -> DirectoryResult<Vec<User>> {
        let mut ldap = self.handle.get().await?;
        let base = self.handle.config().user_base_dn();

        let result = ldap
            .search(&base, Scope::Subtree, filter, USER_ATTRS.to_vec())
            .await
            .map_err(|e| DirectoryError::search_failed_with_source("user search failed", e))?;

        let (entries, _res) = result.success().map_err(|e| map_search_err(&base, e))?;

        entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| self.entry_to_user(&entry))
            .collect()
    }
}

#[async_trait]
impl UserRepo for LdapUserRepo {
    #[instrument(skip(self))]
    async fn find_one(&self, id: &Dn) -> DirectoryResult<User> {
        let mut ldap = self.handle.get().await?;
        let absolute = self.resolver.to_absolute(id).to_string();

        let result = ldap
            .search(&absolute, Scope::Base, USER_FILTER, USER_ATTRS.to_vec())
            .await
            .map_err(|e| DirectoryError::search_failed_with_source("user lookup failed", e))?;

        let (entries, _res) = result
            .success()
            .map_err(|e| map_search_err(&id.to_string(), e))?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::not_found(id.to_string()))?;

        self.entry_to_user(&SearchEntry::construct(entry))
    }

    async fn find_all(&self) -> DirectoryResult<Vec<User>> {
        self.search_users(USER_FILTER).await
    }

    async fn find_all_by_ids(&self, ids: &[Dn]) -> DirectoryResult<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            match self.find_one(id).await {
                Ok(user) => users.push(user),
                Err(e) if e.is_not_found() => {
                    // A member reference can dangle while a rename is
                    // in flight; skip rather than fail the whole page.
                    warn!(id = %id, "member reference does not resolve, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(users)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn save(&self, user: User) -> DirectoryResult<User> {
        let mut ldap = self.handle.get().await?;
        let derived = self.derive_id(&user);
        let target_absolute = self.resolver.to_absolute(&derived).to_string();

        // A blank id means this user has never been persisted.
        if user.id.is_empty() {
            let result = ldap
                .add(&target_absolute, Self::entry_attributes(&user))
                .await
                .map_err(|e| {
                    DirectoryError::write_failed_with_source(
                        format!("failed to create entry {target_absolute}"),
                        e,
                    )
                })?;
            check_result("add", &target_absolute, result.rc, &result.text)?;

            info!(dn = %target_absolute, "user entry created");
            return Ok(User { id: derived, ..user });
        }

        let current_absolute = self.resolver.to_absolute(&user.id).to_string();

        if derived != user.id {
            // DN-forming attributes changed: rename first, then apply
            // the remaining attribute modifications at the new DN.
            let new_rdn = Rdn::new("cn", user.full_name.as_str()).to_string();
            let result = ldap
                .modifydn(&current_absolute, &new_rdn, true, None)
                .await
                .map_err(|e| {
                    DirectoryError::write_failed_with_source(
                        format!("failed to rename entry {current_absolute}"),
                        e,
                    )
                })?;
            check_result("modifydn", &current_absolute, result.rc, &result.text)?;
            debug!(from = %current_absolute, to = %target_absolute, "user entry renamed");
        }

        let result = ldap
            .modify(&target_absolute, Self::attribute_mods(&user))
            .await
            .map_err(|e| {
                DirectoryError::write_failed_with_source(
                    format!("failed to update entry {target_absolute}"),
                    e,
                )
            })?;
        check_result("modify", &target_absolute, result.rc, &result.text)?;

        Ok(User { id: derived, ..user })
    }

    async fn find_by_full_name_contains(&self, fragment: &str) -> DirectoryResult<Vec<User>> {
        let filter = format!(
            "(&{USER_FILTER}(cn=*{}*))",
            escape_filter_value(fragment)
        );
        self.search_users(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryConfig;

    fn repo() -> LdapUserRepo {
        let config = DirectoryConfig::new(
            "ldap.example.com",
            "dc=example,dc=com",
            "cn=admin,dc=example,dc=com",
        );
        let resolver = DnResolver::parse(&config.base_dn).unwrap();
        LdapUserRepo::new(LdapHandle::new(config).unwrap(), resolver).unwrap()
    }

    fn sample_user() -> User {
        User {
            id: Dn::parse("cn=Alice Smith,ou=people").unwrap(),
            employee_number: 7,
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            full_name: "Alice Smith".into(),
            email: "alice@example.com".into(),
            phone: "555-0100".into(),
            title: "Engineer".into(),
            department: "R&D".into(),
            unit: "Platform".into(),
        }
    }

    #[test]
    fn derived_id_follows_full_name() {
        let repo = repo();
        let user = sample_user();
        assert_eq!(repo.derive_id(&user), user.id);

        let mut renamed = user;
        renamed.full_name = "Alice Jones".into();
        assert_eq!(
            repo.derive_id(&renamed).to_string(),
            "cn=Alice Jones,ou=people"
        );
    }

    #[test]
    fn derived_id_escapes_special_characters() {
        let repo = repo();
        let mut user = sample_user();
        user.full_name = "Smith, Alice".into();
        assert_eq!(
            repo.derive_id(&user).to_string(),
            "cn=Smith\\, Alice,ou=people"
        );
    }

    #[test]
    fn attribute_mods_do_not_touch_cn() {
        let mods = LdapUserRepo::attribute_mods(&sample_user());
        for m in &mods {
            if let Mod::Replace(attr, _) = m {
                assert_ne!(attr, "cn");
            }
        }
        assert_eq!(mods.len(), 8);
    }

    #[test]
    fn entry_attributes_skip_empty_values() {
        let mut user = sample_user();
        user.phone = String::new();
        let attrs = LdapUserRepo::entry_attributes(&user);
        assert!(attrs.iter().all(|(name, _)| name != "telephoneNumber"));
        assert!(attrs.iter().any(|(name, _)| name == "objectClass"));
    }
}
