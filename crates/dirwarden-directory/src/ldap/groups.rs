//! Group store backed by `groupOfNames` entries.

use std::collections::HashSet;

use async_trait::async_trait;
use dirwarden_core::{Dn, DnResolver, Rdn};
use ldap3::{Mod, Scope, SearchEntry};
use tracing::{info, instrument};

use super::{all_attrs, check_result, escape_filter_value, first_attr, map_search_err, LdapHandle};
use crate::error::{DirectoryError, DirectoryResult};
use crate::traits::GroupRepo;
use crate::types::Group;

const GROUP_FILTER: &str = "(objectClass=groupOfNames)";

const GROUP_ATTRS: [&str; 2] = ["cn", "member"];

/// Group repository over the configured group container.
///
/// The `member` attribute holds absolute DNs, exactly as they appear
/// in [`Group::members`].
#[derive(Debug, Clone)]
pub struct LdapGroupRepo {
    handle: LdapHandle,
    resolver: DnResolver,
    container: Dn,
}

impl LdapGroupRepo {
    /// Create a repository sharing the given connection handle.
    pub fn new(handle: LdapHandle, resolver: DnResolver) -> DirectoryResult<Self> {
        let container = Dn::parse(&handle.config().group_container)?;
        Ok(Self {
            handle,
            resolver,
            container,
        })
    }

    /// Absolute DN of the entry for a group name.
    fn group_dn(&self, name: &str) -> String {
        let relative = Dn::from_rdns(vec![Rdn::new("cn", name)]).append(&self.container);
        self.resolver.to_absolute(&relative).to_string()
    }

    fn entry_to_group(entry: &SearchEntry) -> DirectoryResult<Group> {
        let name = first_attr(entry, "cn");
        let mut members = Vec::new();
        for raw in all_attrs(entry, "member") {
            members.push(Dn::parse(raw)?);
        }
        Ok(Group::with_members(name, members))
    }

    async fn search_groups(&self, filter: &str) -> DirectoryResult<Vec<Group>> {
        let mut ldap = self.handle.get().await?;
        let base = self.handle.config().group_base_dn();

        let result = ldap
            .search(&base, Scope::Subtree, filter, GROUP_ATTRS.to_vec())
            .await
            .map_err(|e| DirectoryError::search_failed_with_source("group search failed", e))?;

        let (entries, _res) = result.success().map_err(|e| map_search_err(&base, e))?;

        entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| Self::entry_to_group(&entry))
            .collect()
    }

    fn member_values(group: &Group) -> HashSet<String> {
        group.members().iter().map(Dn::to_string).collect()
    }
}

#[async_trait]
impl GroupRepo for LdapGroupRepo {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> DirectoryResult<Group> {
        let mut ldap = self.handle.get().await?;
        let dn = self.group_dn(name);

        let result = ldap
            .search(&dn, Scope::Base, GROUP_FILTER, GROUP_ATTRS.to_vec())
            .await
            .map_err(|e| DirectoryError::search_failed_with_source("group lookup failed", e))?;

        let (entries, _res) = result.success().map_err(|e| map_search_err(name, e))?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::not_found(name))?;

        Self::entry_to_group(&SearchEntry::construct(entry))
    }

    #[instrument(skip(self), fields(member = %member))]
    async fn find_by_member(&self, member: &Dn) -> DirectoryResult<Vec<Group>> {
        let filter = format!(
            "(&{GROUP_FILTER}(member={}))",
            escape_filter_value(&member.to_string())
        );
        self.search_groups(&filter).await
    }

    #[instrument(skip(self, group), fields(group = %group.name))]
    async fn save(&self, group: Group) -> DirectoryResult<Group> {
        let mut ldap = self.handle.get().await?;
        let dn = self.group_dn(&group.name);

        let mods = vec![Mod::Replace(
            "member".to_string(),
            Self::member_values(&group),
        )];

        let result = ldap.modify(&dn, mods).await.map_err(|e| {
            DirectoryError::write_failed_with_source(format!("failed to update group {dn}"), e)
        })?;
        check_result("modify", &group.name, result.rc, &result.text)?;

        Ok(group)
    }

    async fn get_all_group_names(&self) -> DirectoryResult<Vec<String>> {
        let groups = self.search_groups(GROUP_FILTER).await?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    #[instrument(skip(self, group), fields(group = %group.name))]
    async fn create(&self, group: Group) -> DirectoryResult<Group> {
        let mut ldap = self.handle.get().await?;
        let dn = self.group_dn(&group.name);

        let object_classes: HashSet<String> = ["top", "groupOfNames"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut names = HashSet::new();
        names.insert(group.name.clone());

        let mut attrs = vec![
            ("objectClass".to_string(), object_classes),
            ("cn".to_string(), names),
        ];
        let members = Self::member_values(&group);
        if !members.is_empty() {
            attrs.push(("member".to_string(), members));
        }

        let result = ldap.add(&dn, attrs).await.map_err(|e| {
            DirectoryError::write_failed_with_source(format!("failed to create group {dn}"), e)
        })?;
        check_result("add", &group.name, result.rc, &result.text)?;

        info!(dn = %dn, "group entry created");
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryConfig;

    fn repo() -> LdapGroupRepo {
        let config = DirectoryConfig::new(
            "ldap.example.com",
            "dc=example,dc=com",
            "cn=admin,dc=example,dc=com",
        );
        let resolver = DnResolver::parse(&config.base_dn).unwrap();
        LdapGroupRepo::new(LdapHandle::new(config).unwrap(), resolver).unwrap()
    }

    #[test]
    fn group_dn_lives_in_group_container() {
        assert_eq!(
            repo().group_dn("engineers"),
            "cn=engineers,ou=groups,dc=example,dc=com"
        );
    }

    #[test]
    fn member_values_render_absolute_dns() {
        let group = Group::with_members(
            "engineers",
            [Dn::parse("cn=emp001,ou=people,dc=example,dc=com").unwrap()],
        );
        let values = LdapGroupRepo::member_values(&group);
        assert!(values.contains("cn=emp001,ou=people,dc=example,dc=com"));
    }
}
