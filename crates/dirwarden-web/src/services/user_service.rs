//! User management over the directory stores.
//!
//! The interesting part of this service is the update path. A user's
//! DN is derived from its attributes, so an attribute edit can rename
//! the entry - and group membership references store DNs by absolute
//! path, so a rename invalidates every reference to the old DN. The
//! service rewrites those references as part of the update, with an
//! ordering that depends on the directory flavor (see
//! [`UpdateStrategy`]).

use std::sync::Arc;

use dirwarden_core::{Dn, DnResolver};
use dirwarden_directory::error::DirectoryResult;
use dirwarden_directory::{DirectoryType, Group, GroupRepo, User, UserRepo, USER_GROUP};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// How the update path orders the user write against the group
/// membership lookup.
///
/// Selected once at construction from the configured directory flavor
/// and dispatched through a single branch; each variant is its own
/// testable code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Write the user first; look up affected groups by the old DN
    /// afterwards, and only when the identifier actually changed. The
    /// old DN is still known from the input, independent of the
    /// write, so deferring the lookup avoids a group query on every
    /// rename-free update.
    Standard,

    /// The directory clears a group's stored member reference as a
    /// side effect of renaming the referenced entry (Active Directory
    /// behaves this way), destroying the "was this entry a member of
    /// group G" information the moment the write completes. Group
    /// membership must therefore be captured *before* the user write,
    /// at the cost of performing the lookup even when no rename
    /// occurs.
    ClearsMembershipOnRename,
}

impl UpdateStrategy {
    /// Strategy for a directory flavor.
    #[must_use]
    pub fn for_directory(directory_type: DirectoryType) -> Self {
        match directory_type {
            DirectoryType::Standard => UpdateStrategy::Standard,
            DirectoryType::ActiveDirectory => UpdateStrategy::ClearsMembershipOnRename,
        }
    }
}

/// The attribute set an update applies.
///
/// Employee number and DN-forming attributes are derived, never passed
/// directly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub title: String,
    pub department: String,
    pub unit: String,
}

impl UserUpdate {
    fn apply_to(&self, user: &mut User) {
        user.first_name = self.first_name.clone();
        user.last_name = self.last_name.clone();
        user.full_name = self.full_name.clone();
        user.email = self.email.clone();
        user.phone = self.phone.clone();
        user.title = self.title.clone();
        user.department = self.department.clone();
        user.unit = self.unit.clone();
    }
}

/// User management service.
///
/// Performs a strictly ordered sequence of store calls per request; no
/// internal parallelism, locking, or retries. Concurrency control for
/// racing updates to the same entry is left to the directory server.
pub struct UserService {
    user_repo: Arc<dyn UserRepo>,
    group_repo: Arc<dyn GroupRepo>,
    resolver: DnResolver,
    strategy: UpdateStrategy,
}

impl UserService {
    /// Create a service over the given stores.
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        group_repo: Arc<dyn GroupRepo>,
        resolver: DnResolver,
        directory_type: DirectoryType,
    ) -> Self {
        Self {
            user_repo,
            group_repo,
            resolver,
            strategy: UpdateStrategy::for_directory(directory_type),
        }
    }

    /// The update strategy in effect.
    #[must_use]
    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    /// The well-known group every created user is added to.
    pub async fn user_group(&self) -> DirectoryResult<Group> {
        self.group_repo.find_by_name(USER_GROUP).await
    }

    /// All users.
    pub async fn find_all(&self) -> DirectoryResult<Vec<User>> {
        self.user_repo.find_all().await
    }

    /// Look up a user by its relative id in string form.
    pub async fn find_user(&self, user_id: &str) -> DirectoryResult<User> {
        debug!(user_id, "looking up user");
        let id = Dn::parse(user_id)?;
        self.user_repo.find_one(&id).await
    }

    /// Create a user and add it to the well-known default group.
    #[instrument(skip(self, user), fields(employee_number = user.employee_number))]
    pub async fn create_user(&self, user: User) -> DirectoryResult<User> {
        let saved = self.user_repo.save(user).await?;

        let mut user_group = self.user_group().await?;
        // The DN in the member attribute must be absolute.
        user_group.add_member(self.to_absolute_dn(&saved.id));
        self.group_repo.save(user_group).await?;

        info!(user_id = %saved.id, "user created");
        Ok(saved)
    }

    /// Relative identifier → absolute DN.
    #[must_use]
    pub fn to_absolute_dn(&self, relative: &Dn) -> Dn {
        self.resolver.to_absolute(relative)
    }

    /// Resolve absolute member references to user records.
    ///
    /// Group members are stored as absolute DNs; the base path is
    /// stripped from each before the user lookup.
    pub async fn find_all_members<'a, I>(&self, absolute_ids: I) -> DirectoryResult<Vec<User>>
    where
        I: IntoIterator<Item = &'a Dn>,
    {
        let mut relative_ids = Vec::new();
        for id in absolute_ids {
            let relative = self.resolver.to_relative(id)?;
            if !relative_ids.contains(&relative) {
                relative_ids.push(relative);
            }
        }
        self.user_repo.find_all_by_ids(&relative_ids).await
    }

    /// Users whose full name contains the fragment.
    pub async fn search_by_name(&self, fragment: &str) -> DirectoryResult<Vec<User>> {
        self.user_repo.find_by_full_name_contains(fragment).await
    }

    /// Apply an attribute update to the user with the given id.
    ///
    /// If the update changes DN-forming attributes the store renames
    /// the entry, and every group referencing the old absolute DN is
    /// rewritten to reference the new one before this returns.
    ///
    /// Group rewrites are not atomic: a write failure part-way through
    /// the loop leaves already-rewritten groups correct and the rest
    /// still pointing at the old DN until the caller resubmits. The
    /// directory provides no cross-entry transaction to do better.
    #[instrument(skip(self, update), fields(full_name = %update.full_name))]
    pub async fn update_user(&self, user_id: &str, update: UserUpdate) -> DirectoryResult<User> {
        info!(
            user_id,
            full_name = %update.full_name,
            department = %update.department,
            "updating user"
        );

        let original_id = Dn::parse(user_id)?;
        let mut existing = self.user_repo.find_one(&original_id).await?;
        update.apply_to(&mut existing);

        match self.strategy {
            UpdateStrategy::Standard => self.update_user_standard(original_id, existing).await,
            UpdateStrategy::ClearsMembershipOnRename => {
                self.update_user_capturing(original_id, existing).await
            }
        }
    }

    /// Write first, reconcile after - the old DN identifies affected
    /// groups even after the write, so no lookup is spent when the id
    /// did not change.
    async fn update_user_standard(&self, original_id: Dn, user: User) -> DirectoryResult<User> {
        let saved = self.user_repo.save(user).await?;

        if saved.id != original_id {
            // The user has moved - group references must follow.
            let old_member_dn = self.to_absolute_dn(&original_id);
            let new_member_dn = self.to_absolute_dn(&saved.id);

            let groups = self.group_repo.find_by_member(&old_member_dn).await?;
            self.update_group_references(groups, &old_member_dn, &new_member_dn)
                .await?;
        }
        Ok(saved)
    }

    /// Capture membership before the write. Once the rename lands the
    /// directory has already dropped the old references, so the lookup
    /// must happen first - on every update, rename or not.
    async fn update_user_capturing(&self, original_id: Dn, user: User) -> DirectoryResult<User> {
        let old_member_dn = self.to_absolute_dn(&original_id);
        let groups = self.group_repo.find_by_member(&old_member_dn).await?;

        let saved = self.user_repo.save(user).await?;

        if saved.id != original_id {
            // The user has moved - restore membership at the new DN.
            let new_member_dn = self.to_absolute_dn(&saved.id);
            self.update_group_references(groups, &old_member_dn, &new_member_dn)
                .await?;
        }
        Ok(saved)
    }

    /// Swap the member reference in each affected group and persist it.
    /// No inter-group ordering dependency; no rollback on failure.
    async fn update_group_references(
        &self,
        groups: Vec<Group>,
        old_member_dn: &Dn,
        new_member_dn: &Dn,
    ) -> DirectoryResult<()> {
        for mut group in groups {
            group.remove_member(old_member_dn);
            group.add_member(new_member_dn.clone());

            debug!(group = %group.name, "rewriting membership reference");
            self.group_repo.save(group).await?;
        }
        Ok(())
    }
}
