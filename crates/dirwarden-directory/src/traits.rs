//! Store capability traits consumed by the service layer.
//!
//! Both traits are object-safe so the service can hold
//! `Arc<dyn UserRepo>` / `Arc<dyn GroupRepo>` and tests can substitute
//! in-memory fakes.

use async_trait::async_trait;
use dirwarden_core::Dn;

use crate::error::DirectoryResult;
use crate::types::{Group, User};

/// Name of the well-known group every created user is added to.
pub const USER_GROUP: &str = "users";

/// User store, keyed by relative DN.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Look up a single user. `NotFound` when the id does not resolve.
    async fn find_one(&self, id: &Dn) -> DirectoryResult<User>;

    /// All users in the user container.
    async fn find_all(&self) -> DirectoryResult<Vec<User>>;

    /// Batch lookup by relative ids. Ids that do not resolve are
    /// skipped (a member reference can dangle transiently while a
    /// rename is in flight).
    async fn find_all_by_ids(&self, ids: &[Dn]) -> DirectoryResult<Vec<User>>;

    /// Persist the user and return it as stored.
    ///
    /// The returned user's `id` may differ from the input's when
    /// DN-forming attributes changed: the store performs the rename
    /// itself and reports the new identifier back.
    async fn save(&self, user: User) -> DirectoryResult<User>;

    /// Users whose full name contains the given fragment.
    async fn find_by_full_name_contains(&self, fragment: &str) -> DirectoryResult<Vec<User>>;
}

/// Group store, keyed by group name and queryable by member DN.
#[async_trait]
pub trait GroupRepo: Send + Sync {
    /// Look up a group by name. `NotFound` when absent.
    async fn find_by_name(&self, name: &str) -> DirectoryResult<Group>;

    /// All groups whose membership contains the given **absolute** DN.
    async fn find_by_member(&self, member: &Dn) -> DirectoryResult<Vec<Group>>;

    /// Persist membership changes to an existing group.
    async fn save(&self, group: Group) -> DirectoryResult<Group>;

    /// Names of all groups in the group container.
    async fn get_all_group_names(&self) -> DirectoryResult<Vec<String>>;

    /// Create a new group entry.
    async fn create(&self, group: Group) -> DirectoryResult<Group>;
}
