//! # dirwarden-directory
//!
//! Store layer for dirwarden: the capability traits the service layer
//! consumes ([`UserRepo`], [`GroupRepo`]), the domain models they trade
//! in, and ldap3-backed implementations speaking to a live LDAP or
//! Active Directory server.
//!
//! The repositories are deliberately thin CRUD plumbing. All identity
//! reconciliation logic lives above them in `dirwarden-web`; down here
//! the one piece of intelligence is that [`ldap::LdapUserRepo::save`]
//! renames the entry (modify-DN) when DN-forming attributes changed,
//! returning the user under its new relative identifier.

pub mod config;
pub mod error;
pub mod ldap;
pub mod populator;
pub mod traits;
pub mod types;

pub use config::DirectoryConfig;
pub use error::DirectoryError;
pub use ldap::{LdapGroupRepo, LdapHandle, LdapUserRepo};
pub use populator::LdifPopulator;
pub use traits::{GroupRepo, UserRepo, USER_GROUP};
pub use types::{DirectoryType, Group, User};
