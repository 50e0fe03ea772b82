//! # dirwarden-core
//!
//! Distinguished-name value types shared by every dirwarden crate.
//!
//! A [`Dn`] is an ordered sequence of `attribute=value` components,
//! most-specific first. Two representations matter throughout the
//! system: *relative* DNs (scoped under a known base path) identify
//! users in the user store, while group membership references are
//! always *absolute* (base path included). [`DnResolver`] converts
//! between the two against a fixed base configured once at startup.
//!
//! Everything in this crate is pure and synchronous; no directory
//! connection is needed to exercise it.

mod dn;

pub use dn::{Dn, DnError, DnResolver, Rdn};
