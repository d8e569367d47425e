//! Relation data access and aggregation
//!
//! A relation is a named key/value data-exchange channel between deployed
//! units; each connected peer publishes its own attribute map per relation
//! instance. This crate provides:
//!
//! - [`RelationStore`]: read/write access to that store, either through the
//!   hook environment's tools ([`HookEnv`]) or in memory for tests
//!   ([`MemoryRelations`]).
//! - The aggregation rules that turn raw, possibly-incomplete peer data into
//!   typed values: BGP peer address lists, the security-groups flag, and the
//!   first-complete field scan used by the etcd proxy decision.

pub mod aggregate;
pub mod error;
pub mod store;

pub use aggregate::{
    AddressFamily, addresses_for, first_complete, parse_flag, security_groups_enabled,
};
pub use error::{Error, Result};
pub use store::{HookEnv, MemoryRelations, RelationId, RelationStore, UnitId};
