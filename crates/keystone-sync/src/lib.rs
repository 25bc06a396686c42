//! Primitives for syncing Keystone identity data into a Kubernetes cluster.
//!
//! [`SyncConfig`] describes what gets synced: the enabled data types, the
//! [`NamespaceFormat`] used to derive namespace names from project identity
//! data, and the project black list. Loading and validation are separate
//! steps, so a programmatically built config goes through the same checks as
//! one read from a file.

pub mod namespace_format;
pub mod sync_config;

pub use namespace_format::NamespaceFormat;
pub use sync_config::{ALLOWED_DATA_TYPES_TO_SYNC, SyncConfig};
