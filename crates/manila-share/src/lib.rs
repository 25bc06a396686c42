//! Provisioning of Manila share access credentials into Kubernetes.
//!
//! Granting access to a share is a two-phase protocol: the backend
//! acknowledges the grant immediately but generates the access key
//! out-of-band. [`AccessProvisioner`] drives the grant and the bounded wait
//! for the key to appear; [`SecretBinder`] persists the resulting credential
//! as a namespaced secret named deterministically after the share.
//!
//! The OpenStack client and the cluster secret store are reached through the
//! [`ShareBackend`] and [`SecretStore`] seams; a [`SecretStore`]
//! implementation for [`kube::Client`] is provided.

pub mod access;
pub mod secret;
pub mod share;

pub use access::{AccessProvisioner, AccessRight, GrantAccessOpts, PollPolicy, ShareBackend};
pub use secret::{SecretBinder, SecretStore, secret_name};
pub use share::{ExportLocation, Share, split_export_location};
