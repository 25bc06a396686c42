//! Share access provisioning.
//!
//! The reference CephFS backend acknowledges a grant-access request
//! immediately but generates the access key out-of-band, so the key has to be
//! queried for separately by subsequent list-access-rights calls. Provisioning
//! therefore runs as two phases: grant, then poll until the key appears,
//! bounded by a wall-clock budget.

use std::time::Duration;

use async_trait::async_trait;
use snafu::{ResultExt, Snafu};
use tokio::time::{Instant, sleep};

use crate::share::Share;

/// Access type tag of the reference CephFS backend.
pub const CEPHX_ACCESS_TYPE: &str = "cephx";
/// Read-write access level.
pub const ACCESS_LEVEL_RW: &str = "rw";

/// Errors reported by the share backend client. The client is a black box to
/// this library, so its errors are carried opaquely.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to grant access to share {share_id:?}"))]
    GrantAccess {
        source: BackendError,
        share_id: String,
    },

    #[snafu(display("failed to list access rights for share {share_id:?}"))]
    ListAccessRights {
        source: BackendError,
        share_id: String,
    },

    #[snafu(display(
        "unexpected number of access rights for share {share_id:?}: got {count}, expected 1"
    ))]
    InconsistentAccessRights { share_id: String, count: usize },

    #[snafu(display("timed out after {budget:?} waiting for the access key of share {share_id:?}"))]
    AccessKeyTimeout {
        share_id: String,
        budget: Duration,
    },
}

/// An access right granted on a share.
///
/// `access_key` is populated asynchronously by the backend after the grant is
/// acknowledged; it stays empty until the credential is ready.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccessRight {
    pub id: String,
    pub share_id: String,
    pub access_type: String,
    pub access_to: String,
    pub access_level: String,
    pub access_key: String,
    pub state: String,
}

/// Options for a grant-access request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GrantAccessOpts {
    pub access_type: String,
    pub access_to: String,
    pub access_level: String,
}

impl GrantAccessOpts {
    /// The fixed grant issued for the CephFS reference backend: cephx
    /// protocol, read-write level, keyed to the share name.
    pub fn cephx(access_to: impl Into<String>) -> Self {
        Self {
            access_type: CEPHX_ACCESS_TYPE.to_owned(),
            access_to: access_to.into(),
            access_level: ACCESS_LEVEL_RW.to_owned(),
        }
    }
}

/// Client contract for the share backend's access-rights API.
#[async_trait]
pub trait ShareBackend {
    async fn grant_access(
        &self,
        share_id: &str,
        opts: &GrantAccessOpts,
    ) -> Result<(), BackendError>;

    async fn list_access_rights(&self, share_id: &str) -> Result<Vec<AccessRight>, BackendError>;
}

/// Polling cadence for [`AccessProvisioner::provision`]: the budget is
/// checked once per round, before sleeping one interval and polling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub budget: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            budget: Duration::from_secs(120),
        }
    }
}

/// Grants access to a share and waits for the backend to publish the access
/// key.
///
/// The provisioner holds no internal locking. The backend is expected to hold
/// at most one access right per share, so callers must not run two
/// provisioning sequences for the same share concurrently.
#[derive(Debug)]
pub struct AccessProvisioner<B> {
    backend: B,
    policy: PollPolicy,
}

impl<B: ShareBackend> AccessProvisioner<B> {
    pub fn new(backend: B) -> Self {
        Self::with_policy(backend, PollPolicy::default())
    }

    pub fn with_policy(backend: B, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    /// Runs the grant/await sequence for `share` and returns the access right
    /// once its access key is populated.
    ///
    /// A failed grant is fatal and returned immediately. Duplicate grants are
    /// rejected by the backend, so the grant is never retried here.
    pub async fn provision(&self, share: &Share) -> Result<AccessRight, Error> {
        self.backend
            .grant_access(&share.id, &GrantAccessOpts::cephx(&share.name))
            .await
            .context(GrantAccessSnafu {
                share_id: share.id.as_str(),
            })?;

        self.await_access_key(&share.id).await
    }

    // Polls the backend until the single expected access right carries a
    // non-empty access key. A poll failure or more than one access right
    // aborts the wait immediately; an exhausted budget is a distinct,
    // retryable timeout.
    async fn await_access_key(&self, share_id: &str) -> Result<AccessRight, Error> {
        let start = Instant::now();

        loop {
            if start.elapsed() >= self.policy.budget {
                return AccessKeyTimeoutSnafu {
                    share_id,
                    budget: self.policy.budget,
                }
                .fail();
            }

            sleep(self.policy.interval).await;

            let access_rights = self
                .backend
                .list_access_rights(share_id)
                .await
                .context(ListAccessRightsSnafu { share_id })?;

            match access_rights.as_slice() {
                [] => tracing::debug!(share_id, "share has no access right yet, polling again"),
                [right] if right.access_key.is_empty() => {
                    tracing::debug!(share_id, "access key not yet populated, polling again");
                }
                [right] => return Ok(right.clone()),
                _ => {
                    return InconsistentAccessRightsSnafu {
                        share_id,
                        count: access_rights.len(),
                    }
                    .fail();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[derive(Clone, Debug)]
    enum PollStep {
        Rights(Vec<AccessRight>),
        Fail(&'static str),
    }

    /// Backend fake that replays a scripted sequence of poll responses,
    /// repeating the final step once the script is exhausted.
    struct ScriptedBackend {
        grant_failure: Option<&'static str>,
        granted: Arc<Mutex<Vec<GrantAccessOpts>>>,
        polls: Mutex<VecDeque<PollStep>>,
        exhausted: PollStep,
    }

    impl ScriptedBackend {
        fn new(steps: impl IntoIterator<Item = PollStep>, exhausted: PollStep) -> Self {
            Self {
                grant_failure: None,
                granted: Arc::new(Mutex::new(Vec::new())),
                polls: Mutex::new(steps.into_iter().collect()),
                exhausted,
            }
        }

        fn failing_grant(message: &'static str) -> Self {
            Self {
                grant_failure: Some(message),
                ..Self::new([], PollStep::Rights(vec![]))
            }
        }
    }

    #[async_trait]
    impl ShareBackend for ScriptedBackend {
        async fn grant_access(
            &self,
            _share_id: &str,
            opts: &GrantAccessOpts,
        ) -> Result<(), BackendError> {
            if let Some(message) = self.grant_failure {
                return Err(message.into());
            }
            self.granted.lock().unwrap().push(opts.clone());
            Ok(())
        }

        async fn list_access_rights(
            &self,
            _share_id: &str,
        ) -> Result<Vec<AccessRight>, BackendError> {
            let step = self
                .polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.exhausted.clone());

            match step {
                PollStep::Rights(rights) => Ok(rights),
                PollStep::Fail(message) => Err(message.into()),
            }
        }
    }

    fn share() -> Share {
        Share {
            id: "share-1".to_owned(),
            name: "myshare".to_owned(),
        }
    }

    fn access_right(key: &str) -> AccessRight {
        AccessRight {
            id: "right-1".to_owned(),
            share_id: "share-1".to_owned(),
            access_type: CEPHX_ACCESS_TYPE.to_owned(),
            access_to: "myshare".to_owned(),
            access_level: ACCESS_LEVEL_RW.to_owned(),
            access_key: key.to_owned(),
            state: "active".to_owned(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn provision_waits_for_the_access_key() {
        let backend = ScriptedBackend::new(
            [
                PollStep::Rights(vec![]),
                PollStep::Rights(vec![access_right("")]),
            ],
            PollStep::Rights(vec![access_right("AQD9yTRf")]),
        );
        let provisioner = AccessProvisioner::new(backend);

        let right = provisioner.provision(&share()).await.unwrap();
        assert_eq!(right, access_right("AQD9yTRf"));
    }

    #[tokio::test(start_paused = true)]
    async fn provision_issues_a_cephx_rw_grant() {
        let backend = ScriptedBackend::new([], PollStep::Rights(vec![access_right("AQD9yTRf")]));
        let granted = Arc::clone(&backend.granted);
        let provisioner = AccessProvisioner::new(backend);

        provisioner.provision(&share()).await.unwrap();

        assert_eq!(
            granted.lock().unwrap().as_slice(),
            &[GrantAccessOpts::cephx("myshare")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_grant_is_fatal() {
        let backend = ScriptedBackend::failing_grant("quota exceeded");
        let provisioner = AccessProvisioner::new(backend);

        let err = provisioner.provision(&share()).await.unwrap_err();
        assert!(matches!(err, Error::GrantAccess { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_aborts_the_wait() {
        let backend = ScriptedBackend::new([], PollStep::Fail("manila is unreachable"));
        let provisioner = AccessProvisioner::new(backend);

        let start = Instant::now();
        let err = provisioner.provision(&share()).await.unwrap_err();

        assert!(matches!(err, Error::ListAccessRights { .. }));
        assert!(start.elapsed() < PollPolicy::default().budget);
    }

    #[tokio::test(start_paused = true)]
    async fn multiple_access_rights_fail_immediately() {
        let backend = ScriptedBackend::new(
            [],
            PollStep::Rights(vec![access_right("a"), access_right("b")]),
        );
        let provisioner = AccessProvisioner::new(backend);

        let start = Instant::now();
        let err = provisioner.provision(&share()).await.unwrap_err();

        assert!(matches!(err, Error::InconsistentAccessRights { count: 2, .. }));
        assert!(start.elapsed() < PollPolicy::default().budget);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_access_key_times_out_after_the_full_budget() {
        let backend = ScriptedBackend::new([], PollStep::Rights(vec![access_right("")]));
        let policy = PollPolicy::default();
        let provisioner = AccessProvisioner::with_policy(backend, policy);

        let start = Instant::now();
        let err = provisioner.provision(&share()).await.unwrap_err();

        assert!(matches!(err, Error::AccessKeyTimeout { .. }));
        assert!(start.elapsed() >= policy.budget);
    }
}
