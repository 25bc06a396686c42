//! Binding of share access credentials to Kubernetes secrets.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::{ByteString, api::core::v1::Secret};
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use snafu::{ResultExt, Snafu};

/// Key-value byte payload of a secret.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Errors reported by the secret store client, propagated verbatim: an
/// already-exists or not-found condition surfaces to the caller unchanged.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create secret {name:?} in namespace {namespace:?}"))]
    CreateSecret {
        source: StoreError,
        name: String,
        namespace: String,
    },

    #[snafu(display("failed to delete secret {name:?} from namespace {namespace:?}"))]
    DeleteSecret {
        source: StoreError,
        name: String,
        namespace: String,
    },
}

/// Derives the name of the secret holding the access credential of a share.
pub fn secret_name(share_id: &str) -> String {
    format!("manila-{share_id}")
}

/// Client contract for the cluster secret store.
#[async_trait]
pub trait SecretStore {
    async fn create_secret(
        &self,
        name: &str,
        namespace: &str,
        data: SecretData,
    ) -> Result<(), StoreError>;

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl SecretStore for kube::Client {
    async fn create_secret(
        &self,
        name: &str,
        namespace: &str,
        data: SecretData,
    ) -> Result<(), StoreError> {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                ..ObjectMeta::default()
            },
            data: Some(
                data.into_iter()
                    .map(|(key, value)| (key, ByteString(value)))
                    .collect(),
            ),
            ..Secret::default()
        };

        let api = Api::<Secret>::namespaced(self.clone(), namespace);
        api.create(&PostParams::default(), &secret).await?;

        Ok(())
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), StoreError> {
        let api = Api::<Secret>::namespaced(self.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;

        Ok(())
    }
}

/// Creates and deletes per-share access credential secrets.
///
/// The secret name is a pure function of the share id, so bind and unbind for
/// the same share always address the same object. There is no update path, a
/// secret is created once and deleted once; enforcing at-most-once creation
/// is the caller's responsibility via share id uniqueness.
#[derive(Debug)]
pub struct SecretBinder<S> {
    store: S,
}

impl<S: SecretStore> SecretBinder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stores `data` as the secret for `share_id` in `namespace`.
    pub async fn bind(&self, share_id: &str, namespace: &str, data: SecretData) -> Result<(), Error> {
        let name = secret_name(share_id);
        self.store
            .create_secret(&name, namespace, data)
            .await
            .context(CreateSecretSnafu { name, namespace })
    }

    /// Removes the secret for `share_id` from `namespace`.
    pub async fn unbind(&self, share_id: &str, namespace: &str) -> Result<(), Error> {
        let name = secret_name(share_id);
        self.store
            .delete_secret(&name, namespace)
            .await
            .context(DeleteSecretSnafu { name, namespace })
    }
}
