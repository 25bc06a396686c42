//! Configuration for synchronization between Keystone and Kubernetes.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use snafu::{ResultExt, Snafu, ensure};

use crate::namespace_format::{self, NamespaceFormat};

/// The closed set of data types this library knows how to sync. Only Keystone
/// projects are supported.
pub const ALLOWED_DATA_TYPES_TO_SYNC: &[&str] = &["projects"];

#[derive(Debug, Snafu)]
pub enum ValidationError {
    #[snafu(transparent)]
    NamespaceFormat { source: namespace_format::Error },

    #[snafu(display(
        "unsupported data type to sync {data_type:?}, available values: {}",
        allowed.join(", ")
    ))]
    UnsupportedDataType {
        data_type: String,
        allowed: Vec<String>,
    },
}

#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(display("failed to read sync config file {path:?}"))]
    Read {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse sync config document"))]
    Parse { source: serde_yaml::Error },
}

/// Sync configuration, usually loaded from a YAML document.
///
/// Fields absent from the document retain their defaults (overlay semantics).
/// Loading never validates; callers invoke [`SyncConfig::validate`] as a
/// separate step, so a programmatically built config goes through the same
/// check as one read from a file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct SyncConfig {
    /// Data types enabled for synchronization. All supported types by default.
    #[serde(default = "default_data_types_to_sync")]
    pub data_types_to_sync: Vec<String>,

    /// Format of automatically created namespace names.
    #[serde(default)]
    pub namespace_format: NamespaceFormat,

    /// Keystone project ids excluded from syncing.
    #[serde(default, rename = "projects_black_list")]
    pub project_black_list: BTreeSet<String>,
}

fn default_data_types_to_sync() -> Vec<String> {
    ALLOWED_DATA_TYPES_TO_SYNC
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_types_to_sync: default_data_types_to_sync(),
            namespace_format: NamespaceFormat::default(),
            project_black_list: BTreeSet::new(),
        }
    }
}

impl SyncConfig {
    /// Parses a YAML document, overlaying fields present in the document onto
    /// the defaults. An empty document yields [`SyncConfig::default`].
    pub fn from_yaml(document: &[u8]) -> Result<Self, LoadError> {
        let value: serde_yaml::Value = serde_yaml::from_slice(document).context(ParseSnafu)?;
        if value.is_null() {
            return Ok(Self::default());
        }

        serde_yaml::from_value(value).context(ParseSnafu)
    }

    /// Loads a sync config from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let document = std::fs::read(path)
            .inspect_err(|error| {
                tracing::error!(path = %path.display(), %error, "failed to read sync config file");
            })
            .context(ReadSnafu { path })?;

        Self::from_yaml(&document)
    }

    /// Checks the namespace format and that only allowed data types are
    /// enabled for synchronization.
    ///
    /// `allowed_data_types` is the closed set of supported data type tags,
    /// [`ALLOWED_DATA_TYPES_TO_SYNC`] for the current feature set; it is
    /// injected so that supporting a new data type is a data change, not a
    /// logic change.
    pub fn validate(&self, allowed_data_types: &[&str]) -> Result<(), ValidationError> {
        self.namespace_format.validate()?;

        for data_type in &self.data_types_to_sync {
            ensure!(
                allowed_data_types.contains(&data_type.as_str()),
                UnsupportedDataTypeSnafu {
                    data_type,
                    allowed: allowed_data_types
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>(),
                }
            );
        }

        Ok(())
    }
}
