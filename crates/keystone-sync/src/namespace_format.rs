//! Namespace name templating.
//!
//! Namespace names are rendered from a format string containing placeholders
//! for Keystone project identity data. The format is validated once at config
//! load time against the Kubernetes namespace name character rules; the
//! length cap is enforced at render time instead, because the substituted
//! values vary in length.

use std::{fmt::Display, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};

/// Maximum length of a Kubernetes namespace name (RFC 1123 label).
pub const MAX_NAMESPACE_NAME_LENGTH: usize = 63;

/// Placeholder for the Keystone project id. Required in every format string,
/// the project id is the only substitution that is guaranteed to be unique.
pub const PROJECT_ID_PLACEHOLDER: &str = "%i";
/// Placeholder for the Keystone project name.
pub const PROJECT_NAME_PLACEHOLDER: &str = "%n";
/// Placeholder for the Keystone domain name.
pub const DOMAIN_PLACEHOLDER: &str = "%d";

const NAMESPACE_NAME_FMT: &str = "[a-zA-Z0-9][a-zA-Z0-9_.-]*[a-zA-Z0-9]";
const NAMESPACE_NAME_ERROR_MSG: &str = "namespace name must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character";

// Probe value substituted for each placeholder when checking a format string
// against the name pattern. Two alphanumeric characters, so that a lone
// placeholder already satisfies the first/last character requirements.
const PLACEHOLDER_PROBE: &str = "aa";

static NAMESPACE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{NAMESPACE_NAME_FMT}$")).expect("failed to compile namespace name regex")
});

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display(
        "format string must comprise a {PROJECT_ID_PLACEHOLDER} substring (Keystone project id)"
    ))]
    MissingProjectIdPlaceholder,

    #[snafu(display("{NAMESPACE_NAME_ERROR_MSG}"))]
    InvalidFormat,
}

/// Format of automatically created namespace names.
///
/// May contain the placeholders `%i` (project id), `%n` (project name) and
/// `%d` (domain name). Defaults to `"%i"`, a namespace name containing just
/// the Keystone project id.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NamespaceFormat(String);

impl Default for NamespaceFormat {
    fn default() -> Self {
        Self(PROJECT_ID_PLACEHOLDER.to_owned())
    }
}

impl From<&str> for NamespaceFormat {
    fn from(format: &str) -> Self {
        Self(format.to_owned())
    }
}

impl Display for NamespaceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl NamespaceFormat {
    /// Checks that the format string can only render well-formed namespace
    /// names.
    ///
    /// The project id placeholder must be present, and the format with every
    /// placeholder substituted by a probe value must match the namespace name
    /// character rules. Length is not checked here, see [`NamespaceFormat::render`].
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.0.contains(PROJECT_ID_PLACEHOLDER),
            MissingProjectIdPlaceholderSnafu
        );

        let probe = self.substitute(PLACEHOLDER_PROBE, PLACEHOLDER_PROBE, PLACEHOLDER_PROBE);
        ensure!(NAMESPACE_NAME_REGEX.is_match(&probe), InvalidFormatSnafu);

        Ok(())
    }

    /// Renders a namespace name for the given project identity data.
    ///
    /// Every placeholder occurrence is replaced. If the rendered name exceeds
    /// [`MAX_NAMESPACE_NAME_LENGTH`] (the hard Kubernetes cap), it is
    /// discarded with a warning and the bare project id is used instead.
    pub fn render(&self, id: &str, name: &str, domain: &str) -> String {
        let namespace = self.substitute(id, name, domain);

        if namespace.len() > MAX_NAMESPACE_NAME_LENGTH {
            tracing::warn!(
                namespace = %namespace,
                project_id = %id,
                "generated namespace name exceeds the maximum length of {MAX_NAMESPACE_NAME_LENGTH} characters, using the bare project id instead"
            );
            return id.to_owned();
        }

        namespace
    }

    // Replaces every placeholder in a single pass over the original format
    // string. Substituted values are never re-expanded, an id containing "%n"
    // stays literal. Unknown %-sequences pass through and are left for
    // validate() to reject.
    fn substitute(&self, id: &str, name: &str, domain: &str) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            match rest.as_bytes().get(1) {
                Some(b'i') => {
                    out.push_str(id);
                    rest = &rest[2..];
                }
                Some(b'n') => {
                    out.push_str(name);
                    rest = &rest[2..];
                }
                Some(b'd') => {
                    out.push_str(domain);
                    rest = &rest[2..];
                }
                _ => {
                    out.push('%');
                    rest = &rest[1..];
                }
            }
        }

        out.push_str(rest);
        out
    }
}
