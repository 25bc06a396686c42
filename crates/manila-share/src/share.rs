//! Share types reported by the backend.

use snafu::Snafu;

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse address and location from export location {path:?}"))]
    MalformedExportLocation { path: String },
}

/// A Manila share, identified by an opaque backend id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Share {
    pub id: String,
    pub name: String,
}

/// An export location reported by the share backend, describing how to mount
/// a share.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExportLocation {
    pub path: String,
    pub preferred: bool,
}

impl ExportLocation {
    /// Splits the location path into its address and location parts, see
    /// [`split_export_location`].
    pub fn split(&self) -> Result<(&str, &str), Error> {
        split_export_location(&self.path)
    }
}

/// Splits an export location path `"addr1:port,addr2:port,...:/location"`
/// into its address and location parts.
///
/// Addresses may themselves embed colons (IPv6 addresses, port suffixes), so
/// the last occurrence of ':' is the delimiter, and it must not be the first
/// character.
pub fn split_export_location(path: &str) -> Result<(&str, &str), Error> {
    match path.rfind(':') {
        Some(pos) if pos > 0 => Ok((&path[..pos], &path[pos + 1..])),
        _ => MalformedExportLocationSnafu { path }.fail(),
    }
}
