//! Application identity

/// Who the application is.
///
/// Only `short_name` participates in path and keystore-file construction;
/// the other fields are informational (startup header, tooling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    /// Short name / abbreviation; used in every constructed path.
    pub short_name: String,
    /// Full display name.
    pub full_name: String,
    /// Version string.
    pub version: String,
    /// One-line description.
    pub description: String,
}

impl AppIdentity {
    /// Assemble an identity.
    pub fn new(
        short_name: impl Into<String>,
        full_name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            short_name: short_name.into(),
            full_name: full_name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}
