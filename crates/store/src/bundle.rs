use serde::{Deserialize, Serialize};

/// Where a bundle was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum BundleOrigin {
    Direct,
    Archive,
    Repository { url: String },
}

/// One entry of a downloaded archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMember {
    pub name: String,
    /// Uncompressed size in bytes, as declared by the archive.
    pub size: u64,
}

/// A manifest paired with raw source text. Transient; consumed by the validator.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBundle {
    /// The identifier the caller asked for.
    pub requested_id: String,
    /// Manifest document as served, not yet checked for required fields.
    pub manifest: serde_json::Value,
    pub source: String,
    /// Every archive member, for archive-mode bundles only.
    pub members: Option<Vec<ArchiveMember>>,
    pub origin: BundleOrigin,
}

impl ResolvedBundle {
    /// Total uncompressed size of all archive members.
    pub fn unpacked_size(&self) -> Option<u64> {
        self.members
            .as_ref()
            .map(|members| members.iter().map(|m| m.size).sum())
    }
}
