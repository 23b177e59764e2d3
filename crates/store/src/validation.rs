//! Package validation.
//!
//! Checks run in a fixed order: manifest shape, archive size ceiling, then
//! permission inspection. Validation never mutates the bundle. Flagged
//! permissions are reported, not rejected; whether to accept them is the
//! caller's policy.

use std::fmt;

use hatch_types::PackageManifest;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::bundle::ResolvedBundle;

/// Default ceiling on the total uncompressed size of an archive (10 MiB).
pub const DEFAULT_MAX_UNPACKED_SIZE: u64 = 10 * 1024 * 1024;

pub const DEFAULT_FLAGGED_PERMISSIONS: [&str; 4] = [
    "filesystem:write",
    "network:unrestricted",
    "process:spawn",
    "shell:execute",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("manifest is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("archive unpacks to {actual} bytes, limit is {limit}")]
    ArchiveTooLarge { actual: u64, limit: u64 },

    /// Raised by the installer when the host refuses flagged packages.
    #[error("package requests flagged permissions: {}", join_flagged(.0))]
    FlaggedPermissions(Vec<FlaggedPermission>),
}

fn join_flagged(flagged: &[FlaggedPermission]) -> String {
    flagged
        .iter()
        .map(|f| f.permission.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagRule {
    /// Listed in [`ValidatorConfig::flagged_permissions`].
    DenyListed,
    /// `*` or `<scope>:*`.
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedPermission {
    pub permission: String,
    pub rule: FlagRule,
}

impl fmt::Display for FlaggedPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule {
            FlagRule::DenyListed => write!(f, "{} (deny-listed)", self.permission),
            FlagRule::Wildcard => write!(f, "{} (wildcard)", self.permission),
        }
    }
}

/// A bundle that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub manifest: PackageManifest,
    pub flagged: Vec<FlaggedPermission>,
}

impl ValidationReport {
    pub fn is_flagged(&self) -> bool {
        !self.flagged.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub max_unpacked_size: u64,
    pub flagged_permissions: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_unpacked_size: DEFAULT_MAX_UNPACKED_SIZE,
            flagged_permissions: DEFAULT_FLAGGED_PERMISSIONS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn validate(&self, bundle: &ResolvedBundle) -> Result<ValidationReport, ValidationError> {
        let manifest = parse_manifest(&bundle.manifest)?;

        if manifest.id != bundle.requested_id {
            warn!(
                requested = %bundle.requested_id,
                declared = %manifest.id,
                "Manifest id differs from the requested id"
            );
        }
        if manifest.semver().is_none() {
            warn!(id = %manifest.id, version = %manifest.version, "Version is not semver");
        }

        if let Some(actual) = bundle.unpacked_size() {
            if actual > self.config.max_unpacked_size {
                return Err(ValidationError::ArchiveTooLarge {
                    actual,
                    limit: self.config.max_unpacked_size,
                });
            }
        }

        let flagged = self.flag_permissions(&manifest.permissions);
        if !flagged.is_empty() {
            warn!(
                id = %manifest.id,
                flagged = %join_flagged(&flagged),
                "Package requests flagged permissions"
            );
        }

        Ok(ValidationReport { manifest, flagged })
    }

    /// Permissions that match the deny-list or grant a wildcard.
    pub fn flag_permissions(&self, permissions: &[String]) -> Vec<FlaggedPermission> {
        permissions
            .iter()
            .filter_map(|permission| {
                let normalized = permission.trim().to_ascii_lowercase();
                let rule = if normalized == "*" || normalized.ends_with(":*") {
                    FlagRule::Wildcard
                } else if self
                    .config
                    .flagged_permissions
                    .iter()
                    .any(|denied| denied.eq_ignore_ascii_case(&normalized))
                {
                    FlagRule::DenyListed
                } else {
                    return None;
                };

                Some(FlaggedPermission {
                    permission: permission.clone(),
                    rule,
                })
            })
            .collect()
    }
}

/// Check required fields before handing the document to serde, so a missing
/// field is reported by name.
fn parse_manifest(raw: &serde_json::Value) -> Result<PackageManifest, ValidationError> {
    let Some(object) = raw.as_object() else {
        return Err(ValidationError::InvalidManifest(
            "manifest is not a JSON object".to_string(),
        ));
    };

    for field in ["id", "version"] {
        match object.get(field).and_then(|value| value.as_str()) {
            Some(value) if !value.trim().is_empty() => {}
            _ => return Err(ValidationError::MissingField(field)),
        }
    }

    serde_json::from_value(raw.clone()).map_err(|e| ValidationError::InvalidManifest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::bundle::{ArchiveMember, BundleOrigin};

    fn bundle(manifest: serde_json::Value) -> ResolvedBundle {
        ResolvedBundle {
            requested_id: "com.example.sample".to_string(),
            manifest,
            source: "export function activate() {}".to_string(),
            members: None,
            origin: BundleOrigin::Direct,
        }
    }

    #[test]
    fn test_minimal_manifest_passes() {
        let report = Validator::default()
            .validate(&bundle(json!({"id": "com.example.sample", "version": "1.0.0"})))
            .unwrap();

        assert_eq!(report.manifest.id, "com.example.sample");
        assert!(!report.is_flagged());
    }

    #[test]
    fn test_required_fields() {
        let validator = Validator::default();

        assert_eq!(
            validator.validate(&bundle(json!({"version": "1.0.0"}))),
            Err(ValidationError::MissingField("id"))
        );
        assert_eq!(
            validator.validate(&bundle(json!({"id": "a", "version": "  "}))),
            Err(ValidationError::MissingField("version"))
        );
        assert_eq!(
            validator.validate(&bundle(json!({"id": 7, "version": "1.0.0"}))),
            Err(ValidationError::MissingField("id"))
        );
        assert!(matches!(
            validator.validate(&bundle(json!(["id", "version"]))),
            Err(ValidationError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_loosely_typed_optional_fields_are_accepted() {
        let report = Validator::default()
            .validate(&bundle(json!({
                "id": "a",
                "version": "1.0.0",
                "name": null,
                "author": {"name": "Ada", "url": "https://example.com"},
                "permissions": null,
            })))
            .unwrap();

        assert_eq!(report.manifest.author.as_deref(), Some("Ada"));
        assert_eq!(report.manifest.display_name(), "a");
        assert!(!report.is_flagged());
    }

    #[test]
    fn test_single_string_permission_is_checked() {
        let report = Validator::default()
            .validate(&bundle(json!({"id": "a", "version": "1.0.0", "permissions": "*"})))
            .unwrap();

        assert_eq!(
            report.flagged,
            vec![FlaggedPermission {
                permission: "*".to_string(),
                rule: FlagRule::Wildcard,
            }]
        );
    }

    #[test]
    fn test_archive_size_ceiling() {
        let mut oversized = bundle(json!({"id": "a", "version": "1.0.0"}));
        oversized.origin = BundleOrigin::Archive;
        oversized.members = Some(vec![
            ArchiveMember {
                name: "index.js".to_string(),
                size: 1024,
            },
            ArchiveMember {
                name: "assets/blob.bin".to_string(),
                size: DEFAULT_MAX_UNPACKED_SIZE,
            },
        ]);

        assert_eq!(
            Validator::default().validate(&oversized),
            Err(ValidationError::ArchiveTooLarge {
                actual: DEFAULT_MAX_UNPACKED_SIZE + 1024,
                limit: DEFAULT_MAX_UNPACKED_SIZE,
            })
        );
    }

    #[test]
    fn test_size_at_ceiling_passes() {
        let mut exact = bundle(json!({"id": "a", "version": "1.0.0"}));
        exact.members = Some(vec![ArchiveMember {
            name: "index.js".to_string(),
            size: DEFAULT_MAX_UNPACKED_SIZE,
        }]);

        assert!(Validator::default().validate(&exact).is_ok());
    }

    #[test]
    fn test_permissions_are_flagged_not_rejected() {
        let report = Validator::default()
            .validate(&bundle(json!({
                "id": "a",
                "version": "1.0.0",
                "permissions": ["storage:read", "Network:Unrestricted", "fs:*", "*"]
            })))
            .unwrap();

        assert_eq!(
            report.flagged,
            vec![
                FlaggedPermission {
                    permission: "Network:Unrestricted".to_string(),
                    rule: FlagRule::DenyListed,
                },
                FlaggedPermission {
                    permission: "fs:*".to_string(),
                    rule: FlagRule::Wildcard,
                },
                FlaggedPermission {
                    permission: "*".to_string(),
                    rule: FlagRule::Wildcard,
                },
            ]
        );
    }

    #[test]
    fn test_custom_deny_list() {
        let validator = Validator::new(ValidatorConfig {
            flagged_permissions: vec!["clipboard:read".to_string()],
            ..ValidatorConfig::default()
        });

        let report = validator
            .validate(&bundle(json!({
                "id": "a",
                "version": "1.0.0",
                "permissions": ["clipboard:read", "filesystem:write"]
            })))
            .unwrap();
        assert_eq!(report.flagged.len(), 1);
        assert_eq!(report.flagged[0].permission, "clipboard:read");
    }

    #[test]
    fn test_validation_does_not_touch_bundle() {
        let original = bundle(json!({"id": "a", "version": "not-semver"}));
        let copy = original.clone();

        Validator::default().validate(&original).unwrap();
        assert_eq!(original, copy);
    }
}
