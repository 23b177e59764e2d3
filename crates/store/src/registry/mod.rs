//! Registry client: turns a package identifier into a [`ResolvedBundle`].
//!
//! Two registry layouts are supported, selected by [`RegistryMode`]:
//!
//! - **Direct**: `GET <base>/<id>/manifest.json` and `GET <base>/<id>/<source_path>`.
//! - **Archive**: `GET <base>/api/plugins/<id>/download?version=<v>` returning a zip
//!   with `manifest.json` and `index.js` (or `dist/index.js`).
//!
//! [`RegistryClient::resolve_repository`] bypasses the identifier scheme and
//! reads the same two documents from a source-hosting repository.

mod archive;
mod direct;
mod repository;

use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::bundle::ResolvedBundle;
use crate::error::{Result, StoreError};
use crate::http::{Fetcher, ReqwestFetcher};

pub use archive::{CODE_ENTRIES, MANIFEST_ENTRY};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.hatch.dev";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Per-entry read limit for archive members (10 MiB).
pub const MAX_ENTRY_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum RegistryMode {
    /// Separate manifest and source documents per package.
    Direct,
    /// One compressed bundle per package.
    #[default]
    Archive,
}

/// Raw-content convention for repository installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub raw_base: String,
    pub branch: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            raw_base: DEFAULT_RAW_BASE.to_string(),
            branch: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub mode: RegistryMode,
    /// Source document path under `<base>/<id>/` in direct mode.
    pub source_path: String,
    pub repository: RepositoryConfig,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            mode: RegistryMode::default(),
            source_path: "plugin.js".to_string(),
            repository: RepositoryConfig::default(),
            timeout_secs: 30,
            user_agent: concat!("hatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct RegistryClient {
    config: RegistryConfig,
    base_url: Url,
    raw_base: Url,
    fetcher: Arc<dyn Fetcher>,
}

impl RegistryClient {
    /// Create a client that talks HTTP through reqwest.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let fetcher = ReqwestFetcher::new(
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    pub fn with_fetcher(config: RegistryConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let base_url = parse_base(&config.base_url)?;
        let raw_base = parse_base(&config.repository.raw_base)?;

        Ok(Self {
            config,
            base_url,
            raw_base,
            fetcher,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Resolve `id` at `version`, or the latest version when `None`.
    pub async fn resolve(&self, id: &str, version: Option<&Version>) -> Result<ResolvedBundle> {
        if id.trim().is_empty() {
            return Err(StoreError::not_found(id));
        }

        debug!(id, mode = ?self.config.mode, ?version, "Resolving package");
        let bundle = match self.config.mode {
            RegistryMode::Direct => {
                direct::resolve(
                    self.fetcher.as_ref(),
                    &self.base_url,
                    &self.config.source_path,
                    id,
                    version,
                )
                .await?
            }
            RegistryMode::Archive => {
                archive::resolve(self.fetcher.as_ref(), &self.base_url, id, version).await?
            }
        };

        info!(id, "Resolved package bundle");
        Ok(bundle)
    }

    /// Resolve a package straight from a repository URL such as
    /// `https://github.com/owner/repo`.
    pub async fn resolve_repository(&self, url: &str) -> Result<ResolvedBundle> {
        let location = repository::RepositoryLocation::parse(url)?;
        debug!(owner = %location.owner, repo = %location.repo, "Resolving repository package");

        repository::resolve(
            self.fetcher.as_ref(),
            &self.raw_base,
            &self.config.repository.branch,
            &location,
        )
        .await
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| StoreError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(StoreError::InvalidUrl(format!("{raw}: not a base url")));
    }
    Ok(url)
}

/// Append path segments to `base`, keeping any path the base already has.
pub(crate) fn join_segments<'a, I>(base: &Url, segments: I) -> Result<Url>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Parse a manifest document into JSON without checking its shape.
pub(crate) fn parse_manifest(bytes: &[u8]) -> Result<serde_json::Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::MalformedManifest(format!("manifest is not valid JSON: {e}")))
}

pub(crate) fn decode_source(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| StoreError::MalformedManifest("package code is not valid UTF-8".to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_segments_keeps_base_path() {
        let base = Url::parse("https://example.com/registry/").unwrap();
        let url = join_segments(&base, ["a.b", "manifest.json"]).unwrap();

        assert_eq!(url.as_str(), "https://example.com/registry/a.b/manifest.json");
    }

    #[test]
    fn test_join_segments_escapes_separators() {
        let base = Url::parse("https://example.com").unwrap();
        let url = join_segments(&base, ["../x"]).unwrap();

        assert_eq!(url.as_str(), "https://example.com/..%2Fx");
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        let config = RegistryConfig {
            base_url: "not a url".to_string(),
            ..RegistryConfig::default()
        };

        let result = RegistryClient::with_fetcher(config, Arc::new(testing::MapFetcher::default()));
        assert!(matches!(result, Err(StoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"mode":"direct","base_url":"https://r.example"}"#).unwrap();

        assert_eq!(config.mode, RegistryMode::Direct);
        assert_eq!(config.source_path, "plugin.js");
        assert_eq!(config.repository.branch, "main");
    }

    #[tokio::test]
    async fn test_empty_id_is_not_found_without_fetching() {
        let fetcher = Arc::new(testing::MapFetcher::default());
        let client =
            RegistryClient::with_fetcher(RegistryConfig::default(), fetcher.clone()).unwrap();

        assert!(matches!(
            client.resolve("  ", None).await,
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(fetcher.requests(), 0);
    }
}
