use url::Url;

use super::{decode_source, join_segments, parse_manifest};
use crate::bundle::{BundleOrigin, ResolvedBundle};
use crate::error::{Result, StoreError};
use crate::http::{Fetcher, fetch_body};

const MANIFEST_FILE: &str = "manifest.json";
const SOURCE_FILE: &str = "plugin.js";

/// Owner and repository parsed from a source-hosting URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RepositoryLocation {
    pub(super) url: String,
    pub(super) owner: String,
    pub(super) repo: String,
}

impl RepositoryLocation {
    /// Accepts `http(s)://<host>/<owner>/<repo>[.git][/...]`.
    pub(super) fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| StoreError::InvalidUrl(format!("{raw}: {reason}"));

        let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("expected an http or https url"));
        }

        let mut segments = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty());
        let owner = segments.next();
        let repo = segments.next().map(|repo| repo.trim_end_matches(".git"));

        match (owner, repo) {
            (Some(owner), Some(repo)) if !repo.is_empty() => Ok(Self {
                url: raw.trim().to_string(),
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(invalid("expected /<owner>/<repo>")),
        }
    }

    fn display_id(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Read `manifest.json` then `plugin.js` from the repository's raw content
/// on `branch`. The manifest is fetched first so a repository without one
/// fails before its source is requested.
pub(super) async fn resolve(
    fetcher: &dyn Fetcher,
    raw_base: &Url,
    branch: &str,
    location: &RepositoryLocation,
) -> Result<ResolvedBundle> {
    let display_id = location.display_id();
    let prefix = [location.owner.as_str(), location.repo.as_str(), branch];

    let manifest_url = join_segments(raw_base, prefix.into_iter().chain([MANIFEST_FILE]))?;
    let manifest = parse_manifest(&fetch_body(fetcher, &manifest_url, &display_id).await?)?;

    let source_url = join_segments(raw_base, prefix.into_iter().chain([SOURCE_FILE]))?;
    let source = decode_source(fetch_body(fetcher, &source_url, &display_id).await?)?;

    let requested_id = manifest
        .get("id")
        .and_then(|id| id.as_str())
        .map_or(display_id, str::to_string);

    Ok(ResolvedBundle {
        requested_id,
        manifest,
        source,
        members: None,
        origin: BundleOrigin::Repository {
            url: location.url.clone(),
        },
    })
}
