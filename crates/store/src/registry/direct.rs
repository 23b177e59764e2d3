use semver::Version;
use tracing::warn;
use url::Url;

use super::{decode_source, join_segments, parse_manifest};
use crate::bundle::{BundleOrigin, ResolvedBundle};
use crate::error::{Result, StoreError};
use crate::http::{Fetcher, fetch_body};

/// Fetch `<base>/<id>/manifest.json` and `<base>/<id>/<source_path>` together.
/// Both must succeed.
pub(super) async fn resolve(
    fetcher: &dyn Fetcher,
    base: &Url,
    source_path: &str,
    id: &str,
    version: Option<&Version>,
) -> Result<ResolvedBundle> {
    let manifest_url = join_segments(base, [id, "manifest.json"])?;
    let source_url = join_segments(
        base,
        std::iter::once(id).chain(source_path.split('/').filter(|s| !s.is_empty())),
    )?;

    let (manifest, source) = futures::try_join!(
        fetch_body(fetcher, &manifest_url, id),
        fetch_body(fetcher, &source_url, id),
    )?;

    let manifest = parse_manifest(&manifest)?;

    // Direct registries only serve one version per identifier.
    if let Some(requested) = version {
        let served = manifest.get("version").and_then(|v| v.as_str());
        if let Some(served) = served {
            if served != requested.to_string() {
                warn!(id, %requested, served, "Registry serves a different version");
                return Err(StoreError::not_found(format!("{id}@{requested}")));
            }
        }
    }

    Ok(ResolvedBundle {
        requested_id: id.to_string(),
        manifest,
        source: decode_source(source)?,
        members: None,
        origin: BundleOrigin::Direct,
    })
}
