use std::io::{Cursor, Read};

use semver::Version;
use tracing::debug;
use url::Url;
use zip::ZipArchive;
use zip::result::ZipError;

use super::{MAX_ENTRY_SIZE, decode_source, join_segments, parse_manifest};
use crate::bundle::{ArchiveMember, BundleOrigin, ResolvedBundle};
use crate::error::{Result, StoreError};
use crate::http::{Fetcher, fetch_body};

pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Conventional code entry paths, in lookup order.
pub const CODE_ENTRIES: [&str; 2] = ["index.js", "dist/index.js"];

/// Download `<base>/api/plugins/<id>/download?version=<v>` and read the
/// manifest and code entries out of it.
pub(super) async fn resolve(
    fetcher: &dyn Fetcher,
    base: &Url,
    id: &str,
    version: Option<&Version>,
) -> Result<ResolvedBundle> {
    let mut url = join_segments(base, ["api", "plugins", id, "download"])?;
    let version = version.map_or_else(|| "latest".to_string(), Version::to_string);
    url.query_pairs_mut().append_pair("version", &version);

    let bytes = fetch_body(fetcher, &url, id).await?;
    debug!(id, size = bytes.len(), "Downloaded package archive");

    let (manifest, source, members) = unpack(bytes)?;

    Ok(ResolvedBundle {
        requested_id: id.to_string(),
        manifest,
        source,
        members: Some(members),
        origin: BundleOrigin::Archive,
    })
}

fn unpack(bytes: Vec<u8>) -> Result<(serde_json::Value, String, Vec<ArchiveMember>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(malformed)?;

    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(malformed)?;
        if entry.is_dir() {
            continue;
        }
        members.push(ArchiveMember {
            name: entry.name().to_string(),
            size: entry.size(),
        });
    }

    let manifest = read_entry(&mut archive, MANIFEST_ENTRY)?.ok_or_else(|| {
        StoreError::MalformedManifest(format!("archive has no {MANIFEST_ENTRY}"))
    })?;
    let manifest = parse_manifest(&manifest)?;

    let mut code = None;
    for name in CODE_ENTRIES {
        if let Some(bytes) = read_entry(&mut archive, name)? {
            code = Some(bytes);
            break;
        }
    }
    let code = code.ok_or_else(|| {
        StoreError::MalformedManifest(format!(
            "archive has no code entry ({})",
            CODE_ENTRIES.join(" or ")
        ))
    })?;

    Ok((manifest, decode_source(code)?, members))
}

/// Read a whole entry, or `None` if the archive does not contain it.
fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<Option<Vec<u8>>> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(malformed(e)),
    };

    if entry.size() > MAX_ENTRY_SIZE {
        return Err(StoreError::MalformedManifest(format!(
            "archive entry {name} is {} bytes, limit is {MAX_ENTRY_SIZE}",
            entry.size()
        )));
    }

    let mut buffer = Vec::with_capacity(entry.size() as usize);
    entry
        .take(MAX_ENTRY_SIZE + 1)
        .read_to_end(&mut buffer)
        .map_err(|e| StoreError::MalformedManifest(format!("failed to read {name}: {e}")))?;

    if buffer.len() as u64 > MAX_ENTRY_SIZE {
        return Err(StoreError::MalformedManifest(format!(
            "archive entry {name} exceeds {MAX_ENTRY_SIZE} bytes"
        )));
    }
    Ok(Some(buffer))
}

fn malformed(error: ZipError) -> StoreError {
    StoreError::MalformedManifest(format!("unreadable archive: {error}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use zip::write::SimpleFileOptions;

    use super::super::testing::MapFetcher;
    use super::super::{RegistryClient, RegistryConfig};
    use super::*;
    use crate::http::FetchResponse;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const URL: &str = "https://registry.example/api/plugins/com.example.sample/download?version=latest";

    fn client(fetcher: Arc<MapFetcher>) -> RegistryClient {
        let config = RegistryConfig {
            base_url: "https://registry.example".to_string(),
            ..RegistryConfig::default()
        };
        RegistryClient::with_fetcher(config, fetcher).unwrap()
    }

    #[tokio::test]
    async fn test_reads_manifest_and_code() {
        let fetcher = Arc::new(MapFetcher::default());
        fetcher.serve(
            URL,
            FetchResponse::ok(archive(&[
                (MANIFEST_ENTRY, br#"{"id":"com.example.sample","version":"1.0.0"}"#),
                ("index.js", b"export function activate() {}"),
                ("README.md", b"hello"),
            ])),
        );

        let bundle = client(fetcher.clone())
            .resolve("com.example.sample", None)
            .await
            .unwrap();

        assert_eq!(bundle.manifest["id"], "com.example.sample");
        assert_eq!(bundle.source, "export function activate() {}");
        assert_eq!(bundle.origin, BundleOrigin::Archive);

        let members = bundle.members.as_ref().unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(bundle.unpacked_size(), Some(45 + 29 + 5));
        assert_eq!(fetcher.requests(), 1);
    }

    #[tokio::test]
    async fn test_requested_version_goes_in_query() {
        let fetcher = Arc::new(MapFetcher::default());
        fetcher.serve(
            "https://registry.example/api/plugins/com.example.sample/download?version=1.2.3",
            FetchResponse::ok(archive(&[
                (MANIFEST_ENTRY, br#"{"id":"com.example.sample","version":"1.2.3"}"#),
                ("index.js", b"function activate() {}"),
            ])),
        );

        let version = Version::new(1, 2, 3);
        let bundle = client(fetcher)
            .resolve("com.example.sample", Some(&version))
            .await
            .unwrap();
        assert_eq!(bundle.manifest["version"], "1.2.3");
    }

    #[test]
    fn test_dist_index_is_second_choice() {
        let (_, source, _) = unpack(archive(&[
            (MANIFEST_ENTRY, br#"{"id":"a","version":"1.0.0"}"#),
            ("dist/index.js", b"dist"),
        ]))
        .unwrap();
        assert_eq!(source, "dist");

        let (_, source, _) = unpack(archive(&[
            ("dist/index.js", b"dist"),
            ("index.js", b"root"),
            (MANIFEST_ENTRY, br#"{"id":"a","version":"1.0.0"}"#),
        ]))
        .unwrap();
        assert_eq!(source, "root");
    }

    #[test]
    fn test_missing_entries_are_malformed() {
        let no_manifest = unpack(archive(&[("index.js", b"function activate() {}")]));
        assert!(matches!(no_manifest, Err(StoreError::MalformedManifest(_))));

        let no_code = unpack(archive(&[(MANIFEST_ENTRY, br#"{"id":"a","version":"1.0.0"}"#)]));
        assert!(matches!(no_code, Err(StoreError::MalformedManifest(_))));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            unpack(b"definitely not a zip".to_vec()),
            Err(StoreError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_non_utf8_code_is_malformed() {
        let result = unpack(archive(&[
            (MANIFEST_ENTRY, br#"{"id":"a","version":"1.0.0"}"#),
            ("index.js", &[0xff, 0xfe, 0x00]),
        ]));
        assert!(matches!(result, Err(StoreError::MalformedManifest(_))));
    }
}
