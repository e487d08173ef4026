//! Static site sync to S3 with CloudFront invalidation
//!
//! Planning (walk + classify + fingerprint) is a pure stage so key
//! derivation and cache policy stay testable without AWS credentials.
//! Uploads run sequentially; the first failure aborts the sync and
//! leaves the destination partially written.

use std::path::{Path, PathBuf};

use anyhow::Context;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::env::SyncConfig;

/// Cache directive for the site entry document, which must always be
/// revalidated so a deploy becomes visible immediately.
const CACHE_CONTROL_ENTRY: &str = "no-cache";

/// Cache directive for fingerprinted assets.
const CACHE_CONTROL_ASSET: &str = "public, max-age=31536000, immutable";

/// One file scheduled for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadObject {
    /// Local file path.
    pub path: PathBuf,
    /// Object key: path relative to the build dir, forward-slash normalized.
    pub key: String,
    pub content_type: String,
    pub cache_control: &'static str,
    /// Hex SHA-256 of the file contents, stored as object metadata.
    pub fingerprint: String,
}

/// Walk the build directory and derive the upload plan.
///
/// The walk order is deterministic; re-running over an unchanged tree
/// yields identical keys and fingerprints.
pub fn plan_uploads(build_dir: &Path) -> anyhow::Result<Vec<UploadObject>> {
    let mut plan = Vec::new();

    for entry in WalkDir::new(build_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", build_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

        let key = object_key(build_dir, path)?;
        let content_type = content_type_for(path, &bytes).to_string();
        let cache_control = cache_control_for(&key);
        let fingerprint = hex::encode(Sha256::digest(&bytes));

        plan.push(UploadObject {
            path: path.to_path_buf(),
            key,
            content_type,
            cache_control,
            fingerprint,
        });
    }

    Ok(plan)
}

/// Upload every planned object; returns the number uploaded.
pub async fn sync_site(
    s3: &aws_sdk_s3::Client,
    cfg: &SyncConfig,
    plan: &[UploadObject],
) -> anyhow::Result<usize> {
    let mut uploaded = 0;

    for object in plan {
        let body = ByteStream::from_path(&object.path)
            .await
            .with_context(|| format!("reading {}", object.path.display()))?;

        s3.put_object()
            .bucket(&cfg.bucket)
            .key(&object.key)
            .body(body)
            .content_type(&object.content_type)
            .cache_control(object.cache_control)
            .metadata("fingerprint", &object.fingerprint)
            .acl(ObjectCannedAcl::Private)
            .send()
            .await
            .with_context(|| format!("upload {}", object.key))?;

        uploaded += 1;
        info!(key = %object.key, content_type = %object.content_type, "uploaded");
    }

    Ok(uploaded)
}

/// Issue a single wildcard invalidation for the distribution.
pub async fn invalidate_distribution(
    cf: &aws_sdk_cloudfront::Client,
    distribution_id: &str,
) -> anyhow::Result<()> {
    use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};

    let caller_reference = format!("site-sync-{}", Uuid::new_v4());

    let paths = Paths::builder()
        .quantity(1)
        .items("/*")
        .build()
        .context("building invalidation paths")?;
    let batch = InvalidationBatch::builder()
        .paths(paths)
        .caller_reference(&caller_reference)
        .build()
        .context("building invalidation batch")?;

    cf.create_invalidation()
        .distribution_id(distribution_id)
        .invalidation_batch(batch)
        .send()
        .await
        .with_context(|| format!("invalidating distribution {}", distribution_id))?;

    info!(%distribution_id, %caller_reference, "invalidation requested: /*");
    Ok(())
}

/// Key = path relative to the build dir, with forward slashes.
fn object_key(build_dir: &Path, path: &Path) -> anyhow::Result<String> {
    let relative = path
        .strip_prefix(build_dir)
        .with_context(|| format!("{} is outside {}", path.display(), build_dir.display()))?;

    let key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    Ok(key)
}

/// The entry document is never cached; everything else is immutable.
fn cache_control_for(key: &str) -> &'static str {
    if key.ends_with("index.html") {
        CACHE_CONTROL_ENTRY
    } else {
        CACHE_CONTROL_ASSET
    }
}

/// Content type by extension, falling back to signature sniffing.
fn content_type_for(path: &Path, bytes: &[u8]) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" | "webmanifest" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        _ => sniff_content_type(bytes),
    }
}

/// Minimal byte-signature detection: PNG/GIF/JPEG, else opaque binary.
fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(b"GIF") {
        "image/gif"
    } else if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xD8 {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &[u8]) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn entry_document_is_never_cached_and_assets_are_immutable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", b"<html></html>");
        write(dir.path(), "app.js", b"console.log(1)");

        let plan = plan_uploads(dir.path()).unwrap();
        assert_eq!(plan.len(), 2);

        let entry = plan.iter().find(|o| o.key == "index.html").unwrap();
        assert_eq!(entry.cache_control, "no-cache");
        assert_eq!(entry.content_type, "text/html; charset=utf-8");

        let asset = plan.iter().find(|o| o.key == "app.js").unwrap();
        assert_eq!(asset.cache_control, "public, max-age=31536000, immutable");
        assert_eq!(asset.content_type, "text/javascript; charset=utf-8");
    }

    #[test]
    fn keys_are_relative_and_forward_slashed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "assets/img/logo.png", b"\x89PNG\r\n");

        let plan = plan_uploads(dir.path()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].key, "assets/img/logo.png");
        assert_eq!(plan[0].content_type, "image/png");
    }

    #[test]
    fn nested_index_html_also_gets_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/index.html", b"<html></html>");

        let plan = plan_uploads(dir.path()).unwrap();
        assert_eq!(plan[0].cache_control, "no-cache");
    }

    #[test]
    fn planning_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", b"<html></html>");
        write(dir.path(), "assets/app.js", b"let x = 1;");
        write(dir.path(), "assets/styles.css", b"body {}");

        let first = plan_uploads(dir.path()).unwrap();
        let second = plan_uploads(dir.path()).unwrap();
        assert_eq!(first, second);

        let keys: Vec<&str> = first.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["assets/app.js", "assets/styles.css", "index.html"]);
    }

    #[test]
    fn unknown_extension_falls_back_to_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "thumb.blob", b"\x89PNG\r\n\x1a\n....");
        write(dir.path(), "pic", &[0xFF, 0xD8, 0xFF, 0xE0]);
        write(dir.path(), "anim.data", b"GIF89a....");
        write(dir.path(), "raw.bin", b"\x00\x01\x02");

        let plan = plan_uploads(dir.path()).unwrap();
        let type_of = |key: &str| {
            plan.iter()
                .find(|o| o.key == key)
                .unwrap()
                .content_type
                .clone()
        };
        assert_eq!(type_of("thumb.blob"), "image/png");
        assert_eq!(type_of("pic"), "image/jpeg");
        assert_eq!(type_of("anim.data"), "image/gif");
        assert_eq!(type_of("raw.bin"), "application/octet-stream");
    }

    #[test]
    fn fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"same");
        write(dir.path(), "b.txt", b"same");
        write(dir.path(), "c.txt", b"different");

        let plan = plan_uploads(dir.path()).unwrap();
        assert_eq!(plan[0].fingerprint, plan[1].fingerprint);
        assert_ne!(plan[0].fingerprint, plan[2].fingerprint);
        assert_eq!(plan[0].fingerprint.len(), 64);
    }
}
