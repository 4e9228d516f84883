//! Image storage: decodes base64 data URLs and writes them under the
//! media root, returning public URLs.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::Utc;
use tracing::warn;

/// Hard cap on images processed per upload call.
pub const MAX_IMAGES: usize = 4;

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Parses a data URL. Returns None for anything that is not a well-formed
/// base64 data URL.
pub fn parse_data_url(url: &str) -> Option<DataUrl> {
    let rest = url.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let bytes = BASE64_STANDARD.decode(payload).ok()?;
    let content_type = if mime.is_empty() { "image/png" } else { mime };
    Some(DataUrl {
        content_type: content_type.to_string(),
        bytes,
    })
}

/// Derives a file extension from a MIME type: `image/jpeg` becomes `jpg`,
/// other subtypes are used verbatim, a missing subtype falls back to `png`.
fn ext_for(content_type: &str) -> &str {
    match content_type.split('/').nth(1) {
        Some("jpeg") => "jpg",
        Some(sub) if !sub.is_empty() => sub,
        _ => "png",
    }
}

/// Filesystem-backed image bucket with public URLs.
///
/// Files land under `{root}/{bucket}/{key}` and are served from
/// `{public_base}/media/{bucket}/{key}` by the router's static mount.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    bucket: String,
    public_base: String,
}

impl ImageStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str, public_base: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            bucket: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Stores up to [`MAX_IMAGES`] data URLs and returns the public URLs of
    /// the ones that succeeded, in input order.
    ///
    /// Malformed entries and individual write failures are skipped, not
    /// errors: the caller decides what an empty result means.
    pub async fn upload_images(&self, key_prefix: &str, data_urls: &[String]) -> Vec<String> {
        let mut urls = Vec::new();
        let stamp = Utc::now().timestamp_millis();

        for (i, data_url) in data_urls.iter().take(MAX_IMAGES).enumerate() {
            let Some(decoded) = parse_data_url(data_url) else {
                warn!("skipping malformed data URL at index {i}");
                continue;
            };
            let key = format!(
                "{key_prefix}/{stamp}_{i}.{ext}",
                ext = ext_for(&decoded.content_type)
            );
            match self.write(&key, &decoded.bytes).await {
                Ok(()) => urls.push(self.public_url(&key)),
                Err(e) => warn!("failed to store image {key}: {e}"),
            }
        }

        urls
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.root.join(&self.bucket).join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/media/{}/{}", self.public_base, self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_B64: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn png_data_url() -> String {
        format!("data:image/png;base64,{PNG_B64}")
    }

    #[test]
    fn test_parse_data_url() {
        let parsed = parse_data_url(&png_data_url()).unwrap();
        assert_eq!(parsed.content_type, "image/png");
        assert!(!parsed.bytes.is_empty());
    }

    #[test]
    fn test_parse_data_url_missing_mime_defaults_to_png() {
        let parsed = parse_data_url(&format!("data:;base64,{PNG_B64}")).unwrap();
        assert_eq!(parsed.content_type, "image/png");
    }

    #[test]
    fn test_parse_data_url_rejects_garbage() {
        assert_eq!(parse_data_url("not a data url"), None);
        assert_eq!(parse_data_url("data:image/png;base64,%%%"), None);
        assert_eq!(parse_data_url("https://example.com/a.png"), None);
    }

    #[test]
    fn test_ext_for() {
        assert_eq!(ext_for("image/jpeg"), "jpg");
        assert_eq!(ext_for("image/webp"), "webp");
        assert_eq!(ext_for("image"), "png");
    }

    #[tokio::test]
    async fn test_upload_caps_at_four_and_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), "listing-images", "http://localhost:3000");

        let mut inputs: Vec<String> = (0..6).map(|_| png_data_url()).collect();
        inputs[1] = "garbage".to_string();

        let urls = store.upload_images("scan_1700000000000", &inputs).await;
        // six supplied, four processed, one of those malformed
        assert_eq!(urls.len(), 3);
        for url in &urls {
            assert!(url.starts_with("http://localhost:3000/media/listing-images/scan_1700000000000/"));
            assert!(url.ends_with(".png"));
        }
    }

    #[tokio::test]
    async fn test_upload_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), "listing-images", "http://shop.example");

        let urls = store
            .upload_images("manual", &[format!("data:image/jpeg;base64,{PNG_B64}")])
            .await;
        assert_eq!(urls.len(), 1);
        assert!(urls[0].ends_with(".jpg"));

        // the path after /media/ mirrors the on-disk layout under the root
        let rel = urls[0]
            .strip_prefix("http://shop.example/media/")
            .unwrap();
        let on_disk = std::fs::read(dir.path().join(rel)).unwrap();
        assert_eq!(on_disk, BASE64_STANDARD.decode(PNG_B64).unwrap());
    }
}
