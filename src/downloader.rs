use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::client::{ensure_success, send_with_retry};
use crate::config::CrawlConfig;
use crate::error::CrawlError;

/// Suffix for the in-progress file before the atomic rename.
const TEMP_SUFFIX: &str = ".part";

/// Fetch and persist every image for one certificate, 1-based index order.
/// Each image stands alone: a failed fetch or write is logged and skipped.
pub fn download_images(client: &Client, config: &CrawlConfig, cert: &str, urls: &[Url]) {
    for (i, url) in urls.iter().enumerate() {
        let index = i + 1;
        if let Err(e) = download_one(client, config, cert, index, url) {
            error!("Failed to save image {} for cert {}: {}", index, cert, e);
        }
    }
}

fn download_one(
    client: &Client,
    config: &CrawlConfig,
    cert: &str,
    index: usize,
    url: &Url,
) -> Result<(), CrawlError> {
    let resp = send_with_retry(config, || client.get(url.clone()))?;
    let resp = ensure_success(resp)?;

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    // Redirects may land on a different path; infer from where we ended up.
    let final_url = resp.url().clone();
    let bytes = resp.bytes()?;

    let ext = infer_extension(&final_url, content_type.as_deref());
    let dir = config.output_root.join(cert);
    let path = save_image(&dir, index, &ext, &bytes)?;
    info!("Saved image for cert {}: {:?}", cert, path);
    Ok(())
}

/// Pick the file extension: URL path first, declared content type second,
/// `.jpg` as the last resort. Returned with the leading dot.
pub fn infer_extension(url: &Url, content_type: Option<&str>) -> String {
    if let Some(ext) = ext_from_url(url) {
        return ext;
    }
    if let Some(ext) = content_type.and_then(ext_from_content_type) {
        return ext.to_string();
    }
    ".jpg".to_string()
}

fn ext_from_url(url: &Url) -> Option<String> {
    let path = urlencoding::decode(url.path())
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| url.path().to_string());
    let base = path.rsplit('/').next().unwrap_or("");
    let dot = base.rfind('.')?;
    // A leading dot or a bare trailing dot is not an extension.
    if dot == 0 || dot + 1 == base.len() {
        return None;
    }
    Some(base[dot..].to_ascii_lowercase())
}

fn ext_from_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/bmp" => Some(".bmp"),
        "image/tiff" => Some(".tiff"),
        "image/svg+xml" => Some(".svg"),
        "image/avif" => Some(".avif"),
        _ => None,
    }
}

/// Write the payload under `{dir}/image_{index}{ext}`.
///
/// The bytes land in a `.part` sibling first and are renamed into place, so
/// the final name never exposes a partial write. Directory creation is
/// idempotent.
pub fn save_image(dir: &Path, index: usize, ext: &str, bytes: &[u8]) -> Result<PathBuf, CrawlError> {
    fs::create_dir_all(dir).map_err(|e| CrawlError::Write {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let final_path = dir.join(format!("image_{}{}", index, ext));
    let temp = temp_path(&final_path);

    fs::write(&temp, bytes).map_err(|e| CrawlError::Write {
        path: temp.clone(),
        source: e,
    })?;
    fs::rename(&temp, &final_path).map_err(|e| CrawlError::Write {
        path: final_path.clone(),
        source: e,
    })?;

    Ok(final_path)
}

fn temp_path(final_path: &Path) -> PathBuf {
    let mut os = final_path.as_os_str().to_owned();
    os.push(TEMP_SUFFIX);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn url_extension_beats_content_type() {
        let u = url("https://cdn.example.com/scans/front.png");
        assert_eq!(infer_extension(&u, Some("image/gif")), ".png");
    }

    #[test]
    fn content_type_fills_in_when_url_has_none() {
        let u = url("https://cdn.example.com/scans/front");
        assert_eq!(infer_extension(&u, Some("image/webp")), ".webp");
        assert_eq!(infer_extension(&u, Some("image/jpeg; charset=binary")), ".jpg");
    }

    #[test]
    fn defaults_to_jpg() {
        let u = url("https://cdn.example.com/scans/front");
        assert_eq!(infer_extension(&u, None), ".jpg");
        assert_eq!(infer_extension(&u, Some("application/octet-stream")), ".jpg");
    }

    #[test]
    fn percent_encoded_paths_are_decoded_first() {
        let u = url("https://cdn.example.com/scans/front%20scan.JPG");
        assert_eq!(infer_extension(&u, None), ".jpg");
    }

    #[test]
    fn query_string_does_not_leak_into_the_extension() {
        let u = url("https://cdn.example.com/scans/front.png?size=large");
        assert_eq!(infer_extension(&u, None), ".png");
    }

    #[test]
    fn save_is_idempotent_and_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("123");

        let first = save_image(&target, 1, ".jpg", b"payload").unwrap();
        // Same {cert, index} again, e.g. a repeated run.
        let second = save_image(&target, 1, ".jpg", b"payload").unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"payload");
        assert_eq!(first, target.join("image_1.jpg"));

        let leftovers: Vec<_> = fs::read_dir(&target)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn directory_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("existing");
        fs::create_dir_all(&target).unwrap();
        assert!(save_image(&target, 2, ".png", b"x").is_ok());
    }
}
