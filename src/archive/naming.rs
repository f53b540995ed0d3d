//! Content-addressed naming for archived resources

use sha2::{Digest, Sha256};
use url::Url;

/// Directory under the mirror root holding every archived resource
pub const RESOURCES_DIR: &str = "resources";

const MAX_EXTENSION_LEN: usize = 8;

/// SHA-256 of the resource URL, hex encoded
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mirror-root-relative path for a resource: `resources/<hash[0:2]>/<hash><ext>`
///
/// The extension comes from the URL path when it has one, otherwise from
/// the content type.
pub fn resource_relative_path(url: &str, content_type: Option<&str>) -> (String, String) {
    let hash = url_hash(url);
    let extension = extension_from_url(url)
        .or_else(|| content_type.and_then(extension_from_content_type).map(str::to_string))
        .unwrap_or_default();

    let path = format!("{}/{}/{}{}", RESOURCES_DIR, &hash[..2], hash, extension);
    (hash, path)
}

/// Extension (with the leading dot) of the last path segment, if it looks like one
fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    let (stem, ext) = segment.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }

    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Maps a MIME type to a conventional file extension
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = essence(content_type);
    let extension = match mime.as_str() {
        "text/css" => ".css",
        "text/javascript" | "application/javascript" | "application/x-javascript" => ".js",
        "application/json" => ".json",
        "text/plain" => ".txt",
        "text/xml" | "application/xml" => ".xml",
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/avif" => ".avif",
        "image/svg+xml" => ".svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "font/woff" | "application/font-woff" => ".woff",
        "font/woff2" => ".woff2",
        "font/ttf" | "application/x-font-ttf" => ".ttf",
        "font/otf" => ".otf",
        "application/pdf" => ".pdf",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "audio/mpeg" => ".mp3",
        "audio/ogg" => ".ogg",
        _ => return None,
    };
    Some(extension)
}

/// Returns true for content types that denote a navigable HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    matches!(
        essence(content_type).as_str(),
        "text/html" | "application/xhtml+xml"
    )
}

/// MIME type without parameters, lowercased
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_url_based() {
        let a = url_hash("https://a.com/style.css");
        let b = url_hash("https://a.com/style.css");
        let c = url_hash("https://a.com/other.css");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_path_is_sharded_by_hash_prefix() {
        let (hash, path) = resource_relative_path("https://a.com/style.css", Some("text/css"));
        assert_eq!(path, format!("resources/{}/{}.css", &hash[..2], hash));
    }

    #[test]
    fn test_extension_from_url_preferred() {
        let (_, path) = resource_relative_path("https://a.com/img/logo.PNG?v=3", Some("image/webp"));
        assert!(path.ends_with(".png"));
    }

    #[test]
    fn test_extension_inferred_from_content_type() {
        let (_, path) =
            resource_relative_path("https://a.com/api/font", Some("font/woff2; charset=binary"));
        assert!(path.ends_with(".woff2"));

        let (_, path) = resource_relative_path("https://a.com/bundle", Some("Application/JavaScript"));
        assert!(path.ends_with(".js"));
    }

    #[test]
    fn test_no_extension_when_unknown() {
        let (hash, path) = resource_relative_path("https://a.com/blob", Some("application/x-unknown"));
        assert!(path.ends_with(&hash));

        let (hash, path) = resource_relative_path("https://a.com/blob", None);
        assert!(path.ends_with(&hash));
    }

    #[test]
    fn test_suspicious_extensions_ignored() {
        assert_eq!(extension_from_url("https://a.com/.hidden"), None);
        assert_eq!(extension_from_url("https://a.com/file.tar-gz"), None);
        assert_eq!(extension_from_url("https://a.com/file.averyverylongext"), None);
        assert_eq!(extension_from_url("https://a.com/dir/"), None);
        assert_eq!(
            extension_from_url("https://a.com/app.min.js"),
            Some(".js".to_string())
        );
    }

    #[test]
    fn test_is_html_content_type() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("TEXT/HTML"));
        assert!(is_html_content_type("application/xhtml+xml"));

        assert!(!is_html_content_type("text/css"));
        assert!(!is_html_content_type(""));
    }
}
