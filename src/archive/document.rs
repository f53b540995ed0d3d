//! On-disk layout of saved documents: `<root>/<hostname>/<url-path>[.html]`

use crate::archive::naming::url_hash;
use crate::archive::{write_file, ArchiveResult};
use std::path::Path;
use url::Url;

const INDEX_FILE: &str = "index.html";

/// Mirror-root-relative path of the document saved for `url`
///
/// - A path ending in `/` gets `index.html`
/// - A last segment not ending in `.html`/`.htm` gets `.html` appended
/// - A query string adds `-<8 hex chars of its hash>` before the extension
///
/// Known limitation: `/x` and `/x.html` map to the same file, so when both
/// are mirrored the page saved last wins.
///
/// # Examples
///
/// ```
/// use site_mirror::archive::document_relative_path;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/docs/").unwrap();
/// assert_eq!(document_relative_path(&url), "example.com/docs/index.html");
///
/// let url = Url::parse("https://example.com/docs/intro").unwrap();
/// assert_eq!(document_relative_path(&url), "example.com/docs/intro.html");
/// ```
pub fn document_relative_path(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown-host");

    let mut segments: Vec<String> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_segment)
        .collect();

    let is_directory = url.path().ends_with('/') || segments.is_empty();
    let mut file_name = if is_directory {
        INDEX_FILE.to_string()
    } else {
        segments.pop().unwrap_or_else(|| INDEX_FILE.to_string())
    };

    let (stem, extension) = split_html_extension(&file_name);
    if let Some(query) = url.query() {
        let suffix = &url_hash(query)[..8];
        file_name = format!("{}-{}{}", stem, suffix, extension);
    } else {
        file_name = format!("{}{}", stem, extension);
    }

    let mut parts = Vec::with_capacity(segments.len() + 2);
    parts.push(sanitize_segment(host));
    parts.extend(segments);
    parts.push(file_name);
    parts.join("/")
}

/// Splits a file name into stem and an HTML extension, adding `.html` if missing
fn split_html_extension(file_name: &str) -> (String, String) {
    let lower = file_name.to_ascii_lowercase();
    for ext in [".html", ".htm"] {
        if lower.ends_with(ext) && lower.len() > ext.len() {
            let cut = file_name.len() - ext.len();
            return (file_name[..cut].to_string(), file_name[cut..].to_string());
        }
    }
    (file_name.to_string(), ".html".to_string())
}

/// Makes a URL path segment safe to use as a file or directory name
fn sanitize_segment(segment: &str) -> String {
    if segment == "." || segment == ".." {
        return "_".to_string();
    }

    segment
        .chars()
        .map(|c| match c {
            '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Writes a rewritten document to `<root>/<relative_path>`
pub fn save_document(root: &Path, relative_path: &str, html: &str) -> ArchiveResult<()> {
    write_file(&root.join(relative_path), html.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path_for(url: &str) -> String {
        document_relative_path(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_root_page() {
        assert_eq!(path_for("https://example.com/"), "example.com/index.html");
        assert_eq!(path_for("https://example.com"), "example.com/index.html");
    }

    #[test]
    fn test_directory_page() {
        assert_eq!(path_for("https://example.com/a/b/"), "example.com/a/b/index.html");
    }

    #[test]
    fn test_extensionless_page() {
        assert_eq!(path_for("https://example.com/a/about"), "example.com/a/about.html");
    }

    #[test]
    fn test_html_extension_kept() {
        assert_eq!(path_for("https://example.com/page.html"), "example.com/page.html");
        assert_eq!(path_for("https://example.com/old.HTM"), "example.com/old.HTM");
    }

    #[test]
    fn test_extensionless_and_html_pages_share_a_file() {
        assert_eq!(path_for("https://a.com/x"), "a.com/x.html");
        assert_eq!(path_for("https://a.com/x"), path_for("https://a.com/x.html"));
    }

    #[test]
    fn test_other_extension_gets_html() {
        assert_eq!(path_for("https://example.com/view.php"), "example.com/view.php.html");
    }

    #[test]
    fn test_query_disambiguates() {
        let a = path_for("https://example.com/list?page=1");
        let b = path_for("https://example.com/list?page=2");
        let plain = path_for("https://example.com/list");

        assert_ne!(a, b);
        assert!(a.starts_with("example.com/list-"));
        assert!(a.ends_with(".html"));
        assert_eq!(plain, "example.com/list.html");
    }

    #[test]
    fn test_port_not_part_of_directory() {
        assert_eq!(path_for("http://127.0.0.1:8080/x"), "127.0.0.1/x.html");
    }

    #[test]
    fn test_unsafe_characters_replaced() {
        assert_eq!(path_for("https://example.com/a:b/c"), "example.com/a_b/c.html");
    }

    #[test]
    fn test_save_document_creates_directories() {
        let dir = TempDir::new().unwrap();
        save_document(dir.path(), "example.com/a/b/index.html", "<html></html>").unwrap();

        let saved = std::fs::read_to_string(dir.path().join("example.com/a/b/index.html")).unwrap();
        assert_eq!(saved, "<html></html>");
    }
}
