use crate::UrlError;
use url::Url;

/// Normalizes a URL for visited-set membership
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or relative
/// 2. Require an HTTP or HTTPS scheme
/// 3. Require a host (scheme and host are lowercased by the parser)
/// 4. Drop the default port and the fragment
/// 5. An empty path becomes `/`
///
/// The query string is kept verbatim: mirrored pages with different queries
/// are different documents.
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.COM:443/docs/#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already-parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if !is_navigable_scheme(url.scheme()) {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes can be mirrored, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.path().is_empty() {
        url.set_path("/");
    }

    Ok(url)
}

/// Returns true for schemes a page renderer can navigate to
pub fn is_navigable_scheme(scheme: &str) -> bool {
    scheme == "http" || scheme == "https"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_host() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_trailing_slash() {
        let result = normalize_url("https://example.com/docs/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/docs/");
    }

    #[test]
    fn test_keep_query() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?b=2&a=1");
    }

    #[test]
    fn test_drop_default_port() {
        let result = normalize_url("http://example.com:80/").unwrap();
        assert_eq!(result.as_str(), "http://example.com/");

        let result = normalize_url("http://example.com:8080/").unwrap();
        assert_eq!(result.as_str(), "http://example.com:8080/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_dot_segments_resolved() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/file");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));

        let result = normalize_url("javascript:void(0)");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(matches!(
            normalize_url("/relative/path"),
            Err(UrlError::Parse(_))
        ));
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let result = normalize_url("  https://example.com/page \n").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }
}
