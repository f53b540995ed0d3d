//! HTML queries over rendered documents
//!
//! This module handles:
//! - Extracting outbound links to follow (`<a href>`)
//! - Extracting embedded resources a page load would request
//! - Detecting anti-automation block signatures

use crate::config::DEFAULT_BLOCK_SIGNATURES;
use crate::ConfigError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements and attributes that reference sub-resources of a page
const RESOURCE_SELECTORS: &[(&str, &str)] = &[
    ("img[src]", "src"),
    ("img[srcset]", "srcset"),
    ("script[src]", "src"),
    ("link[rel~='stylesheet'][href]", "href"),
    ("link[rel~='icon'][href]", "href"),
    ("link[rel~='preload'][href]", "href"),
    ("source[src]", "src"),
    ("video[src]", "src"),
    ("video[poster]", "poster"),
    ("audio[src]", "src"),
];

/// Extracts outbound links from the document
///
/// Hrefs are resolved against `base_url`. Links that cannot be resolved are
/// dropped; everything else, including `javascript:` and fragment links,
/// is returned for the scope policy to judge.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/docs/">Docs</a><a href="https://other.com/">Other</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base);
/// assert_eq!(links, vec!["https://example.com/docs/", "https://other.com/"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Download links point at files, not pages
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                match resolve(href, base_url) {
                    Some(url) => links.push(url.to_string()),
                    None => tracing::debug!("Dropping unresolvable href {:?} on {}", href, base_url),
                }
            }
        }
    }

    links
}

/// Extracts the sub-resources a browser would request while loading the page
///
/// Only HTTP(S) URLs are returned, without fragments, deduplicated in
/// document order.
pub fn extract_resource_urls(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut resources = Vec::new();

    for (selector, attr) in RESOURCE_SELECTORS {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for element in document.select(&selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };

            let reference = if *attr == "srcset" {
                first_srcset_candidate(value)
            } else {
                Some(value)
            };

            let Some(mut url) = reference.and_then(|r| resolve(r, base_url)) else {
                continue;
            };

            if url.scheme() != "http" && url.scheme() != "https" {
                continue;
            }

            url.set_fragment(None);
            if seen.insert(url.to_string()) {
                resources.push(url);
            }
        }
    }

    resources
}

/// URL of the first candidate in a `srcset` attribute
fn first_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|candidate| candidate.split_whitespace().next())
}

fn resolve(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base_url.join(href).ok()
}

/// Matches rendered documents against known anti-bot interstitial markers
#[derive(Debug)]
pub struct BlockDetector {
    signatures: Vec<(String, Selector)>,
}

impl BlockDetector {
    /// Compiles the given CSS selectors
    pub fn new(signatures: &[String]) -> Result<Self, ConfigError> {
        let signatures = signatures
            .iter()
            .map(|signature| {
                Selector::parse(signature)
                    .map(|selector| (signature.clone(), selector))
                    .map_err(|e| {
                        ConfigError::InvalidSignature(format!("'{}': {:?}", signature, e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { signatures })
    }

    /// Returns the first signature found in the document, if any
    pub fn detect(&self, html: &str) -> Option<&str> {
        if self.signatures.is_empty() {
            return None;
        }

        let document = Html::parse_document(html);
        self.signatures
            .iter()
            .find(|(_, selector)| document.select(selector).next().is_some())
            .map(|(signature, _)| signature.as_str())
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        let signatures: Vec<(String, Selector)> = DEFAULT_BLOCK_SIGNATURES
            .iter()
            .filter_map(|s| Selector::parse(s).ok().map(|sel| (s.to_string(), sel)))
            .collect();
        Self { signatures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/dir/page").unwrap()
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<html><body><a href="https://other.com/page">Link</a></body></html>"#;
        let links = extract_links(html, &base_url());
        assert_eq!(links, vec!["https://other.com/page"]);
    }

    #[test]
    fn test_extract_relative_links() {
        let html = r#"<a href="/root">A</a><a href="sibling">B</a><a href="../up">C</a>"#;
        let links = extract_links(html, &base_url());
        assert_eq!(
            links,
            vec![
                "https://example.com/root",
                "https://example.com/dir/sibling",
                "https://example.com/up",
            ]
        );
    }

    #[test]
    fn test_pseudo_urls_left_for_scope_policy() {
        let html = r##"<a href="javascript:void(0)">J</a><a href="#top">T</a><a href="mailto:x@y.z">M</a>"##;
        let links = extract_links(html, &base_url());
        assert_eq!(links.len(), 3);
        assert_eq!(links[1], "https://example.com/dir/page#top");
    }

    #[test]
    fn test_skip_download_and_empty_links() {
        let html = r#"<a href="/file.pdf" download>D</a><a href="">E</a><a href="   ">W</a>"#;
        assert!(extract_links(html, &base_url()).is_empty());
    }

    #[test]
    fn test_unresolvable_href_dropped() {
        let html = r#"<a href="http://[::1">Broken</a><a href="/ok">Ok</a>"#;
        let links = extract_links(html, &base_url());
        assert_eq!(links, vec!["https://example.com/ok"]);
    }

    #[test]
    fn test_extract_resource_urls() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/css/site.css">
            <link rel="icon" href="/favicon.ico">
            <link rel="canonical" href="/canonical">
            <script src="https://cdn.example.net/lib.js"></script>
            </head><body>
            <img src="img/a.png">
            <img srcset="img/b-1x.png 1x, img/b-2x.png 2x">
            <video poster="/poster.jpg"><source src="/clip.mp4"></video>
            <img src="img/a.png#dup">
            <img src="data:image/png;base64,AAAA">
            </body></html>"#;

        let resources: Vec<String> = extract_resource_urls(html, &base_url())
            .into_iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            resources,
            vec![
                "https://example.com/dir/img/a.png",
                "https://example.com/dir/img/b-1x.png",
                "https://cdn.example.net/lib.js",
                "https://example.com/css/site.css",
                "https://example.com/favicon.ico",
                "https://example.com/clip.mp4",
                "https://example.com/poster.jpg",
            ]
        );
    }

    #[test]
    fn test_block_detector_default_signatures() {
        let detector = BlockDetector::default();
        assert!(!detector.is_empty());

        let captcha = r#"<html><head><meta name="captcha-bypass" id="captcha-bypass"></head></html>"#;
        assert!(detector.detect(captcha).is_some());

        let challenge =
            r#"<html><body><script src="/cdn-cgi/challenge-platform/h/b/orchestrate"></script></body></html>"#;
        assert!(detector.detect(challenge).is_some());

        let normal = r#"<html><body><h1>Welcome</h1><script src="/app.js"></script></body></html>"#;
        assert_eq!(detector.detect(normal), None);
    }

    #[test]
    fn test_block_detector_custom_signatures() {
        let detector = BlockDetector::new(&["div.blocked".to_string()]).unwrap();
        assert_eq!(
            detector.detect(r#"<div class="blocked">Access denied</div>"#),
            Some("div.blocked")
        );
        assert_eq!(detector.detect("<div>fine</div>"), None);
    }

    #[test]
    fn test_block_detector_rejects_bad_selector() {
        let result = BlockDetector::new(&["[[".to_string()]);
        assert!(matches!(result, Err(ConfigError::InvalidSignature(_))));
    }

    #[test]
    fn test_empty_detector_never_blocks() {
        let detector = BlockDetector::new(&[]).unwrap();
        assert_eq!(detector.detect(r#"<meta name="captcha-bypass">"#), None);
    }
}
