//! Link rewriting for saved documents
//!
//! Rewriting is a literal substring substitution over the whole document.
//! It does not look at the DOM, so a resource URL that happens to be a
//! substring of an unrelated token is replaced as well, and references
//! written in relative or entity-escaped form are left untouched.
//! Links between pages keep their original absolute hrefs.

use std::collections::HashMap;

/// Observed resource URL -> local path, scoped to one page visit
pub type ResourceMap = HashMap<String, String>;

/// Replaces every literal occurrence of each mapped URL with its local path
///
/// Longer URLs are substituted first so that a URL which is a prefix of
/// another (`/app.css` vs `/app.css?v=2`) does not clobber the longer one.
///
/// # Examples
///
/// ```
/// use site_mirror::rewrite::{rewrite, ResourceMap};
///
/// let mut map = ResourceMap::new();
/// map.insert("https://a.com/logo.png".to_string(), "../resources/ab/ab12.png".to_string());
///
/// let html = r#"<img src="https://a.com/logo.png">"#;
/// assert_eq!(rewrite(html, &map), r#"<img src="../resources/ab/ab12.png">"#);
/// ```
pub fn rewrite(document: &str, resources: &ResourceMap) -> String {
    let mut urls: Vec<(&String, &String)> = resources
        .iter()
        .filter(|(url, _)| !url.is_empty())
        .collect();
    urls.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut rewritten = document.to_string();
    for (url, local_path) in urls {
        if rewritten.contains(url.as_str()) {
            rewritten = rewritten.replace(url.as_str(), local_path);
        }
    }
    rewritten
}

/// Expresses a mirror-root-relative path relative to a saved document
///
/// `document_path` and `target_path` are both relative to the mirror root
/// and use `/` separators.
///
/// # Examples
///
/// ```
/// use site_mirror::rewrite::relative_to_document;
///
/// assert_eq!(
///     relative_to_document("a.com/x/index.html", "resources/ab/ab12.css"),
///     "../../resources/ab/ab12.css"
/// );
/// ```
pub fn relative_to_document(document_path: &str, target_path: &str) -> String {
    let depth = document_path.matches('/').count();
    let mut relative = "../".repeat(depth);
    relative.push_str(target_path);
    relative
}

/// Builds the resource map for one saved document
pub fn build_resource_map<'a, I>(document_path: &str, observed: I) -> ResourceMap
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    observed
        .into_iter()
        .map(|(url, root_relative)| {
            (
                url.to_string(),
                relative_to_document(document_path, root_relative),
            )
        })
        .collect()
}
