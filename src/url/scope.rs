//! Scope & dedup policy for discovered links
//!
//! A candidate link is eligible for crawling when it is a navigable absolute
//! URL, has not been seen before in this run, and, when it stays on the host
//! of the page that linked to it, lies inside that page's directory subtree.
//! Links to other hosts are always in scope.

use crate::url::normalize::{is_navigable_scheme, normalize_parsed};
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Normalized URLs already enqueued or rendered in this run
///
/// Append-only: there is no removal and no expiry.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a URL, returning true if it was not present before
    pub fn insert(&mut self, url: &Url) -> bool {
        self.urls.insert(visited_key(url))
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(&visited_key(url))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

fn visited_key(url: &Url) -> String {
    match normalize_parsed(url.clone()) {
        Ok(normalized) => normalized.into(),
        Err(_) => url.as_str().to_string(),
    }
}

/// Why a candidate link was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not a syntactically valid absolute URL
    Malformed,
    /// A scheme the renderer cannot navigate (`javascript:`, `mailto:`, ...)
    NonNavigable,
    /// A fragment pointing back into the page that contains it
    SamePageAnchor,
    /// Already enqueued or rendered
    AlreadyVisited,
    /// Same host, but outside the linking page's directory
    OutsideParent,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Malformed => "malformed URL",
            Self::NonNavigable => "non-navigable scheme",
            Self::SamePageAnchor => "same-page anchor",
            Self::AlreadyVisited => "already visited",
            Self::OutsideParent => "outside the linking page's directory",
        };
        f.write_str(reason)
    }
}

/// Evaluates a candidate link discovered on `origin`
///
/// Rules are applied in order; the first one that fails decides the
/// rejection. On success the normalized candidate is returned.
///
/// # Examples
///
/// ```
/// use site_mirror::url::{evaluate, Rejection, VisitedSet};
/// use url::Url;
///
/// let visited = VisitedSet::new();
/// let origin = Url::parse("https://a.com/x/").unwrap();
///
/// assert!(evaluate(&visited, "https://a.com/x/y", &origin).is_ok());
/// assert_eq!(
///     evaluate(&visited, "https://a.com/z", &origin),
///     Err(Rejection::OutsideParent)
/// );
/// assert!(evaluate(&visited, "https://other.com/anything", &origin).is_ok());
/// ```
pub fn evaluate(visited: &VisitedSet, candidate: &str, origin: &Url) -> Result<Url, Rejection> {
    // Rule 1: valid, navigable, not a same-page anchor
    let parsed = Url::parse(candidate.trim()).map_err(|_| Rejection::Malformed)?;

    if !is_navigable_scheme(parsed.scheme()) {
        return Err(Rejection::NonNavigable);
    }

    if parsed.fragment().is_some() && same_document(&parsed, origin) {
        return Err(Rejection::SamePageAnchor);
    }

    let normalized = normalize_parsed(parsed).map_err(|_| Rejection::Malformed)?;

    // Rule 2: dedup
    if visited.contains(&normalized) {
        return Err(Rejection::AlreadyVisited);
    }

    // Rule 3: no-parent on the same host
    if same_host(&normalized, origin) && !normalized.path().starts_with(directory_of(origin)) {
        return Err(Rejection::OutsideParent);
    }

    // Rule 4: everything else, including other hosts
    Ok(normalized)
}

/// Returns true if the candidate link is eligible for crawling
pub fn accept(visited: &VisitedSet, candidate: &str, origin: &Url) -> bool {
    evaluate(visited, candidate, origin).is_ok()
}

/// Directory portion of a page path, up to and including the last `/`
fn directory_of(url: &Url) -> &str {
    let path = url.path();
    match path.rfind('/') {
        Some(index) => &path[..=index],
        None => "/",
    }
}

fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

fn same_document(a: &Url, b: &Url) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}
