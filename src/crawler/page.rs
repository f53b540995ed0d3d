//! The document produced by one page visit

use crate::archive::{document_relative_path, save_document, ArchiveResult};
use crate::rewrite::{build_resource_map, rewrite, ResourceMap};
use std::path::Path;
use url::Url;

/// A rendered page, rewritten against the resources observed while it loaded
///
/// Built during one visit, written to disk, then dropped.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub url: Url,
    pub raw_html: String,
    pub rewritten_html: String,
    pub outbound_links: Vec<String>,
    pub resource_map: ResourceMap,
    /// Location of the saved document, relative to the mirror root
    pub local_path: String,
}

impl PageDocument {
    /// Builds the document for `url`
    ///
    /// `observed` pairs each resource URL seen during the load with its
    /// mirror-root-relative archive path.
    pub fn new<'a, I>(url: Url, raw_html: String, outbound_links: Vec<String>, observed: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let local_path = document_relative_path(&url);
        let resource_map = build_resource_map(&local_path, observed);
        let rewritten_html = rewrite(&raw_html, &resource_map);

        Self {
            url,
            raw_html,
            rewritten_html,
            outbound_links,
            resource_map,
            local_path,
        }
    }

    /// Writes the rewritten document under `root`
    pub fn save(&self, root: &Path) -> ArchiveResult<()> {
        save_document(root, &self.local_path, &self.rewritten_html)
    }
}
