//! URL handling module for Site-Mirror
//!
//! This module provides URL normalization and the scope & dedup policy that
//! decides which discovered links are crawled.

mod normalize;
mod scope;

pub use normalize::{is_navigable_scheme, normalize_parsed, normalize_url};
pub use scope::{accept, evaluate, Rejection, VisitedSet};
