//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Command-line flags are layered on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirror will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BlockConfig, CrawlerConfig, MirrorConfig, OutputConfig, SessionConfig,
    DEFAULT_BLOCK_SIGNATURES,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
