//! Crawler module for page rendering and mirror orchestration
//!
//! This module contains the core mirroring logic, including:
//! - The renderer capability and its HTTP implementation
//! - HTML queries for links, resources and block signatures
//! - Frontier management and pacing
//! - Overall mirror orchestration

mod http_renderer;
mod orchestrator;
mod page;
mod parser;
mod renderer;
mod scheduler;

pub use http_renderer::{build_http_client, HttpRenderer};
pub use orchestrator::{CrawlReport, Orchestrator};
pub use page::PageDocument;
pub use parser::{extract_links, extract_resource_urls, BlockDetector};
pub use renderer::{
    NavigateOptions, Navigation, RenderError, Renderer, ResourceResponse, ResponseSender,
    WaitCondition, DEFAULT_NAVIGATION_TIMEOUT,
};
pub use scheduler::{
    jitter_factor, CrawlTarget, Delay, DelayKind, Frontier, Pacer, TokioDelay,
};

use crate::config::MirrorConfig;
use crate::cookies::{build_cookie_jar, load_cookie_file};
use crate::storage::{open_storage, Storage};
use crate::MirrorError;
use std::path::Path;
use url::Url;

/// Runs a complete mirror operation
///
/// This is the main entry point for mirroring a site. It will:
/// 1. Load the session cookie file, if configured
/// 2. Build the HTTP client and renderer
/// 3. Open the manifest inside the output directory
/// 4. Mirror everything reachable from `seed`
///
/// # Arguments
///
/// * `config` - The validated mirror configuration
/// * `seed` - The first page to mirror
/// * `config_hash` - Hash of the configuration, recorded with the run
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished
/// * `Err(MirrorError)` - Setup failed before or while starting the run
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::MirrorConfig;
/// use site_mirror::crawler::run_mirror;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MirrorConfig::default();
/// let seed = Url::parse("https://example.com/docs/")?;
/// let report = run_mirror(&config, &seed, "").await?;
/// println!("{} pages saved", report.pages_saved);
/// # Ok(())
/// # }
/// ```
pub async fn run_mirror(
    config: &MirrorConfig,
    seed: &Url,
    config_hash: &str,
) -> Result<CrawlReport, MirrorError> {
    let jar = match &config.session.cookies {
        Some(path) => Some(build_cookie_jar(&load_cookie_file(Path::new(path))?)),
        None => None,
    };

    let client = build_http_client(&config.session.user_agent_or_default(), jar)?;
    let renderer = HttpRenderer::new(client);

    let mut orchestrator = Orchestrator::new(config, renderer, TokioDelay)?;

    if config.output.manifest {
        std::fs::create_dir_all(config.output.root())?;
        let storage: Box<dyn Storage> = Box::new(open_storage(&config.output.manifest_path())?);
        orchestrator = orchestrator.with_manifest(storage, config_hash);
    }

    orchestrator.run(seed).await
}
