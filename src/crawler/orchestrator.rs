//! Crawl orchestrator - main mirror loop
//!
//! This module drives a mirror run:
//! - Popping targets from the depth-first frontier
//! - Pacing renders and retrying blocked or failed pages
//! - Archiving the responses a renderer streams while a page loads
//! - Saving rewritten documents and queueing in-scope links
//! - Recording progress in the manifest

use crate::archive::ResourceArchiver;
use crate::config::MirrorConfig;
use crate::crawler::page::PageDocument;
use crate::crawler::parser::{extract_links, BlockDetector};
use crate::crawler::renderer::{
    NavigateOptions, Navigation, Renderer, ResourceResponse, WaitCondition,
};
use crate::crawler::scheduler::{CrawlTarget, Delay, DelayKind, Frontier, Pacer, TokioDelay};
use crate::state::PageState;
use crate::storage::{PageUpdate, RunStatus, Storage};
use crate::url::{evaluate, normalize_parsed, VisitedSet};
use crate::MirrorError;
use std::path::PathBuf;
use tokio::sync::mpsc;
use url::Url;

/// Counters describing a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages that rendered cleanly and were saved
    pub pages_saved: u64,
    /// Renders repeated after a block or load failure
    pub retries: u64,
    /// Pages abandoned after exhausting the retry budget
    pub pages_given_up: u64,
    /// Targets dropped for exceeding the depth ceiling
    pub targets_dropped: u64,
    /// Resources newly written to the mirror
    pub resources_archived: u64,
    /// Resources whose write failed
    pub resource_failures: u64,
    /// Pages that rendered but could not be written to disk
    pub page_write_failures: u64,
}

/// Result of a single render attempt
enum RenderOutcome {
    Loaded {
        navigation: Navigation,
        /// (resource URL, mirror-root-relative path) for every archived response
        observed: Vec<(String, String)>,
    },
    Failed(String),
}

/// Best-effort writer for the mirror manifest
///
/// Storage failures are logged and never interrupt the crawl.
struct Ledger {
    storage: Option<Box<dyn Storage>>,
    config_hash: String,
    run_id: Option<i64>,
}

impl Ledger {
    fn disabled() -> Self {
        Self {
            storage: None,
            config_hash: String::new(),
            run_id: None,
        }
    }

    fn begin(&mut self, seed: &Url) {
        let Some(storage) = self.storage.as_mut() else {
            return;
        };

        match storage.create_run(seed.as_str(), &self.config_hash) {
            Ok(run_id) => {
                tracing::debug!("Recording run {} in manifest", run_id);
                self.run_id = Some(run_id);
            }
            Err(e) => tracing::warn!("Failed to start manifest run, not recording: {}", e),
        }
    }

    fn page(&mut self, update: &PageUpdate<'_>) {
        if let (Some(storage), Some(run_id)) = (self.storage.as_mut(), self.run_id) {
            if let Err(e) = storage.record_page(run_id, update) {
                tracing::warn!("Failed to record page {} in manifest: {}", update.url, e);
            }
        }
    }

    fn resource(&mut self, archiver: &ResourceArchiver, url: &str) {
        let (Some(storage), Some(run_id)) = (self.storage.as_mut(), self.run_id) else {
            return;
        };

        if let Some(record) = archiver.record(url) {
            if let Err(e) = storage.record_resource(run_id, record) {
                tracing::warn!("Failed to record resource {} in manifest: {}", url, e);
            }
        }
    }

    fn finish(&mut self, status: RunStatus) {
        if let (Some(storage), Some(run_id)) = (self.storage.as_mut(), self.run_id) {
            if let Err(e) = storage.finish_run(run_id, status) {
                tracing::warn!("Failed to finish manifest run {}: {}", run_id, e);
            }
        }
    }
}

/// Main mirror orchestrator
///
/// Owns the visited set and the resource archiver for the lifetime of a run;
/// nothing else mutates them.
pub struct Orchestrator<R: Renderer, D: Delay = TokioDelay> {
    renderer: R,
    delay: D,
    pacer: Pacer,
    max_depth: u32,
    navigate_options: NavigateOptions,
    detector: BlockDetector,
    visited: VisitedSet,
    archiver: ResourceArchiver,
    output_root: PathBuf,
    ledger: Ledger,
    report: CrawlReport,
    has_rendered: bool,
}

impl<R: Renderer, D: Delay> Orchestrator<R, D> {
    /// Creates a new orchestrator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The mirror configuration
    /// * `renderer` - The page renderer
    /// * `delay` - The source of politeness and retry delays
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Successfully created orchestrator
    /// * `Err(MirrorError)` - A block signature failed to compile
    pub fn new(config: &MirrorConfig, renderer: R, delay: D) -> Result<Self, MirrorError> {
        let detector = BlockDetector::new(&config.block.signatures)?;
        let output_root = config.output.root();

        Ok(Self {
            renderer,
            delay,
            pacer: Pacer::from_config(&config.crawler),
            max_depth: config.crawler.max_depth,
            navigate_options: NavigateOptions {
                wait_condition: WaitCondition::NetworkIdle,
                timeout: config.crawler.navigation_timeout_duration(),
            },
            detector,
            visited: VisitedSet::new(),
            archiver: ResourceArchiver::new(output_root.clone()),
            output_root,
            ledger: Ledger::disabled(),
            report: CrawlReport::default(),
            has_rendered: false,
        })
    }

    /// Records the run in a manifest as it progresses
    pub fn with_manifest(mut self, storage: Box<dyn Storage>, config_hash: impl Into<String>) -> Self {
        self.ledger = Ledger {
            storage: Some(storage),
            config_hash: config_hash.into(),
            run_id: None,
        };
        self
    }

    /// Mirrors everything reachable from `seed`
    ///
    /// Runs until no eligible targets remain. Page failures are retried or
    /// given up on; they never end the run.
    pub async fn run(&mut self, seed: &Url) -> Result<CrawlReport, MirrorError> {
        let seed = normalize_parsed(seed.clone())?;
        tracing::info!(
            "Mirroring {} into {} (max depth {})",
            seed,
            self.output_root.display(),
            self.max_depth
        );

        self.ledger.begin(&seed);

        let mut frontier = Frontier::new();
        frontier.push(CrawlTarget::new(seed, 0));

        while let Some(target) = frontier.pop() {
            let children = match self.visit(&target).await {
                Ok(children) => children,
                Err(e) => {
                    self.ledger.finish(RunStatus::Failed);
                    return Err(e);
                }
            };

            if !children.is_empty() {
                tracing::debug!(
                    "Queued {} links from {} ({} pending)",
                    children.len(),
                    target.url,
                    frontier.len() + children.len()
                );
            }
            frontier.push_siblings(children);
        }

        self.ledger.finish(RunStatus::Completed);

        tracing::info!(
            "Mirror complete: {} pages saved, {} resources archived, {} retries, {} pages given up",
            self.report.pages_saved,
            self.report.resources_archived,
            self.report.retries,
            self.report.pages_given_up
        );

        Ok(self.report.clone())
    }

    /// Processes a single target until it is saved, dropped or given up on
    ///
    /// Returns the accepted child targets.
    async fn visit(&mut self, target: &CrawlTarget) -> Result<Vec<CrawlTarget>, MirrorError> {
        let mut state = PageState::Pending;

        if target.depth > self.max_depth {
            state = state.transition(PageState::DepthExceeded)?;
            tracing::debug!("Dropping {} at depth {}", target.url, target.depth);
            self.report.targets_dropped += 1;
            self.record_page(target, state, None, None, 0);
            return Ok(Vec::new());
        }

        self.visited.insert(&target.url);

        let mut attempts: u32 = 0;
        loop {
            self.pace(attempts).await;

            state = state.transition(PageState::Rendering)?;
            attempts += 1;
            tracing::debug!("Rendering {} (attempt {})", target.url, attempts);

            let (next, status) = match self.render(&target.url).await {
                RenderOutcome::Loaded {
                    navigation,
                    observed,
                } => {
                    let blocked = self.detector.detect(&navigation.html).map(str::to_string);
                    match blocked {
                        Some(signature) => {
                            tracing::warn!("Blocked on {} (matched {})", target.url, signature);
                            (PageState::BlockedRetry, navigation.status)
                        }
                        None => {
                            state.transition(PageState::Saved)?;
                            return Ok(self.save(target, navigation, observed, attempts));
                        }
                    }
                }
                RenderOutcome::Failed(reason) => {
                    tracing::warn!("Failed to load {}: {}", target.url, reason);
                    (PageState::LoadFailedRetry, None)
                }
            };

            state = state.transition(next)?;

            if !self.pacer.should_retry(attempts - 1) {
                state = state.transition(PageState::GaveUp)?;
                tracing::warn!(
                    "Giving up on {} after {} attempts ({} retries allowed)",
                    target.url,
                    attempts,
                    self.pacer.max_retries()
                );
                self.report.pages_given_up += 1;
                self.record_page(target, state, status, None, attempts);
                return Ok(Vec::new());
            }

            self.report.retries += 1;
            self.record_page(target, state, status, None, attempts);
        }
    }

    /// Sleeps before a render: a penalty before retries, otherwise the politeness delay
    async fn pace(&mut self, attempts: u32) {
        if attempts > 0 {
            let penalty = self.pacer.retry_delay();
            tracing::debug!("Retrying in {:?}", penalty);
            self.delay.sleep(penalty, DelayKind::RetryPenalty).await;
        } else if self.has_rendered {
            if let Some(wait) = self.pacer.politeness_delay() {
                self.delay.sleep(wait, DelayKind::Politeness).await;
            }
        }
        self.has_rendered = true;
    }

    /// Navigates to `url` while archiving every response streamed during the load
    async fn render(&mut self, url: &Url) -> RenderOutcome {
        let Self {
            renderer,
            navigate_options,
            archiver,
            ledger,
            report,
            ..
        } = self;

        let (events, mut responses) = mpsc::unbounded_channel();
        let navigate = renderer.navigate(url, navigate_options, events);

        let collect = async {
            let mut observed = Vec::new();
            while let Some(response) = responses.recv().await {
                if let Some(path) = archive_response(archiver, ledger, report, &response) {
                    observed.push((response.url, path));
                }
            }
            observed
        };

        let (result, observed) = tokio::join!(navigate, collect);

        match result {
            Ok(navigation) if navigation.is_success() => RenderOutcome::Loaded {
                navigation,
                observed,
            },
            Ok(navigation) => RenderOutcome::Failed(match navigation.status {
                Some(status) => format!("HTTP {}", status),
                None => "no response".to_string(),
            }),
            Err(e) => RenderOutcome::Failed(e.to_string()),
        }
    }

    /// Saves a cleanly rendered page and returns its in-scope children
    fn save(
        &mut self,
        target: &CrawlTarget,
        navigation: Navigation,
        observed: Vec<(String, String)>,
        attempts: u32,
    ) -> Vec<CrawlTarget> {
        let links = extract_links(&navigation.html, &navigation.final_url);

        // Scope origin is the page the links were found on: the post-redirect URL
        let origin = match normalize_parsed(navigation.final_url.clone()) {
            Ok(final_url) => final_url,
            Err(_) => target.url.clone(),
        };
        if self.visited.insert(&origin) && origin != target.url {
            tracing::debug!("{} redirected to {}", target.url, origin);
        }
        let document = PageDocument::new(
            target.url.clone(),
            navigation.html,
            links,
            observed.iter().map(|(url, path)| (url.as_str(), path.as_str())),
        );

        self.report.pages_saved += 1;
        match document.save(&self.output_root) {
            Ok(()) => {
                tracing::info!("Saved {} -> {}", target.url, document.local_path);
                self.record_page(
                    target,
                    PageState::Saved,
                    navigation.status,
                    Some(&document.local_path),
                    attempts,
                );
            }
            Err(e) => {
                tracing::warn!("Failed to write page {}: {}", target.url, e);
                self.report.page_write_failures += 1;
                self.record_page(target, PageState::Saved, navigation.status, None, attempts);
            }
        }

        let depth = target.depth + 1;
        if depth > self.max_depth {
            tracing::debug!("Not following links from {}: depth limit reached", target.url);
            return Vec::new();
        }

        let mut children = Vec::new();
        for link in &document.outbound_links {
            match evaluate(&self.visited, link, &origin) {
                Ok(url) => {
                    self.visited.insert(&url);
                    children.push(CrawlTarget::new(url, depth));
                }
                Err(rejection) => tracing::trace!("Skipping {}: {}", link, rejection),
            }
        }
        children
    }

    fn record_page(
        &mut self,
        target: &CrawlTarget,
        state: PageState,
        status_code: Option<u16>,
        local_path: Option<&str>,
        attempts: u32,
    ) {
        self.ledger.page(&PageUpdate {
            url: target.url.as_str(),
            depth: target.depth,
            state,
            status_code,
            local_path,
            attempts,
        });
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn archiver(&self) -> &ResourceArchiver {
        &self.archiver
    }

    pub fn report(&self) -> &CrawlReport {
        &self.report
    }
}

/// Archives one successful response, returning its mirror-root-relative path
///
/// Responses already archived earlier in the run resolve to their existing
/// path without any I/O.
fn archive_response(
    archiver: &mut ResourceArchiver,
    ledger: &mut Ledger,
    report: &mut CrawlReport,
    response: &ResourceResponse,
) -> Option<String> {
    if !response.is_success() {
        tracing::trace!("Not archiving {} (HTTP {})", response.url, response.status);
        return None;
    }

    match archiver.archive(&response.url, &response.body, response.content_type()) {
        Ok(Some(path)) => {
            report.resources_archived += 1;
            ledger.resource(archiver, &response.url);
            Some(path)
        }
        Ok(None) => archiver.local_path(&response.url).map(str::to_string),
        Err(e) => {
            tracing::warn!("Failed to archive {}: {}", response.url, e);
            report.resource_failures += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::renderer::{RenderError, ResponseSender};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StaticRenderer {
        html: String,
    }

    #[async_trait]
    impl Renderer for StaticRenderer {
        async fn navigate(
            &self,
            url: &Url,
            _options: &NavigateOptions,
            events: ResponseSender,
        ) -> Result<Navigation, RenderError> {
            let mut headers = HashMap::new();
            headers.insert("content-type".to_string(), "text/css".to_string());
            let _ = events.send(ResourceResponse {
                url: "https://a.com/site.css".to_string(),
                status: 200,
                headers,
                body: b"body{}".to_vec(),
            });

            Ok(Navigation {
                status: Some(200),
                final_url: url.clone(),
                html: self.html.clone(),
            })
        }
    }

    #[derive(Default)]
    struct NoDelay {
        calls: Mutex<Vec<DelayKind>>,
    }

    #[async_trait]
    impl Delay for NoDelay {
        async fn sleep(&self, _duration: Duration, kind: DelayKind) {
            self.calls.lock().unwrap().push(kind);
        }
    }

    fn create_test_config(dir: &TempDir) -> MirrorConfig {
        let mut config = MirrorConfig::default();
        config.output.directory = dir.path().to_string_lossy().into_owned();
        config.crawler.max_depth = 0;
        config
    }

    #[tokio::test]
    async fn test_single_page_saved_and_rewritten() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir);
        let renderer = StaticRenderer {
            html: r#"<link rel="stylesheet" href="https://a.com/site.css">"#.to_string(),
        };

        let mut orchestrator = Orchestrator::new(&config, renderer, NoDelay::default()).unwrap();
        let seed = Url::parse("https://a.com/").unwrap();
        let report = orchestrator.run(&seed).await.unwrap();

        assert_eq!(report.pages_saved, 1);
        assert_eq!(report.resources_archived, 1);
        assert!(orchestrator.visited().contains(&seed));

        let css_path = orchestrator
            .archiver()
            .local_path("https://a.com/site.css")
            .unwrap()
            .to_string();
        let saved = std::fs::read_to_string(dir.path().join("a.com/index.html")).unwrap();
        assert_eq!(saved, format!(r#"<link rel="stylesheet" href="../{}">"#, css_path));
        assert!(dir.path().join(&css_path).exists());
    }

    #[tokio::test]
    async fn test_manifest_records_run() {
        use crate::storage::SqliteStorage;

        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir);
        let renderer = StaticRenderer {
            html: "<p>hello</p>".to_string(),
        };

        let storage = SqliteStorage::new(&dir.path().join("manifest.sqlite")).unwrap();
        let mut orchestrator = Orchestrator::new(&config, renderer, NoDelay::default())
            .unwrap()
            .with_manifest(Box::new(storage), "cfg-hash");
        orchestrator
            .run(&Url::parse("https://a.com/").unwrap())
            .await
            .unwrap();
        drop(orchestrator);

        let storage = SqliteStorage::new(&dir.path().join("manifest.sqlite")).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.config_hash, "cfg-hash");
        assert_eq!(run.status, RunStatus::Completed);

        let page = storage.get_page("https://a.com/").unwrap().unwrap();
        assert_eq!(page.state, PageState::Saved);
        assert_eq!(page.local_path.as_deref(), Some("a.com/index.html"));
        assert_eq!(page.attempts, 1);
        assert_eq!(storage.count_resources().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_first_render_has_no_politeness_delay() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir);
        let renderer = StaticRenderer {
            html: String::new(),
        };
        let delay = NoDelay::default();

        let mut orchestrator = Orchestrator::new(&config, renderer, delay).unwrap();
        orchestrator
            .run(&Url::parse("https://a.com/").unwrap())
            .await
            .unwrap();

        assert!(orchestrator.delay.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir);
        config.block.signatures = vec!["[[".to_string()];

        let result = Orchestrator::new(
            &config,
            StaticRenderer {
                html: String::new(),
            },
            NoDelay::default(),
        );
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }
}
