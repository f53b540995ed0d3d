//! The page renderer capability consumed by the orchestrator
//!
//! A renderer navigates to a URL, reports every response it receives while
//! the page loads through an event channel, and returns the final document.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Navigation timeout used when nothing else is configured
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// When a navigation counts as complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The document has loaded
    Load,
    /// The document and all of its sub-resource requests have settled
    NetworkIdle,
}

/// Options for a single navigation
#[derive(Debug, Clone)]
pub struct NavigateOptions {
    pub wait_condition: WaitCondition,
    pub timeout: Duration,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            wait_condition: WaitCondition::NetworkIdle,
            timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

/// Outcome of a navigation that produced (or failed to produce) a document
#[derive(Debug, Clone)]
pub struct Navigation {
    /// HTTP status of the main document; None if no response arrived
    pub status: Option<u16>,

    /// URL of the document after redirects
    pub final_url: Url,

    /// Final rendered HTML
    pub html: String,
}

impl Navigation {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(status) if (200..300).contains(&status))
    }
}

/// One response observed while a page was loading
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    pub url: String,
    pub status: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ResourceResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sending half of the response-event stream handed to a renderer
pub type ResponseSender = mpsc::UnboundedSender<ResourceResponse>;

/// Errors a renderer reports when navigation yields no response at all
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Could not reach {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

/// A capability that loads pages the way a browser would
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url` and waits for `options.wait_condition`
    ///
    /// Every response received during the load is sent on `events`. The
    /// sender is dropped when navigation finishes, which closes the stream.
    async fn navigate(
        &self,
        url: &Url,
        options: &NavigateOptions,
        events: ResponseSender,
    ) -> Result<Navigation, RenderError>;
}
