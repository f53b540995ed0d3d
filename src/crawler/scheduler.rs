//! Scheduler for managing the crawl frontier and pacing
//!
//! This module handles:
//! - The depth-first worklist of pending targets
//! - Randomizing sibling order before children are queued
//! - Politeness delays between renders and penalty delays before retries
//! - The retry budget per target

use crate::config::CrawlerConfig;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// A URL queued for rendering, with its link distance from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: Url,
    pub depth: u32,
}

impl CrawlTarget {
    pub fn new(url: Url, depth: u32) -> Self {
        Self { url, depth }
    }
}

/// Depth-first worklist of crawl targets
///
/// Targets pushed together as siblings are shuffled and then visited in
/// that shuffled order, each sibling's subtree completing before the next
/// sibling starts.
#[derive(Debug, Default)]
pub struct Frontier {
    stack: Vec<CrawlTarget>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: CrawlTarget) {
        self.stack.push(target);
    }

    /// Queues the children of one page in random order
    pub fn push_siblings(&mut self, mut siblings: Vec<CrawlTarget>) {
        fastrand::shuffle(&mut siblings);
        // Reversed so the first shuffled sibling is popped first
        self.stack.extend(siblings.into_iter().rev());
    }

    pub fn pop(&mut self) -> Option<CrawlTarget> {
        self.stack.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.stack.len()
    }
}

/// Why the crawl is pausing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    /// Spacing between consecutive page renders
    Politeness,
    /// Back-off before re-rendering a blocked or failed page
    RetryPenalty,
}

/// A source of delays; swapped out in tests to observe pacing without sleeping
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration, kind: DelayKind);
}

/// Delays with the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration, kind: DelayKind) {
        tracing::trace!("Sleeping {:?} ({:?})", duration, kind);
        tokio::time::sleep(duration).await;
    }
}

/// Computes delays and retry decisions from the crawler configuration
#[derive(Debug, Clone)]
pub struct Pacer {
    wait: Duration,
    random_wait: bool,
    retry_delay: Duration,
    max_retries: u32,
}

impl Pacer {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            wait: config.wait_duration(),
            random_wait: config.random_wait,
            retry_delay: config.retry_delay_duration(),
            max_retries: config.max_retries,
        }
    }

    /// Delay before the next render; None when no wait is configured
    pub fn politeness_delay(&self) -> Option<Duration> {
        self.politeness_delay_with(jitter_factor())
    }

    /// Delay before the next render using the given jitter factor
    ///
    /// The factor only applies when random waits are enabled.
    pub fn politeness_delay_with(&self, factor: f64) -> Option<Duration> {
        if self.wait.is_zero() {
            return None;
        }

        if self.random_wait {
            Some(self.wait.mul_f64(factor))
        } else {
            Some(self.wait)
        }
    }

    /// Penalty delay before re-rendering a target
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Whether a target that has already been retried `retries` times may try again
    pub fn should_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Random scale for politeness delays, uniform in [0.5, 1.5)
pub fn jitter_factor() -> f64 {
    0.5 + fastrand::f64()
}
