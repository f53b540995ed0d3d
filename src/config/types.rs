use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// CSS selectors matching well-known anti-automation interstitials
pub const DEFAULT_BLOCK_SIGNATURES: &[&str] = &[
    r#"meta[name="captcha-bypass"]"#,
    r#"script[src*="captcha"]"#,
    r#"script[src*="/cdn-cgi/challenge-platform/"]"#,
    "form#challenge-form",
    "div#px-captcha",
];

/// Main configuration structure for Site-Mirror
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub session: SessionConfig,
    pub block: BlockConfig,
}

/// Traversal and pacing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth from the seed page
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Base delay between page renders (seconds)
    pub wait: f64,

    /// Scale the base delay by a random factor in [0.5, 1.5)
    #[serde(rename = "random-wait")]
    pub random_wait: bool,

    /// Penalty delay before re-rendering a blocked or failed page (seconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: f64,

    /// Number of retries allowed per page before giving up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Navigation timeout (seconds)
    #[serde(rename = "navigation-timeout")]
    pub navigation_timeout: f64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            wait: 1.0,
            random_wait: true,
            retry_delay: 10.0,
            max_retries: 10,
            navigation_timeout: 60.0,
        }
    }
}

impl CrawlerConfig {
    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs_f64(self.wait)
    }

    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay)
    }

    pub fn navigation_timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.navigation_timeout)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the mirror
    pub directory: String,

    /// Whether to keep a SQLite manifest of pages and resources
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./mirror".to_string(),
            manifest: true,
        }
    }
}

impl OutputConfig {
    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.directory)
    }

    /// Location of the manifest database inside the mirror root
    pub fn manifest_path(&self) -> PathBuf {
        self.root().join("manifest.sqlite")
    }
}

/// Browser-session identity
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// User agent presented to the site
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    /// Netscape cookie-jar file loaded before the first navigation
    pub cookies: Option<String>,
}

impl SessionConfig {
    pub fn user_agent_or_default(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("site-mirror/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Block-signature configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// CSS selectors; a rendered page matching any of them is treated as blocked
    pub signatures: Vec<String>,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            signatures: DEFAULT_BLOCK_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
