//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror offline website mirror.

use anyhow::Context;
use clap::Parser;
use site_mirror::config::{load_config_with_hash, validate, MirrorConfig};
use site_mirror::crawler::run_mirror;
use site_mirror::{normalize_url, MirrorError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Site-Mirror: mirror a website for offline browsing
///
/// Site-Mirror renders a page, archives the resources it loads, rewrites the
/// page to use the archived copies and follows its links depth-first within
/// the directory it was found in.
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(version)]
#[command(about = "Mirror a website for offline browsing", long_about = None)]
struct Cli {
    /// URL of the first page to mirror
    #[arg(value_name = "URL", required_unless_present = "stats")]
    url: Option<String>,

    /// Directory the mirror is written to
    #[arg(long, value_name = "DIR")]
    output: Option<String>,

    /// Maximum link depth from the seed page
    #[arg(long, value_name = "N")]
    depth: Option<u32>,

    /// Base delay between page renders, in seconds
    #[arg(long, value_name = "SECONDS")]
    wait: Option<f64>,

    /// Scale each delay by a random factor between 0.5 and 1.5
    #[arg(long = "randomWait", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    random_wait: Option<bool>,

    /// Netscape cookie-jar file loaded before the first navigation
    #[arg(long, value_name = "PATH")]
    cookies: Option<String>,

    /// User agent presented to the site
    #[arg(long = "userAgent", value_name = "STRING")]
    user_agent: Option<String>,

    /// Retries allowed per page before giving up
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate settings and show what would be mirrored without rendering anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the manifest in the output directory and exit
    #[arg(long)]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut MirrorConfig) {
        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
        if let Some(depth) = self.depth {
            config.crawler.max_depth = depth;
        }
        if let Some(wait) = self.wait {
            config.crawler.wait = wait;
        }
        if let Some(random_wait) = self.random_wait {
            config.crawler.random_wait = random_wait;
        }
        if let Some(cookies) = &self.cookies {
            config.session.cookies = Some(cookies.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            config.session.user_agent = Some(user_agent.clone());
        }
        if let Some(max_retries) = self.max_retries {
            config.crawler.max_retries = max_retries;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match load_config_with_hash(cli.config.as_deref()) {
        Ok((cfg, hash)) => {
            if let Some(path) = &cli.config {
                tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash);
            }
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid settings")?;

    if cli.stats {
        return handle_stats(&config);
    }

    let raw_url = cli.url.as_deref().unwrap_or_default();
    let seed = parse_target(raw_url)?;

    if cli.dry_run {
        handle_dry_run(&config, &seed);
        return Ok(());
    }

    handle_mirror(&config, &seed, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Validates the target URL before anything is rendered
fn parse_target(raw: &str) -> Result<Url, MirrorError> {
    normalize_url(raw).map_err(|e| MirrorError::InvalidTarget {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &MirrorConfig, seed: &Url) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Target: {}", seed);

    println!("\nCrawler:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Wait: {}s{}",
        config.crawler.wait,
        if config.crawler.random_wait {
            " (randomized 0.5x-1.5x)"
        } else {
            ""
        }
    );
    println!("  Retry delay: {}s", config.crawler.retry_delay);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Navigation timeout: {}s", config.crawler.navigation_timeout);

    println!("\nSession:");
    println!("  User agent: {}", config.session.user_agent_or_default());
    println!(
        "  Cookies: {}",
        config.session.cookies.as_deref().unwrap_or("(none)")
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    if config.output.manifest {
        println!("  Manifest: {}", config.output.manifest_path().display());
    }

    println!("\nBlock signatures ({}):", config.block.signatures.len());
    for signature in &config.block.signatures {
        println!("  - {}", signature);
    }

    println!("\n✓ Settings are valid");
}

/// Handles the --stats mode: shows statistics from the manifest
fn handle_stats(config: &MirrorConfig) -> anyhow::Result<()> {
    use site_mirror::output::{load_statistics, print_statistics};
    use site_mirror::storage::SqliteStorage;

    let path = config.output.manifest_path();
    if !path.exists() {
        anyhow::bail!("No manifest found at {}", path.display());
    }

    println!("Manifest: {}\n", path.display());

    let storage = SqliteStorage::new(&path)
        .with_context(|| format!("Failed to open manifest {}", path.display()))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(config: &MirrorConfig, seed: &Url, config_hash: &str) -> anyhow::Result<()> {
    match run_mirror(config, seed, config_hash).await {
        Ok(report) => {
            tracing::info!(
                "Saved {} pages and {} resources to {}",
                report.pages_saved,
                report.resources_archived,
                config.output.directory
            );
            if report.pages_given_up > 0 || report.resource_failures > 0 {
                tracing::warn!(
                    "{} pages given up, {} resources failed to archive",
                    report.pages_given_up,
                    report.resource_failures
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "mirror",
            "https://example.com/docs/",
            "--output=out",
            "--depth=1",
            "--wait=0.5",
            "--randomWait=false",
            "--userAgent=Test/1.0",
            "--max-retries=2",
        ]);

        let mut config = MirrorConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.output.directory, "out");
        assert_eq!(config.crawler.max_depth, 1);
        assert_eq!(config.crawler.wait, 0.5);
        assert!(!config.crawler.random_wait);
        assert_eq!(config.session.user_agent.as_deref(), Some("Test/1.0"));
        assert_eq!(config.crawler.max_retries, 2);
        assert!(config.session.cookies.is_none());
    }

    #[test]
    fn test_bare_random_wait_flag() {
        let cli = Cli::parse_from(["mirror", "https://a.com/", "--randomWait"]);
        assert_eq!(cli.random_wait, Some(true));
    }

    #[test]
    fn test_url_required_unless_stats() {
        assert!(Cli::try_parse_from(["mirror"]).is_err());
        assert!(Cli::try_parse_from(["mirror", "--stats"]).is_ok());
    }

    #[test]
    fn test_parse_target() {
        assert!(parse_target("https://example.com/").is_ok());
        assert!(matches!(
            parse_target("not a url"),
            Err(MirrorError::InvalidTarget { .. })
        ));
        assert!(matches!(
            parse_target("ftp://example.com/"),
            Err(MirrorError::InvalidTarget { .. })
        ));
    }
}
