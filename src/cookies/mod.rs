//! Netscape cookie-jar loading
//!
//! Each non-comment line holds seven tab-separated fields:
//! `domain, include-subdomains, path, secure, expires, name, value`.
//! Comment lines (`#`) and lines with fewer than seven fields are skipped.

use reqwest::cookie::Jar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors that can occur while loading a cookie file
#[derive(Debug, Error)]
pub enum CookieError {
    #[error("Failed to read cookie file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One cookie from a Netscape cookie-jar file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix timestamp; 0 marks a session cookie
    pub expires: i64,
    pub name: String,
    pub value: String,
}

impl NetscapeCookie {
    /// Host the cookie belongs to, without the leading dot
    pub fn host(&self) -> &str {
        self.domain.trim_start_matches('.')
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires > 0 && self.expires < now
    }

    /// `Set-Cookie` header equivalent of this entry
    pub fn set_cookie_header(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            header.push_str(&format!("; Domain={}", self.host()));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }

    /// URL the cookie is scoped to, used to seed the jar
    pub fn origin_url(&self) -> Option<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{}://{}{}", scheme, self.host(), self.path)).ok()
    }
}

/// Parses cookie-jar text, skipping comments and malformed lines
pub fn parse_cookie_jar(content: &str) -> Vec<NetscapeCookie> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                tracing::debug!("Skipping malformed cookie line: {:?}", line);
                return None;
            }

            Some(NetscapeCookie {
                domain: fields[0].to_string(),
                include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
                path: if fields[2].is_empty() { "/" } else { fields[2] }.to_string(),
                secure: fields[3].eq_ignore_ascii_case("TRUE"),
                expires: fields[4].trim().parse().unwrap_or(0),
                name: fields[5].to_string(),
                value: fields[6].to_string(),
            })
        })
        .collect()
}

/// Reads and parses a cookie-jar file
pub fn load_cookie_file(path: &Path) -> Result<Vec<NetscapeCookie>, CookieError> {
    let content = std::fs::read_to_string(path).map_err(|source| CookieError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_cookie_jar(&content))
}

/// Builds a reqwest cookie jar, dropping cookies that have already expired
pub fn build_cookie_jar(cookies: &[NetscapeCookie]) -> Arc<Jar> {
    let jar = Jar::default();
    let now = chrono::Utc::now().timestamp();
    let mut loaded = 0usize;

    for cookie in cookies {
        if cookie.is_expired_at(now) {
            tracing::debug!("Skipping expired cookie {} for {}", cookie.name, cookie.domain);
            continue;
        }

        match cookie.origin_url() {
            Some(url) => {
                jar.add_cookie_str(&cookie.set_cookie_header(), &url);
                loaded += 1;
            }
            None => tracing::debug!("Skipping cookie with unusable domain {}", cookie.domain),
        }
    }

    tracing::info!("Loaded {} cookies", loaded);
    Arc::new(jar)
}
