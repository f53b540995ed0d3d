//! HTTP-backed renderer
//!
//! This module loads pages without a browser engine:
//! - Building HTTP clients with the session's user agent and cookie jar
//! - GET of the main document, following redirects
//! - Fetching the sub-resources referenced by the document, the way a
//!   browser would while waiting for the network to go idle
//! - Error classification into `RenderError`

use crate::crawler::parser::extract_resource_urls;
use crate::crawler::renderer::{
    NavigateOptions, Navigation, RenderError, Renderer, ResourceResponse, ResponseSender,
    WaitCondition,
};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use url::Url;

/// Maximum redirect hops followed for any single request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client for rendering
///
/// # Arguments
///
/// * `user_agent` - The user agent presented on every request
/// * `cookies` - Optional jar preloaded from a cookie file
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use site_mirror::crawler::build_http_client;
///
/// let client = build_http_client("site-mirror/1.0", None).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, cookies: Option<Arc<Jar>>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true);

    if let Some(jar) = cookies {
        builder = builder.cookie_provider(jar);
    }

    builder.build()
}

/// Renders pages with plain HTTP requests
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn navigate(
        &self,
        url: &Url,
        options: &NavigateOptions,
        events: ResponseSender,
    ) -> Result<Navigation, RenderError> {
        let deadline = Instant::now() + options.timeout;
        let timed_out = || RenderError::Timeout {
            url: url.to_string(),
            timeout: options.timeout,
        };

        let response = timeout_at(deadline, self.client.get(url.clone()).send())
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| classify_error(url, e, options.timeout))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = collect_headers(response.headers());

        let body = timeout_at(deadline, response.bytes())
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| RenderError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let html = String::from_utf8_lossy(&body).into_owned();
        let _ = events.send(ResourceResponse {
            url: final_url.to_string(),
            status,
            headers,
            body: body.to_vec(),
        });

        let loaded = (200..300).contains(&status);
        if loaded && options.wait_condition == WaitCondition::NetworkIdle {
            let resources = extract_resource_urls(&html, &final_url);
            tracing::debug!("Loading {} sub-resources for {}", resources.len(), final_url);

            timeout_at(deadline, self.load_resources(resources, &events))
                .await
                .map_err(|_| timed_out())?;
        }

        Ok(Navigation {
            status: Some(status),
            final_url,
            html,
        })
    }
}

impl HttpRenderer {
    /// Fetches sub-resources concurrently, emitting each response as it arrives
    async fn load_resources(&self, resources: Vec<Url>, events: &ResponseSender) {
        let mut requests = JoinSet::new();
        for resource in resources {
            let client = self.client.clone();
            requests.spawn(async move { fetch_resource(&client, resource).await });
        }

        while let Some(joined) = requests.join_next().await {
            match joined {
                Ok(Some(response)) => {
                    let _ = events.send(response);
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("Resource request task failed: {}", e),
            }
        }
    }
}

/// GETs one sub-resource; request failures yield no response event
async fn fetch_resource(client: &Client, url: Url) -> Option<ResourceResponse> {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Resource request to {} failed: {}", url, e);
            return None;
        }
    };

    let status = response.status().as_u16();
    let headers = collect_headers(response.headers());
    match response.bytes().await {
        Ok(body) => Some(ResourceResponse {
            url: url.to_string(),
            status,
            headers,
            body: body.to_vec(),
        }),
        Err(e) => {
            tracing::debug!("Failed to read resource body from {}: {}", url, e);
            None
        }
    }
}

/// Flattens response headers into a map keyed by lowercase name
fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn classify_error(url: &Url, error: reqwest::Error, timeout: Duration) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else if error.is_connect() {
        RenderError::Unreachable {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        RenderError::Unreachable {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
