//! MediaWiki API client
//!
//! This module handles all HTTP interaction with tracked wikis:
//! - API endpoint detection across common install layouts
//! - Scheme upgrade probing (http -> https)
//! - Permanent-redirect handling during detection
//! - Fetching siteinfo general data and statistics

pub mod resolver;
pub mod siteinfo;

use crate::config::HttpConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

pub use resolver::ResolvedEndpoint;
pub use siteinfo::{SiteGeneral, SiteInfo, SiteStatistics};

/// Errors produced while talking to a MediaWiki installation
#[derive(Debug, Error)]
pub enum MediaWikiError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {excerpt}")]
    Status {
        url: String,
        status: u16,
        excerpt: String,
    },

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("API error from {url}: {code}: {info}")]
    Api {
        url: String,
        code: String,
        info: String,
    },

    #[error("MediaWiki API not found for {url} ({detail})")]
    NotFound { url: String, detail: String },
}

/// Client for MediaWiki endpoint detection and siteinfo queries
///
/// Holds two reqwest clients: one that follows redirects for ordinary API
/// requests, and one with redirects disabled so detection can inspect
/// permanent redirects itself.
pub struct MediaWikiClient {
    http: Client,
    probe: Client,
}

impl MediaWikiClient {
    /// Builds a client from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        // Redirects are handled manually during endpoint detection
        let probe = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::none())
            .build()?;

        Ok(Self { http, probe })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn probe(&self) -> &Client {
        &self.probe
    }
}

/// Collapses a response body into a short single-line excerpt for error
/// messages
pub(crate) fn body_excerpt(body: &str) -> String {
    let mut flat = body.replace(['\n', '\r'], " ").trim().to_string();
    if flat.chars().count() > 120 {
        flat = flat.chars().take(120).collect::<String>() + "...";
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_excerpt_truncates() {
        let long = "x".repeat(300);
        let excerpt = body_excerpt(&long);
        assert_eq!(excerpt.chars().count(), 123);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_body_excerpt_flattens_newlines() {
        let body = "  <html>\n<body>\r\nNot a wiki</body>  ";
        assert_eq!(body_excerpt(body), "<html> <body>  Not a wiki</body>");
    }

    #[test]
    fn test_build_client() {
        let config = HttpConfig::default();
        assert!(MediaWikiClient::new(&config).is_ok());
    }
}
