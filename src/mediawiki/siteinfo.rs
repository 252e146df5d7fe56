//! Siteinfo fetching and tolerant response parsing
//!
//! MediaWiki versions in the wild disagree on number formatting: some emit
//! statistics as JSON numbers, old installs emit numeric strings. Parsing
//! accepts both and treats anything unreadable as zero rather than failing
//! the whole collection.

use crate::mediawiki::{body_excerpt, MediaWikiClient, MediaWikiError};
use serde_json::Value;
use std::time::Instant;

/// General site information from `siprop=general`
#[derive(Debug, Clone, Default)]
pub struct SiteGeneral {
    pub sitename: Option<String>,
    pub lang: Option<String>,
    pub dbtype: Option<String>,
    pub dbversion: Option<String>,
    /// MediaWiki version string, e.g. "MediaWiki 1.39.4"
    pub generator: Option<String>,
    pub max_page_id: Option<i64>,
}

/// Wiki statistics from `siprop=statistics`
#[derive(Debug, Clone, Default)]
pub struct SiteStatistics {
    pub pages: i64,
    pub articles: i64,
    pub edits: i64,
    pub images: i64,
    pub users: i64,
    pub active_users: i64,
    pub admins: i64,
    pub jobs: i64,
}

/// One siteinfo fetch, with timing attached
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub general: SiteGeneral,
    pub statistics: SiteStatistics,
    pub response_time_ms: i64,
    pub http_status: u16,
}

impl MediaWikiClient {
    /// Fetches general info and statistics from a detected API URL
    pub async fn fetch_siteinfo(&self, api_url: &str) -> Result<SiteInfo, MediaWikiError> {
        let request_url =
            format!("{api_url}?action=query&meta=siteinfo&siprop=general|statistics&format=json");

        let start = Instant::now();
        let response = self
            .http()
            .get(&request_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| MediaWikiError::Transport {
                url: api_url.to_string(),
                source: e,
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| MediaWikiError::Transport {
                url: api_url.to_string(),
                source: e,
            })?;
        let elapsed_ms = start.elapsed().as_millis() as i64;

        if status != 200 {
            return Err(MediaWikiError::Status {
                url: api_url.to_string(),
                status,
                excerpt: body_excerpt(&body),
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| MediaWikiError::InvalidResponse {
                url: api_url.to_string(),
                message: format!("JSON decode: {e}"),
            })?;

        if let Some(error) = value.get("error") {
            return Err(MediaWikiError::Api {
                url: api_url.to_string(),
                code: string_field(error, "code").unwrap_or_else(|| "unknown".to_string()),
                info: string_field(error, "info").unwrap_or_default(),
            });
        }

        let query = value
            .get("query")
            .ok_or_else(|| MediaWikiError::InvalidResponse {
                url: api_url.to_string(),
                message: "missing query object".to_string(),
            })?;

        let general = parse_general(query.get("general"));
        let statistics = parse_statistics(query.get("statistics"));

        tracing::info!(
            sitename = general.sitename.as_deref().unwrap_or("?"),
            pages = statistics.pages,
            edits = statistics.edits,
            elapsed_ms,
            "fetched siteinfo"
        );

        Ok(SiteInfo {
            general,
            statistics,
            response_time_ms: elapsed_ms,
            http_status: status,
        })
    }
}

fn parse_general(data: Option<&Value>) -> SiteGeneral {
    let Some(data) = data else {
        return SiteGeneral::default();
    };

    SiteGeneral {
        sitename: string_field(data, "sitename"),
        lang: string_field(data, "lang"),
        dbtype: string_field(data, "dbtype"),
        dbversion: string_field(data, "dbversion"),
        generator: string_field(data, "generator"),
        max_page_id: opt_int_field(data, "maxpageid"),
    }
}

fn parse_statistics(data: Option<&Value>) -> SiteStatistics {
    let Some(data) = data else {
        return SiteStatistics::default();
    };

    SiteStatistics {
        pages: int_field(data, "pages"),
        articles: int_field(data, "articles"),
        edits: int_field(data, "edits"),
        images: int_field(data, "images"),
        users: int_field(data, "users"),
        active_users: int_field(data, "activeusers"),
        admins: int_field(data, "admins"),
        jobs: int_field(data, "jobs"),
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a count that may be a number or a numeric string; anything else
/// counts as zero
fn int_field(data: &Value, key: &str) -> i64 {
    opt_int_field(data, key).unwrap_or(0)
}

fn opt_int_field(data: &Value, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
