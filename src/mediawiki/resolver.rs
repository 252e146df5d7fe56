//! MediaWiki API endpoint detection
//!
//! Detection walks the common install layouts (`/w/`, root, `/wiki/`) and
//! follows permanent redirects only when they keep the path intact, so a
//! host move is adopted while a path rewrite (usually a custom 404 page or
//! a farm landing page) discards the candidate.

use crate::mediawiki::{body_excerpt, MediaWikiClient, MediaWikiError};
use url::Url;

/// A successfully detected pair of endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Detected `api.php` URL
    pub api_url: String,
    /// Matching `index.php` URL
    pub index_url: String,
    /// Whether the base URL was upgraded from http to https
    pub upgraded: bool,
}

/// Outcome of probing one candidate API URL
enum ProbeOutcome {
    /// HTTP 200 with a JSON body containing a `query` key
    Valid,
    /// Anything else; body kept for error reporting
    Rejected { status: u16, body: String },
}

impl MediaWikiClient {
    /// Detects the API and index URLs for a wiki base URL
    ///
    /// Candidates are probed in order: `{base}/w/api.php`, `{base}/api.php`,
    /// `{base}/wiki/api.php`. The first candidate that answers a siteinfo
    /// query with a valid MediaWiki response wins.
    pub async fn resolve(&self, site_url: &str) -> Result<ResolvedEndpoint, MediaWikiError> {
        let (base, upgraded) = self.detect_scheme_upgrade(site_url).await;
        let base = base.trim_end_matches('/');

        let candidates = [
            (format!("{base}/w/api.php"), format!("{base}/w/index.php")),
            (format!("{base}/api.php"), format!("{base}/index.php")),
            (
                format!("{base}/wiki/api.php"),
                format!("{base}/wiki/index.php"),
            ),
        ];

        let mut last_status: Option<(u16, String)> = None;
        let mut last_transport: Option<reqwest::Error> = None;

        for (api_url, index_url) in &candidates {
            if let Some(target) = self.permanent_redirect_target(api_url).await {
                if paths_match(api_url, &target) {
                    // Scheme or host moved but the layout is the same; adopt
                    // the target if it actually answers as a MediaWiki API
                    tracing::debug!(from = %api_url, to = %target, "following permanent redirect");
                    if let Ok(ProbeOutcome::Valid) = self.probe_api(&target).await {
                        let index_url = remap_index_url(&target, index_url)
                            .unwrap_or_else(|| index_url.clone());
                        return Ok(ResolvedEndpoint {
                            api_url: target,
                            index_url,
                            upgraded,
                        });
                    }
                    // Redirect target does not answer; fall through and test
                    // the original candidate
                } else {
                    tracing::debug!(from = %api_url, to = %target, "ignoring path redirect");
                    continue;
                }
            }

            match self.probe_api(api_url).await {
                Ok(ProbeOutcome::Valid) => {
                    return Ok(ResolvedEndpoint {
                        api_url: api_url.clone(),
                        index_url: index_url.clone(),
                        upgraded,
                    });
                }
                Ok(ProbeOutcome::Rejected { status, body }) => {
                    last_status = Some((status, body));
                }
                Err(e) => {
                    last_transport = Some(e);
                }
            }
        }

        let mut detail = format!("tried {} candidates", candidates.len());
        if let Some((status, body)) = last_status {
            detail = format!("{detail}, last HTTP {status}: {}", body_excerpt(&body));
        } else if let Some(e) = last_transport {
            detail = format!("{detail}, last error: {e}");
        }

        Err(MediaWikiError::NotFound {
            url: base.to_string(),
            detail,
        })
    }

    /// Probes whether the https variant of an http URL is reachable
    ///
    /// Returns the URL to use and whether an upgrade happened. Any 2xx or
    /// 3xx answer on the https side is taken as proof of TLS support.
    async fn detect_scheme_upgrade(&self, site_url: &str) -> (String, bool) {
        let Some(rest) = site_url.strip_prefix("http://") else {
            return (site_url.to_string(), false);
        };

        let https_url = format!("https://{rest}");
        let probe_url = format!("{}/", https_url.trim_end_matches('/'));

        match self.http().head(&probe_url).send().await {
            Ok(response) if response.status().as_u16() < 400 => {
                tracing::info!(from = %site_url, to = %https_url, "scheme upgraded");
                (https_url, true)
            }
            _ => (site_url.to_string(), false),
        }
    }

    /// Checks a URL for a permanent redirect (301 or 308)
    ///
    /// Returns the absolute redirect target, or `None` when the URL does
    /// not permanently redirect (including when the probe itself fails).
    async fn permanent_redirect_target(&self, url: &str) -> Option<String> {
        let response = self.probe().head(url).send().await.ok()?;
        let status = response.status().as_u16();
        if status != 301 && status != 308 {
            return None;
        }

        let location = response.headers().get(reqwest::header::LOCATION)?;
        let location = location.to_str().ok()?;

        // Location may be relative
        let base = Url::parse(url).ok()?;
        let target = base.join(location).ok()?;
        Some(target.to_string())
    }

    /// Sends a siteinfo query and checks for a valid MediaWiki answer
    async fn probe_api(&self, api_url: &str) -> Result<ProbeOutcome, reqwest::Error> {
        let test_url = format!("{api_url}?action=query&meta=siteinfo&format=json");
        let response = self.http().get(&test_url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status == 200 {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
                if value.get("query").is_some() {
                    return Ok(ProbeOutcome::Valid);
                }
            }
        }

        Ok(ProbeOutcome::Rejected { status, body })
    }
}

/// Checks whether two URLs share the same path
fn paths_match(original: &str, redirected: &str) -> bool {
    match (Url::parse(original), Url::parse(redirected)) {
        (Ok(a), Ok(b)) => a.path() == b.path(),
        _ => false,
    }
}

/// Rebuilds an index URL on the redirect target's scheme and host while
/// keeping the original index path
fn remap_index_url(redirected_api: &str, original_index: &str) -> Option<String> {
    let target = Url::parse(redirected_api).ok()?;
    let original = Url::parse(original_index).ok()?;

    let mut remapped = target;
    remapped.set_path(original.path());
    remapped.set_query(None);
    remapped.set_fragment(None);
    Some(remapped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_match() {
        assert!(paths_match(
            "http://wiki.example.org/w/api.php",
            "https://wiki.example.org/w/api.php"
        ));
        assert!(paths_match(
            "https://old.example.org/w/api.php",
            "https://new.example.org/w/api.php"
        ));
        assert!(!paths_match(
            "https://wiki.example.org/w/api.php",
            "https://wiki.example.org/landing"
        ));
    }

    #[test]
    fn test_remap_index_url() {
        let remapped = remap_index_url(
            "https://new.example.org/w/api.php",
            "http://old.example.org/w/index.php",
        );
        assert_eq!(
            remapped.as_deref(),
            Some("https://new.example.org/w/index.php")
        );
    }
}
