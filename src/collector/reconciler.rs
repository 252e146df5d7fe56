//! Duplicate site reconciliation
//!
//! Two registrations can resolve to the same API URL, typically when a
//! wiki was added under both its old and new domain. The registration
//! created later loses; ties on the timestamp fall back to the higher id.

use crate::models::TrackedSite;
use crate::storage::{Repository, StorageError};

/// How many sites one reconciliation pass scans
const SCAN_LIMIT: u32 = 100;

/// Resolves duplicate registrations of one API URL
///
/// Deletes every other site sharing `api_url` that was created after
/// `current`. Returns `true` when `current` itself is the newer
/// registration and should be deleted by the caller.
pub fn resolve_duplicate<R: Repository + ?Sized>(
    repo: &mut R,
    current: &TrackedSite,
    api_url: &str,
) -> Result<bool, StorageError> {
    let sites = repo.list_sites(SCAN_LIMIT)?;

    for other in sites {
        if other.id == current.id {
            continue;
        }
        if other.api_url.as_deref() != Some(api_url) {
            continue;
        }

        let current_is_newer = (other.created_at, other.id) < (current.created_at, current.id);
        if current_is_newer {
            tracing::info!(
                api_url,
                kept = other.id,
                duplicate = current.id,
                "current site duplicates an older registration"
            );
            return Ok(true);
        }

        tracing::info!(api_url, kept = current.id, duplicate = other.id, "removing duplicate site");
        repo.delete_site(other.id)?;
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteRepository;

    const API: &str = "https://wiki.example.org/w/api.php";

    fn site_with_api(repo: &mut SqliteRepository, url: &str, api_url: &str) -> TrackedSite {
        let mut site = repo.create_site(url).unwrap();
        site.api_url = Some(api_url.to_string());
        repo.update_site(&site).unwrap();
        repo.get_site(site.id).unwrap()
    }

    #[test]
    fn test_newer_registration_loses() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let older = site_with_api(&mut repo, "https://wiki.example.org", API);
        let newer = site_with_api(&mut repo, "https://example.org/wiki", API);

        // Collecting the newer registration marks it for deletion
        assert!(resolve_duplicate(&mut repo, &newer, API).unwrap());
        assert!(repo.get_site(older.id).is_ok());

        // Collecting the older registration deletes the newer one
        assert!(!resolve_duplicate(&mut repo, &older, API).unwrap());
        assert!(repo.get_site(newer.id).is_err());
        assert!(repo.get_site(older.id).is_ok());
    }

    #[test]
    fn test_distinct_api_urls_untouched() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let a = site_with_api(&mut repo, "https://a.example.org", API);
        let b = site_with_api(
            &mut repo,
            "https://b.example.org",
            "https://b.example.org/w/api.php",
        );

        assert!(!resolve_duplicate(&mut repo, &a, API).unwrap());
        assert!(repo.get_site(b.id).is_ok());
    }

    #[test]
    fn test_undetected_sites_ignored() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let detected = site_with_api(&mut repo, "https://a.example.org", API);
        let pending = repo.create_site("https://b.example.org").unwrap();

        assert!(!resolve_duplicate(&mut repo, &detected, API).unwrap());
        assert!(repo.get_site(pending.id).is_ok());
    }
}
