//! SQLite repository implementation

use crate::models::{ArchiveRecord, DumpContents, SiteStatus, StatSnapshot, TrackedSite};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Repository, StorageError, StorageResult, UpsertOutcome};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite repository backend
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Opens (or creates) a database at the given path
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

const SITE_COLUMNS: &str = "id, url, api_url, index_url, sitename, lang, dbtype, dbversion,
    engine_version, max_page_id, status, has_archive, api_available,
    last_error, last_error_at, last_check_at,
    archive_last_check_at, archive_last_error, archive_last_error_at,
    is_active, created_at, updated_at";

fn required_dt(value: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn optional_dt(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|v| v.parse().ok())
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<TrackedSite> {
    Ok(TrackedSite {
        id: row.get(0)?,
        url: row.get(1)?,
        api_url: row.get(2)?,
        index_url: row.get(3)?,
        sitename: row.get(4)?,
        lang: row.get(5)?,
        dbtype: row.get(6)?,
        dbversion: row.get(7)?,
        engine_version: row.get(8)?,
        max_page_id: row.get(9)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(10)?)
            .unwrap_or(SiteStatus::Pending),
        has_archive: row.get(11)?,
        api_available: row.get(12)?,
        last_error: row.get(13)?,
        last_error_at: optional_dt(row.get(14)?),
        last_check_at: optional_dt(row.get(15)?),
        archive_last_check_at: optional_dt(row.get(16)?),
        archive_last_error: row.get(17)?,
        archive_last_error_at: optional_dt(row.get(18)?),
        is_active: row.get(19)?,
        created_at: required_dt(row.get(20)?, 20)?,
        updated_at: required_dt(row.get(21)?, 21)?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<StatSnapshot> {
    Ok(StatSnapshot {
        id: row.get(0)?,
        site_id: row.get(1)?,
        observed_at: required_dt(row.get(2)?, 2)?,
        pages: row.get(3)?,
        articles: row.get(4)?,
        edits: row.get(5)?,
        images: row.get(6)?,
        users: row.get(7)?,
        active_users: row.get(8)?,
        admins: row.get(9)?,
        jobs: row.get(10)?,
        response_time_ms: row.get(11)?,
        http_status: row.get(12)?,
    })
}

fn archive_from_row(row: &Row<'_>) -> rusqlite::Result<ArchiveRecord> {
    Ok(ArchiveRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        ia_identifier: row.get(2)?,
        added_date: optional_dt(row.get(3)?),
        dump_date: optional_dt(row.get(4)?),
        item_size: row.get(5)?,
        uploader: row.get(6)?,
        scanner: row.get(7)?,
        upload_state: row.get(8)?,
        contents: DumpContents {
            has_xml_current: row.get(9)?,
            has_xml_history: row.get(10)?,
            has_images_dump: row.get(11)?,
            has_titles_list: row.get(12)?,
            has_images_list: row.get(13)?,
            has_legacy_dump: row.get(14)?,
        },
        created_at: required_dt(row.get(15)?, 15)?,
        updated_at: required_dt(row.get(16)?, 16)?,
    })
}

impl Repository for SqliteRepository {
    // ===== Tracked sites =====

    fn create_site(&mut self, url: &str) -> StorageResult<TrackedSite> {
        let now = Utc::now().to_rfc3339();
        let result = self.conn.execute(
            "INSERT INTO sites (url, status, created_at, updated_at) VALUES (?1, 'pending', ?2, ?2)",
            params![url, now],
        );

        match result {
            Ok(_) => self.get_site(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::DuplicateUrl(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_site(&self, id: i64) -> StorageResult<TrackedSite> {
        let sql = format!("SELECT {} FROM sites WHERE id = ?1", SITE_COLUMNS);
        self.conn
            .query_row(&sql, params![id], site_from_row)
            .optional()?
            .ok_or(StorageError::SiteNotFound(id))
    }

    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<TrackedSite>> {
        let sql = format!("SELECT {} FROM sites WHERE url = ?1", SITE_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![url], site_from_row)
            .optional()?)
    }

    fn list_sites(&self, limit: u32) -> StorageResult<Vec<TrackedSite>> {
        let sql = format!(
            "SELECT {} FROM sites ORDER BY created_at ASC, id ASC LIMIT ?1",
            SITE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sites = stmt
            .query_map(params![limit], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn update_site(&mut self, site: &TrackedSite) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE sites SET
                url = ?1, api_url = ?2, index_url = ?3, sitename = ?4, lang = ?5,
                dbtype = ?6, dbversion = ?7, engine_version = ?8, max_page_id = ?9,
                status = ?10, has_archive = ?11, api_available = ?12,
                last_error = ?13, last_error_at = ?14, last_check_at = ?15,
                archive_last_check_at = ?16, archive_last_error = ?17,
                archive_last_error_at = ?18, is_active = ?19, updated_at = ?20
             WHERE id = ?21",
            params![
                site.url,
                site.api_url,
                site.index_url,
                site.sitename,
                site.lang,
                site.dbtype,
                site.dbversion,
                site.engine_version,
                site.max_page_id,
                site.status.to_db_string(),
                site.has_archive,
                site.api_available,
                site.last_error,
                site.last_error_at.map(|t| t.to_rfc3339()),
                site.last_check_at.map(|t| t.to_rfc3339()),
                site.archive_last_check_at.map(|t| t.to_rfc3339()),
                site.archive_last_error,
                site.archive_last_error_at.map(|t| t.to_rfc3339()),
                site.is_active,
                now,
                site.id,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::SiteNotFound(site.id));
        }
        Ok(())
    }

    fn delete_site(&mut self, id: i64) -> StorageResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM sites WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::SiteNotFound(id));
        }
        Ok(())
    }

    fn due_for_collection(&self, limit: u32) -> StorageResult<Vec<TrackedSite>> {
        // SQLite sorts NULL first on ASC, which puts never-checked sites
        // at the head of the batch
        let sql = format!(
            "SELECT {} FROM sites ORDER BY last_check_at ASC, id ASC LIMIT ?1",
            SITE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sites = stmt
            .query_map(params![limit], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn due_for_archive_check(&self, limit: u32) -> StorageResult<Vec<TrackedSite>> {
        let sql = format!(
            "SELECT {} FROM sites ORDER BY archive_last_check_at ASC, id ASC LIMIT ?1",
            SITE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sites = stmt
            .query_map(params![limit], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn oldest_collection_check(&self) -> StorageResult<Option<Option<DateTime<Utc>>>> {
        let mark: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT last_check_at FROM sites ORDER BY last_check_at ASC, id ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(mark.map(optional_dt))
    }

    fn oldest_archive_check(&self) -> StorageResult<Option<Option<DateTime<Utc>>>> {
        let mark: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT archive_last_check_at FROM sites
                 ORDER BY archive_last_check_at ASC, id ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(mark.map(optional_dt))
    }

    // ===== Statistics snapshots =====

    fn create_snapshot(&mut self, snapshot: &StatSnapshot) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO snapshots (site_id, observed_at, pages, articles, edits, images,
                users, active_users, admins, jobs, response_time_ms, http_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                snapshot.site_id,
                snapshot.observed_at.to_rfc3339(),
                snapshot.pages,
                snapshot.articles,
                snapshot.edits,
                snapshot.images,
                snapshot.users,
                snapshot.active_users,
                snapshot.admins,
                snapshot.jobs,
                snapshot.response_time_ms,
                snapshot.http_status,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_snapshot(&self, site_id: i64) -> StorageResult<Option<StatSnapshot>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, site_id, observed_at, pages, articles, edits, images,
                    users, active_users, admins, jobs, response_time_ms, http_status
                 FROM snapshots WHERE site_id = ?1
                 ORDER BY observed_at DESC, id DESC LIMIT 1",
                params![site_id],
                snapshot_from_row,
            )
            .optional()?)
    }

    fn count_snapshots(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM snapshots WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Archive records =====

    fn upsert_archive_record(&mut self, record: &ArchiveRecord) -> StorageResult<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();

        let changed = self.conn.execute(
            "UPDATE archive_items SET
                added_date = ?1, dump_date = ?2, item_size = ?3,
                uploader = ?4, scanner = ?5, upload_state = ?6,
                has_xml_current = ?7, has_xml_history = ?8, has_images_dump = ?9,
                has_titles_list = ?10, has_images_list = ?11, has_legacy_dump = ?12,
                updated_at = ?13
             WHERE site_id = ?14 AND ia_identifier = ?15",
            params![
                record.added_date.map(|t| t.to_rfc3339()),
                record.dump_date.map(|t| t.to_rfc3339()),
                record.item_size,
                record.uploader,
                record.scanner,
                record.upload_state,
                record.contents.has_xml_current,
                record.contents.has_xml_history,
                record.contents.has_images_dump,
                record.contents.has_titles_list,
                record.contents.has_images_list,
                record.contents.has_legacy_dump,
                now,
                record.site_id,
                record.ia_identifier,
            ],
        )?;

        if changed > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        self.conn.execute(
            "INSERT INTO archive_items (site_id, ia_identifier, added_date, dump_date,
                item_size, uploader, scanner, upload_state,
                has_xml_current, has_xml_history, has_images_dump,
                has_titles_list, has_images_list, has_legacy_dump,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
            params![
                record.site_id,
                record.ia_identifier,
                record.added_date.map(|t| t.to_rfc3339()),
                record.dump_date.map(|t| t.to_rfc3339()),
                record.item_size,
                record.uploader,
                record.scanner,
                record.upload_state,
                record.contents.has_xml_current,
                record.contents.has_xml_history,
                record.contents.has_images_dump,
                record.contents.has_titles_list,
                record.contents.has_images_list,
                record.contents.has_legacy_dump,
                now,
            ],
        )?;
        Ok(UpsertOutcome::Inserted)
    }

    fn archive_records_for_site(&self, site_id: i64) -> StorageResult<Vec<ArchiveRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, site_id, ia_identifier, added_date, dump_date, item_size,
                uploader, scanner, upload_state,
                has_xml_current, has_xml_history, has_images_dump,
                has_titles_list, has_images_list, has_legacy_dump,
                created_at, updated_at
             FROM archive_items WHERE site_id = ?1
             ORDER BY dump_date DESC, id DESC",
        )?;
        let records = stmt
            .query_map(params![site_id], archive_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count_archive_records(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM archive_items WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_snapshot(site_id: i64) -> StatSnapshot {
        StatSnapshot {
            id: 0,
            site_id,
            observed_at: Utc::now(),
            pages: 100,
            articles: 40,
            edits: 1234,
            images: 7,
            users: 55,
            active_users: 3,
            admins: 2,
            jobs: 0,
            response_time_ms: Some(120),
            http_status: Some(200),
        }
    }

    fn sample_archive(site_id: i64, identifier: &str) -> ArchiveRecord {
        ArchiveRecord {
            id: 0,
            site_id,
            ia_identifier: identifier.to_string(),
            added_date: Some(Utc::now()),
            dump_date: Some(Utc::now()),
            item_size: Some(1024),
            uploader: Some("someone@example.org".to_string()),
            scanner: None,
            upload_state: Some("uploaded".to_string()),
            contents: DumpContents {
                has_xml_current: true,
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_and_get_site() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let site = repo.create_site("https://wiki.example.org").unwrap();

        assert!(site.id > 0);
        assert_eq!(site.url, "https://wiki.example.org");
        assert_eq!(site.status, SiteStatus::Pending);
        assert!(site.is_active);
        assert!(site.api_url.is_none());
        assert!(site.last_check_at.is_none());
    }

    #[test]
    fn test_duplicate_url_rejected() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        repo.create_site("https://wiki.example.org").unwrap();
        let err = repo.create_site("https://wiki.example.org").unwrap_err();
        assert!(matches!(err, StorageError::DuplicateUrl(_)));
    }

    #[test]
    fn test_update_site_round_trip() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let mut site = repo.create_site("https://wiki.example.org").unwrap();

        site.api_url = Some("https://wiki.example.org/w/api.php".to_string());
        site.index_url = Some("https://wiki.example.org/w/index.php".to_string());
        site.sitename = Some("Example Wiki".to_string());
        site.status = SiteStatus::Ok;
        site.last_check_at = Some(Utc::now());
        repo.update_site(&site).unwrap();

        let loaded = repo.get_site(site.id).unwrap();
        assert_eq!(
            loaded.api_url.as_deref(),
            Some("https://wiki.example.org/w/api.php")
        );
        assert_eq!(loaded.status, SiteStatus::Ok);
        assert!(loaded.last_check_at.is_some());
        assert!(loaded.updated_at >= loaded.created_at);
    }

    #[test]
    fn test_update_missing_site() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let mut site = repo.create_site("https://wiki.example.org").unwrap();
        repo.delete_site(site.id).unwrap();

        site.status = SiteStatus::Ok;
        let err = repo.update_site(&site).unwrap_err();
        assert!(matches!(err, StorageError::SiteNotFound(_)));
    }

    #[test]
    fn test_due_for_collection_nulls_first() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let mut checked = repo.create_site("https://a.example.org").unwrap();
        let never = repo.create_site("https://b.example.org").unwrap();
        let mut stale = repo.create_site("https://c.example.org").unwrap();

        checked.last_check_at = Some(Utc::now());
        repo.update_site(&checked).unwrap();
        stale.last_check_at = Some(Utc::now() - Duration::days(10));
        repo.update_site(&stale).unwrap();

        let due = repo.due_for_collection(10).unwrap();
        assert_eq!(due.len(), 3);
        assert_eq!(due[0].id, never.id, "never-checked site must come first");
        assert_eq!(due[1].id, stale.id);
        assert_eq!(due[2].id, checked.id);
    }

    #[test]
    fn test_oldest_collection_check_peek() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        assert_eq!(repo.oldest_collection_check().unwrap(), None);

        let mut site = repo.create_site("https://wiki.example.org").unwrap();
        assert_eq!(repo.oldest_collection_check().unwrap(), Some(None));

        site.last_check_at = Some(Utc::now());
        repo.update_site(&site).unwrap();
        assert!(matches!(
            repo.oldest_collection_check().unwrap(),
            Some(Some(_))
        ));
    }

    #[test]
    fn test_snapshot_append_and_latest() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let site = repo.create_site("https://wiki.example.org").unwrap();

        let mut first = sample_snapshot(site.id);
        first.observed_at = Utc::now() - Duration::hours(1);
        first.pages = 90;
        repo.create_snapshot(&first).unwrap();

        let second = sample_snapshot(site.id);
        repo.create_snapshot(&second).unwrap();

        assert_eq!(repo.count_snapshots(site.id).unwrap(), 2);
        let latest = repo.latest_snapshot(site.id).unwrap().unwrap();
        assert_eq!(latest.pages, 100);
    }

    #[test]
    fn test_archive_upsert_outcomes() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let site = repo.create_site("https://wiki.example.org").unwrap();

        let mut record = sample_archive(site.id, "wiki-example-20240101");
        assert_eq!(
            repo.upsert_archive_record(&record).unwrap(),
            UpsertOutcome::Inserted
        );

        record.item_size = Some(2048);
        assert_eq!(
            repo.upsert_archive_record(&record).unwrap(),
            UpsertOutcome::Updated
        );

        assert_eq!(repo.count_archive_records(site.id).unwrap(), 1);
        let stored = repo.archive_records_for_site(site.id).unwrap();
        assert_eq!(stored[0].item_size, Some(2048));
        assert!(stored[0].contents.has_xml_current);
    }

    #[test]
    fn test_delete_site_cascades() {
        let mut repo = SqliteRepository::new_in_memory().unwrap();
        let site = repo.create_site("https://wiki.example.org").unwrap();
        repo.create_snapshot(&sample_snapshot(site.id)).unwrap();
        repo.upsert_archive_record(&sample_archive(site.id, "wiki-example-20240101"))
            .unwrap();

        repo.delete_site(site.id).unwrap();

        assert_eq!(repo.count_snapshots(site.id).unwrap(), 0);
        assert_eq!(repo.count_archive_records(site.id).unwrap(), 0);
        assert!(matches!(
            repo.get_site(site.id),
            Err(StorageError::SiteNotFound(_))
        ));
    }
}
