//! SQLite schema definition

use rusqlite::Connection;

/// Creates all tables and indexes if they do not exist
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            api_url TEXT,
            index_url TEXT,
            sitename TEXT,
            lang TEXT,
            dbtype TEXT,
            dbversion TEXT,
            engine_version TEXT,
            max_page_id INTEGER,
            status TEXT NOT NULL DEFAULT 'pending',
            has_archive INTEGER NOT NULL DEFAULT 0,
            api_available INTEGER NOT NULL DEFAULT 1,
            last_error TEXT,
            last_error_at TEXT,
            last_check_at TEXT,
            archive_last_check_at TEXT,
            archive_last_error TEXT,
            archive_last_error_at TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sites_status ON sites(status);
        CREATE INDEX IF NOT EXISTS idx_sites_api_url ON sites(api_url);
        CREATE INDEX IF NOT EXISTS idx_sites_last_check ON sites(last_check_at);
        CREATE INDEX IF NOT EXISTS idx_sites_archive_last_check ON sites(archive_last_check_at);

        CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            observed_at TEXT NOT NULL,
            pages INTEGER NOT NULL DEFAULT 0,
            articles INTEGER NOT NULL DEFAULT 0,
            edits INTEGER NOT NULL DEFAULT 0,
            images INTEGER NOT NULL DEFAULT 0,
            users INTEGER NOT NULL DEFAULT 0,
            active_users INTEGER NOT NULL DEFAULT 0,
            admins INTEGER NOT NULL DEFAULT 0,
            jobs INTEGER NOT NULL DEFAULT 0,
            response_time_ms INTEGER,
            http_status INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_site_time ON snapshots(site_id, observed_at);

        CREATE TABLE IF NOT EXISTS archive_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            ia_identifier TEXT NOT NULL,
            added_date TEXT,
            dump_date TEXT,
            item_size INTEGER,
            uploader TEXT,
            scanner TEXT,
            upload_state TEXT,
            has_xml_current INTEGER NOT NULL DEFAULT 0,
            has_xml_history INTEGER NOT NULL DEFAULT 0,
            has_images_dump INTEGER NOT NULL DEFAULT 0,
            has_titles_list INTEGER NOT NULL DEFAULT 0,
            has_images_list INTEGER NOT NULL DEFAULT 0,
            has_legacy_dump INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(site_id, ia_identifier)
        );

        CREATE INDEX IF NOT EXISTS idx_archive_items_site ON archive_items(site_id);
        ",
    )
}
