//! Archive.org backup record entity

use chrono::{DateTime, Utc};

/// Content classification flags for one archive item
///
/// Flags are derived from file names inside the item; several may be true
/// for a single dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpContents {
    pub has_xml_current: bool,
    pub has_xml_history: bool,
    pub has_images_dump: bool,
    pub has_titles_list: bool,
    pub has_images_list: bool,
    pub has_legacy_dump: bool,
}

impl DumpContents {
    /// Returns true if any content flag is set
    pub fn any(&self) -> bool {
        self.has_xml_current
            || self.has_xml_history
            || self.has_images_dump
            || self.has_titles_list
            || self.has_images_list
            || self.has_legacy_dump
    }
}

/// Metadata about one matching backup item found on archive.org
///
/// Unique per `(site_id, ia_identifier)`; re-discovery of the same
/// identifier updates the existing row rather than duplicating it.
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub id: i64,
    pub site_id: i64,

    /// Archive.org item identifier
    pub ia_identifier: String,

    pub added_date: Option<DateTime<Utc>>,
    pub dump_date: Option<DateTime<Utc>>,
    pub item_size: Option<i64>,
    pub uploader: Option<String>,
    pub scanner: Option<String>,
    pub upload_state: Option<String>,

    pub contents: DumpContents,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
