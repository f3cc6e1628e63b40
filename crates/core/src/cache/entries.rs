//! Stored response snapshots.
//!
//! Entries are keyed by request identity within an area. Writing an entry
//! opens its area implicitly, so a strategy never has to sequence an
//! `open_area` call before its first write.

use super::areas::CacheArea;
use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheEntry {
    /// Snapshot a response for `method` + `url`, stamped with the current time.
    pub fn new(
        method: &str, url: &str, status_code: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            key_hash: compute_cache_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status_code,
            headers,
            body: body.into(),
            stored_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        }
    }

    /// First header value with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

const SELECT_ENTRY: &str = "SELECT key_hash, method, url, status_code, headers_json, body, stored_at FROM cache_entries";

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(CacheEntry, String)> {
    Ok((
        CacheEntry {
            key_hash: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            status_code: row.get(3)?,
            headers: Vec::new(),
            body: row.get(5)?,
            stored_at: row.get(6)?,
        },
        row.get(4)?,
    ))
}

fn decode(found: rusqlite::Result<(CacheEntry, String)>) -> Result<Option<CacheEntry>, Error> {
    match found {
        Ok((mut entry, headers_json)) => {
            entry.headers = serde_json::from_str(&headers_json)?;
            Ok(Some(entry))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl CacheDb {
    /// Insert or replace an entry in `area`, creating the area if needed.
    pub async fn put_entry(&self, area: &CacheArea, entry: &CacheEntry) -> Result<(), Error> {
        let area = area.clone();
        let entry = entry.clone();
        let headers_json = serde_json::to_string(&entry.headers)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_areas (name, purpose, created_at) VALUES (?1, ?2, ?3)",
                    params![area.name, area.purpose.as_str(), now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        area, key_hash, method, url, status_code, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(area, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status_code = excluded.status_code,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        area.name,
                        entry.key_hash,
                        entry.method,
                        entry.url,
                        entry.status_code,
                        headers_json,
                        entry.body,
                        entry.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry in one area.
    pub async fn match_entry(&self, area: &str, key_hash: &str) -> Result<Option<CacheEntry>, Error> {
        let area = area.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_ENTRY} WHERE area = ?1 AND key_hash = ?2"))?;
                let found = stmt.query_row(params![area, key_hash], read_entry);
                decode(found)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry across every area owned by `prefix`.
    ///
    /// When several areas hold the key, the most recently stored copy wins.
    pub async fn match_any(&self, prefix: &str, key_hash: &str) -> Result<Option<CacheEntry>, Error> {
        let prefix = prefix.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_ENTRY}
                     WHERE key_hash = ?1 AND substr(area, 1, length(?2)) = ?2
                     ORDER BY stored_at DESC LIMIT 1"
                ))?;
                let found = stmt.query_row(params![key_hash, prefix], read_entry);
                decode(found)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::areas::AreaPurpose;

    fn html_entry(url: &str, body: &str) -> CacheEntry {
        CacheEntry::new("GET", url, 200, vec![("Content-Type".into(), "text/html".into())], body)
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let area = CacheArea::new("app-static-v1", AreaPurpose::Static);
        let entry = html_entry("https://example.com/", "<h1>hi</h1>");

        db.put_entry(&area, &entry).await.unwrap();

        let found = db.match_entry(&area.name, &entry.key_hash).await.unwrap().unwrap();
        assert_eq!(found.body, b"<h1>hi</h1>");
        assert_eq!(found.header("content-type"), Some("text/html"));
        assert_eq!(db.area_names().await.unwrap(), vec!["app-static-v1"]);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.match_entry("app-static-v1", "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let area = CacheArea::new("app-dynamic-v1", AreaPurpose::Dynamic);
        db.put_entry(&area, &html_entry("https://example.com/a", "A")).await.unwrap();
        db.put_entry(&area, &html_entry("https://example.com/a", "B")).await.unwrap();

        assert_eq!(db.entry_count(&area.name).await.unwrap(), 1);
        let key = compute_cache_key("GET", "https://example.com/a");
        assert_eq!(db.match_entry(&area.name, &key).await.unwrap().unwrap().body, b"B");
    }

    #[tokio::test]
    async fn test_match_any_scoped_to_prefix() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = html_entry("https://example.com/page", "theirs");
        db.put_entry(&CacheArea::new("other-dynamic", AreaPurpose::Dynamic), &entry)
            .await
            .unwrap();

        assert!(db.match_any("app-", &entry.key_hash).await.unwrap().is_none());

        db.put_entry(&CacheArea::new("app-dynamic-v1", AreaPurpose::Dynamic), &html_entry("https://example.com/page", "ours"))
            .await
            .unwrap();
        let found = db.match_any("app-", &entry.key_hash).await.unwrap().unwrap();
        assert_eq!(found.body, b"ours");
    }

    #[tokio::test]
    async fn test_delete_area_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let area = CacheArea::new("app-static-v1", AreaPurpose::Static);
        let entry = html_entry("https://example.com/", "x");
        db.put_entry(&area, &entry).await.unwrap();

        assert!(db.delete_area(&area.name).await.unwrap());
        assert_eq!(db.entry_count(&area.name).await.unwrap(), 0);
        assert!(db.match_entry(&area.name, &entry.key_hash).await.unwrap().is_none());
    }
}
