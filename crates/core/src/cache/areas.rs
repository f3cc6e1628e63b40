//! Named, versioned cache areas.
//!
//! An area is the unit of cache lifecycle: it is opened at install time,
//! written by the request strategies, and deleted wholesale when a newer
//! generation activates. Deleting an area cascades to its entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// What an area holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AreaPurpose {
    /// Install-time assets served cache-first.
    Static,
    /// Responses captured at runtime.
    Dynamic,
}

impl AreaPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaPurpose::Static => "static",
            AreaPurpose::Dynamic => "dynamic",
        }
    }
}

impl std::fmt::Display for AreaPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named cache area. The name carries the version suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheArea {
    pub name: String,
    pub purpose: AreaPurpose,
}

impl CacheArea {
    pub fn new(name: impl Into<String>, purpose: AreaPurpose) -> Self {
        Self { name: name.into(), purpose }
    }
}

impl CacheDb {
    /// Create the area if it does not exist yet.
    pub async fn open_area(&self, area: &CacheArea) -> Result<(), Error> {
        let area = area.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_areas (name, purpose, created_at) VALUES (?1, ?2, ?3)",
                    params![area.name, area.purpose.as_str(), now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every existing area, oldest first.
    pub async fn area_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_areas ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an area and everything stored in it.
    ///
    /// Returns false if the area did not exist.
    pub async fn delete_area(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_areas WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every area owned by `prefix` whose name is not in `keep`.
    ///
    /// Areas without the prefix belong to other applications and are left
    /// alone. Returns the deleted names.
    pub async fn reap_areas(&self, prefix: &str, keep: &[String]) -> Result<Vec<String>, Error> {
        let prefix = prefix.to_string();
        let keep = keep.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let names = {
                    let mut stmt = tx.prepare("SELECT name FROM cache_areas ORDER BY created_at ASC, name ASC")?;
                    let names = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?;
                    names
                };

                let stale: Vec<String> = names
                    .into_iter()
                    .filter(|name| name.starts_with(&prefix) && !keep.contains(name))
                    .collect();

                for name in &stale {
                    tx.execute("DELETE FROM cache_areas WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every area owned by `prefix`, regardless of version.
    pub async fn clear_areas(&self, prefix: &str) -> Result<Vec<String>, Error> {
        self.reap_areas(prefix, &[]).await
    }

    /// Number of entries stored in an area.
    pub async fn entry_count(&self, area: &str) -> Result<u64, Error> {
        let area = area.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE area = ?1", params![area], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db_with_areas(names: &[&str]) -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in names {
            db.open_area(&CacheArea::new(*name, AreaPurpose::Static)).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_open_area_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let area = CacheArea::new("app-static-v1", AreaPurpose::Static);
        db.open_area(&area).await.unwrap();
        db.open_area(&area).await.unwrap();
        assert_eq!(db.area_names().await.unwrap(), vec!["app-static-v1"]);
    }

    #[tokio::test]
    async fn test_reap_respects_prefix() {
        let db = db_with_areas(&["v1", "v2", "other-app-x"]).await;

        let deleted = db.reap_areas("v", &["v2".to_string()]).await.unwrap();
        assert_eq!(deleted, vec!["v1"]);

        let mut remaining = db.area_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["other-app-x", "v2"]);
    }

    #[tokio::test]
    async fn test_clear_areas_twice() {
        let db = db_with_areas(&["app-static-v1", "app-dynamic-v1", "app-static-v2"]).await;

        let first = db.clear_areas("app-").await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(db.area_names().await.unwrap().is_empty());

        let second = db.clear_areas("app-").await.unwrap();
        assert!(second.is_empty());
        assert!(db.area_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_area() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.delete_area("nope").await.unwrap());
    }

    #[test]
    fn test_purpose_serde() {
        assert_eq!(serde_json::to_string(&AreaPurpose::Dynamic).unwrap(), "\"dynamic\"");
        assert_eq!(AreaPurpose::Static.to_string(), "static");
    }
}
