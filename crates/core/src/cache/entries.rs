//! SQLite implementation of [`CacheStore`].
//!
//! Namespaces are rows in `namespaces`; entries cascade away with them.
//! Writes use UPSERT, so concurrent writers to one identity resolve as
//! last-write-wins.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::store::{CacheStore, StoredEntry};
use crate::{Error, ResponseSnapshot};

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        namespace, key_hash, method, url, response_url, status_code, status_text, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(namespace, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        response_url = excluded.response_url,
        status_code = excluded.status_code,
        status_text = excluded.status_text,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

const ENSURE_NAMESPACE: &str = "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)";

/// Column values of an entry, encoded ahead of the blocking call.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    response_url: String,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn encode(entry: StoredEntry) -> Result<Self, Error> {
        let headers_json = serde_json::to_string(&entry.response.headers)?;
        Ok(Self {
            key: entry.key,
            method: entry.method,
            url: entry.url,
            response_url: entry.response.url,
            status: i64::from(entry.response.status),
            status_text: entry.response.status_text,
            headers_json,
            body: entry.response.body.to_vec(),
            stored_at: entry.response.stored_at.to_rfc3339(),
        })
    }

    fn write(&self, conn: &rusqlite::Connection, namespace: &str) -> Result<(), Error> {
        conn.execute(
            UPSERT_ENTRY,
            params![
                namespace,
                &self.key,
                &self.method,
                &self.url,
                &self.response_url,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body,
                &self.stored_at,
            ],
        )?;
        Ok(())
    }
}

/// Raw column values of a selected entry.
struct RawEntry {
    key: String,
    method: String,
    url: String,
    response_url: String,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            response_url: row.get(3)?,
            status: row.get(4)?,
            status_text: row.get(5)?,
            headers_json: row.get(6)?,
            body: row.get(7)?,
            stored_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<StoredEntry, Error> {
        let status =
            u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {} out of range", self.status)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        let stored_at = DateTime::parse_from_rfc3339(&self.stored_at)
            .map_err(|e| Error::CorruptEntry(format!("stored_at: {e}")))?
            .with_timezone(&Utc);

        Ok(StoredEntry {
            key: self.key,
            method: self.method,
            url: self.url,
            response: ResponseSnapshot {
                url: self.response_url,
                status,
                status_text: self.status_text,
                headers,
                body: Bytes::from(self.body),
                stored_at,
            },
        })
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn create_namespace(&self, namespace: &str) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(ENSURE_NAMESPACE, params![namespace, now])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM namespaces ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<bool, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM namespaces WHERE name = ?1", params![namespace])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(&self, namespace: &str, key: &str) -> Result<Option<StoredEntry>, Error> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, response_url, status_code, status_text, headers_json, body, stored_at
                    FROM entries WHERE namespace = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![namespace, key], RawEntry::from_row);

                match result {
                    Ok(raw) => raw.decode().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put_entry(&self, namespace: &str, entry: StoredEntry) -> Result<(), Error> {
        self.put_all(namespace, vec![entry]).await
    }

    async fn put_all(&self, namespace: &str, entries: Vec<StoredEntry>) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let rows = entries.into_iter().map(EntryRow::encode).collect::<Result<Vec<_>, _>>()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_NAMESPACE, params![&namespace, now])?;
                for row in &rows {
                    row.write(&tx, &namespace)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn count_entries(&self, namespace: &str) -> Result<u64, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE namespace = ?1", params![namespace], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
