//! The relational metadata store: the authoritative record of files and
//! chunks that every other store's rows must resolve back to (see the
//! cross-store referential-integrity invariant).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dotmd_core::ids::ChunkId;
use dotmd_core::models::{Chunk, File};
use dotmd_core::traits::MetadataStore;
use dotmd_core::{DotmdError, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;

/// `metadata.db`: `files(path PK, title, checksum, size, mtime, indexed_at)`
/// and `chunks(id PK, file_path, ordinal, heading_path, text, start, end,
/// tokens)`, exactly the schema in the on-disk layout.
///
/// Connection access is serialised through a single `tokio::sync::Mutex`
/// rather than a connection pool: writes to this store are serialised via
/// an internal queue, and a single embedded sqlite connection already
/// gives us that for free.
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS files (
            path TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            checksum TEXT NOT NULL,
            size INTEGER NOT NULL,
            mtime TEXT NOT NULL,
            frontmatter TEXT NOT NULL,
            indexed_at TEXT
        );
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            heading_path TEXT NOT NULL,
            text TEXT NOT NULL,
            start_offset INTEGER NOT NULL,
            end_offset INTEGER NOT NULL,
            tokens INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS chunks_file_path_idx ON chunks(file_path);",
    )
    .map_err(|e| DotmdError::index_write("metadata", e.to_string()))
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<File> {
    let frontmatter_json: String = row.get("frontmatter")?;
    let mtime: String = row.get("mtime")?;
    let indexed_at: Option<String> = row.get("indexed_at")?;
    Ok(File {
        path: row.get("path")?,
        title: row.get("title")?,
        checksum: row.get("checksum")?,
        size: row.get::<_, i64>("size")? as u64,
        mtime: parse_datetime(&mtime),
        frontmatter: serde_json::from_str(&frontmatter_json).unwrap_or_default(),
        indexed_at: indexed_at.map(|s| parse_datetime(&s)),
    })
}

fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
    let id: String = row.get("id")?;
    let heading_path_json: String = row.get("heading_path")?;
    Ok(Chunk {
        id: ChunkId::from_str(&id).unwrap_or_else(|_| ChunkId::new("", 0)),
        file_path: row.get("file_path")?,
        ordinal: row.get::<_, i64>("ordinal")? as usize,
        heading_path: serde_json::from_str(&heading_path_json).unwrap_or_default(),
        text: row.get("text")?,
        start_offset: row.get::<_, i64>("start_offset")? as usize,
        end_offset: row.get::<_, i64>("end_offset")? as usize,
        token_count: row.get::<_, i64>("tokens")? as usize,
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn upsert_file(&self, file: &File) -> Result<()> {
        let conn = self.conn.lock().await;
        let frontmatter_json = serde_json::to_string(&file.frontmatter)?;
        conn.execute(
            "INSERT INTO files (path, title, checksum, size, mtime, frontmatter, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(path) DO UPDATE SET
                title = excluded.title,
                checksum = excluded.checksum,
                size = excluded.size,
                mtime = excluded.mtime,
                frontmatter = excluded.frontmatter,
                indexed_at = excluded.indexed_at",
            params![
                file.path,
                file.title,
                file.checksum,
                file.size as i64,
                file.mtime.to_rfc3339(),
                frontmatter_json,
                file.indexed_at.map(|d| d.to_rfc3339()),
            ],
        )
        .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        Ok(())
    }

    async fn get_file(&self, path: &str) -> Result<Option<File>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT * FROM files WHERE path = ?1")
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let mut rows = stmt
            .query_map(params![path], row_to_file)
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| DotmdError::index_write("metadata", e.to_string()))?)),
            None => Ok(None),
        }
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM chunks WHERE file_path = ?1", params![path])
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        conn.execute("DELETE FROM files WHERE path = ?1", params![path])
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        Ok(())
    }

    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        for chunk in chunks {
            let heading_path_json = serde_json::to_string(&chunk.heading_path)?;
            tx.execute(
                "INSERT INTO chunks (id, file_path, ordinal, heading_path, text, start_offset, end_offset, tokens)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    ordinal = excluded.ordinal,
                    heading_path = excluded.heading_path,
                    text = excluded.text,
                    start_offset = excluded.start_offset,
                    end_offset = excluded.end_offset,
                    tokens = excluded.tokens",
                params![
                    chunk.id.to_string(),
                    chunk.file_path,
                    chunk.ordinal as i64,
                    heading_path_json,
                    chunk.text,
                    chunk.start_offset as i64,
                    chunk.end_offset as i64,
                    chunk.token_count as i64,
                ],
            )
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        }
        tx.commit()
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        Ok(())
    }

    async fn chunks_for_file(&self, path: &str) -> Result<Vec<Chunk>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT * FROM chunks WHERE file_path = ?1 ORDER BY ordinal")
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let rows = stmt
            .query_map(params![path], row_to_chunk)
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row.map_err(|e| DotmdError::index_write("metadata", e.to_string()))?);
        }
        Ok(chunks)
    }

    async fn get_chunk(&self, id: ChunkId) -> Result<Option<Chunk>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT * FROM chunks WHERE id = ?1")
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let mut rows = stmt
            .query_map(params![id.to_string()], row_to_chunk)
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| DotmdError::index_write("metadata", e.to_string()))?)),
            None => Ok(None),
        }
    }

    async fn get_chunks(&self, ids: &[ChunkId]) -> Result<Vec<Chunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().await;
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("SELECT * FROM chunks WHERE id IN ({placeholders})");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let params_ref: Vec<&dyn rusqlite::ToSql> =
            id_strings.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(params_ref.as_slice(), row_to_chunk)
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row.map_err(|e| DotmdError::index_write("metadata", e.to_string()))?);
        }
        Ok(chunks)
    }

    async fn delete_chunks_for_file(&self, path: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM chunks WHERE file_path = ?1", params![path])
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        Ok(())
    }

    async fn counts(&self) -> Result<(usize, usize)> {
        let conn = self.conn.lock().await;
        let files: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let chunks: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        Ok((files as usize, chunks as usize))
    }

    async fn list_titles(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT path, title FROM files")
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| DotmdError::index_write("metadata", e.to_string()))?);
        }
        Ok(out)
    }

    async fn list_heading_paths(&self) -> Result<Vec<Vec<String>>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT DISTINCT heading_path FROM chunks")
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
            let path: Vec<String> = serde_json::from_str(&json).unwrap_or_default();
            if !path.is_empty() {
                out.push(path);
            }
        }
        Ok(out)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM files;")
            .map_err(|e| DotmdError::index_write("metadata", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmd_core::ids::ChunkId;

    fn sample_file(path: &str) -> File {
        File {
            path: path.to_string(),
            title: "Doc".to_string(),
            checksum: "abc123".to_string(),
            size: 42,
            mtime: Utc::now(),
            frontmatter: HashMap::new(),
            indexed_at: None,
        }
    }

    fn sample_chunk(path: &str, ordinal: usize) -> Chunk {
        Chunk {
            id: ChunkId::new(path, ordinal),
            file_path: path.to_string(),
            ordinal,
            heading_path: vec!["Intro".to_string()],
            text: "hello world".to_string(),
            start_offset: 0,
            end_offset: 11,
            token_count: 2,
        }
    }

    #[tokio::test]
    async fn roundtrips_file_and_chunks() {
        let store = SqliteMetadataStore::open_in_memory().unwrap();
        store.upsert_file(&sample_file("foo.md")).await.unwrap();
        store
            .upsert_chunks(&[sample_chunk("foo.md", 0), sample_chunk("foo.md", 1)])
            .await
            .unwrap();

        let file = store.get_file("foo.md").await.unwrap().unwrap();
        assert_eq!(file.checksum, "abc123");

        let chunks = store.chunks_for_file("foo.md").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].ordinal, 0);
    }

    #[tokio::test]
    async fn delete_file_cascades_to_chunks() {
        let store = SqliteMetadataStore::open_in_memory().unwrap();
        store.upsert_file(&sample_file("foo.md")).await.unwrap();
        store.upsert_chunks(&[sample_chunk("foo.md", 0)]).await.unwrap();

        store.delete_file("foo.md").await.unwrap();

        assert!(store.get_file("foo.md").await.unwrap().is_none());
        assert!(store.chunks_for_file("foo.md").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reindex_with_unchanged_content_is_idempotent() {
        let store = SqliteMetadataStore::open_in_memory().unwrap();
        let chunk = sample_chunk("foo.md", 0);
        store.upsert_file(&sample_file("foo.md")).await.unwrap();
        store.upsert_chunks(&[chunk.clone()]).await.unwrap();
        store.upsert_chunks(&[chunk.clone()]).await.unwrap();

        let (files, chunks) = store.counts().await.unwrap();
        assert_eq!(files, 1);
        assert_eq!(chunks, 1);
    }
}
