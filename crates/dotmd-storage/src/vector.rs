//! The dense vector store: an embedded, brute-force ANN substitute. Stores
//! each chunk's embedding as a blob and answers `search` with an exact
//! cosine-similarity scan, which is the operation the core actually needs
//! of "an ANN vector store" — ordering and top-k semantics, not the
//! approximation itself.

use async_trait::async_trait;
use dotmd_core::ids::ChunkId;
use dotmd_core::traits::{EmbeddedChunk, VectorStore};
use dotmd_core::{DotmdError, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;

pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS vectors (
            chunk_id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dim INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS vectors_file_path_idx ON vectors(file_path);",
    )
    .map_err(|e| DotmdError::index_write("vector", e.to_string()))
}

fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, file_path: &str, embeddings: &[EmbeddedChunk]) -> Result<()> {
        if embeddings.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        for embedded in embeddings {
            tx.execute(
                "INSERT INTO vectors (chunk_id, file_path, embedding, dim)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(chunk_id) DO UPDATE SET
                    file_path = excluded.file_path,
                    embedding = excluded.embedding,
                    dim = excluded.dim",
                params![
                    embedded.chunk_id.to_string(),
                    file_path,
                    encode(&embedded.embedding),
                    embedded.embedding.len() as i64,
                ],
            )
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        }
        tx.commit()
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        Ok(())
    }

    async fn delete_by_file(&self, path: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM vectors WHERE file_path = ?1", params![path])
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(ChunkId, f32)>> {
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT chunk_id, embedding FROM vectors")
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((id, blob))
            })
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;

        let mut scored = Vec::new();
        for row in rows {
            let (id_str, blob) = row.map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
            let Ok(chunk_id) = ChunkId::from_str(&id_str) else {
                continue;
            };
            let embedding = decode(&blob);
            let score = cosine(query, &embedding);
            scored.push((chunk_id, score));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        let conn = self.conn.lock().await;
        let dim: Option<i64> = conn
            .query_row("SELECT dim FROM vectors LIMIT 1", [], |r| r.get(0))
            .ok();
        Ok(dim.map(|d| d as usize))
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM vectors", [])
            .map_err(|e| DotmdError::index_write("vector", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, ordinal: usize, vec: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk_id: ChunkId::new(path, ordinal),
            embedding: vec,
        }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store
            .upsert(
                "foo.md",
                &[
                    chunk("foo.md", 0, vec![1.0, 0.0]),
                    chunk("foo.md", 1, vec![0.0, 1.0]),
                    chunk("foo.md", 2, vec![0.9, 0.1]),
                ],
            )
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, ChunkId::new("foo.md", 0));
        assert_eq!(results[1].0, ChunkId::new("foo.md", 2));
    }

    #[tokio::test]
    async fn delete_by_file_removes_only_that_files_vectors() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        store
            .upsert("a.md", &[chunk("a.md", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("b.md", &[chunk("b.md", 0, vec![0.0, 1.0])])
            .await
            .unwrap();

        store.delete_by_file("a.md").await.unwrap();

        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, ChunkId::new("b.md", 0));
    }
}
