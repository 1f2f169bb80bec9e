//! Vector index: SQLite persistence with brute-force cosine search.
//!
//! Vectors are L2-normalized before storage and before query, so similarity
//! search reduces to an inner product. The full entry set is kept in memory
//! behind an `RwLock`; SQLite is the durable copy loaded at open. Searches
//! take the read lock, document replacement takes the write lock for the
//! duration of its delete + add pair, so a search never observes a
//! half-replaced document.

use std::path::Path;
use std::sync::{Mutex, RwLock};

use labbot_core::error::{LabBotError, Result};
use labbot_core::types::{Chunk, ChunkMetadata, SearchResult};
use rusqlite::Connection;

/// Chunks are embedded and written in batches to bound peak memory.
pub const DEFAULT_BATCH_SIZE: usize = 50;

struct IndexEntry {
    id: String,
    text: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

pub struct VectorIndex {
    conn: Mutex<Connection>,
    entries: RwLock<Vec<IndexEntry>>,
}

impl VectorIndex {
    /// Open (or create) the index at the given path and load all entries.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| LabBotError::Index(format!("Failed to open index db: {e}")))?;
        Self::from_connection(conn)
    }

    /// In-memory index, used in tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LabBotError::Index(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                post_number INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL DEFAULT '',
                created_by TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                embedding BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_post ON chunks(post_number);",
        )
        .map_err(|e| LabBotError::Index(format!("Failed to create schema: {e}")))?;

        let entries = Self::load_entries(&conn)?;
        tracing::info!("Vector index opened with {} chunks", entries.len());

        Ok(Self {
            conn: Mutex::new(conn),
            entries: RwLock::new(entries),
        })
    }

    fn load_entries(conn: &Connection) -> Result<Vec<IndexEntry>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, post_number, chunk_index, text, title, url,
                        updated_at, created_by, category, embedding
                 FROM chunks ORDER BY post_number, chunk_index",
            )
            .map_err(|e| LabBotError::Index(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let blob: Vec<u8> = row.get(9)?;
                Ok(IndexEntry {
                    id: row.get(0)?,
                    metadata: ChunkMetadata {
                        post_number: row.get::<_, i64>(1)? as u64,
                        chunk_index: row.get::<_, i64>(2)? as usize,
                        title: row.get(4)?,
                        url: row.get(5)?,
                        updated_at: row.get(6)?,
                        created_by: row.get(7)?,
                        category: row.get(8)?,
                    },
                    text: row.get(3)?,
                    embedding: decode_embedding(&blob),
                })
            })
            .map_err(|e| LabBotError::Index(e.to_string()))?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append chunks with their embeddings, batched to bound peak memory.
    ///
    /// Vectors are normalized before storage regardless of what the
    /// embedder produced.
    pub fn add_chunks(&self, chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(LabBotError::Index(format!(
                "chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| LabBotError::Index("index lock poisoned".into()))?;
        self.insert_locked(&mut entries, chunks, embeddings)?;
        Ok(())
    }

    /// Remove every chunk belonging to a document. Deleting a document that
    /// was never indexed is a no-op.
    pub fn delete_document(&self, post_number: u64) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| LabBotError::Index("index lock poisoned".into()))?;
        self.delete_locked(&mut entries, post_number)
    }

    /// Replace a document's chunks wholesale: delete then add under one
    /// write lock, so concurrent searches see either the old set or the new
    /// set, never a mix.
    pub fn replace_document(
        &self,
        post_number: u64,
        chunks: &[Chunk],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(LabBotError::Index(format!(
                "chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| LabBotError::Index("index lock poisoned".into()))?;
        self.delete_locked(&mut entries, post_number)?;
        self.insert_locked(&mut entries, chunks, embeddings)?;
        Ok(())
    }

    fn delete_locked(&self, entries: &mut Vec<IndexEntry>, post_number: u64) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| LabBotError::Index("db lock poisoned".into()))?;
        let removed = conn
            .execute(
                "DELETE FROM chunks WHERE post_number = ?1",
                rusqlite::params![post_number as i64],
            )
            .map_err(|e| LabBotError::Index(format!("delete failed: {e}")))?;
        entries.retain(|e| e.metadata.post_number != post_number);
        if removed > 0 {
            tracing::info!("Deleted {} chunks for post #{}", removed, post_number);
        }
        Ok(())
    }

    fn insert_locked(
        &self,
        entries: &mut Vec<IndexEntry>,
        chunks: &[Chunk],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| LabBotError::Index("db lock poisoned".into()))?;

        let total = chunks.len();
        let mut written = 0usize;
        for (chunk_batch, emb_batch) in chunks
            .chunks(DEFAULT_BATCH_SIZE)
            .zip(embeddings.chunks(DEFAULT_BATCH_SIZE))
        {
            for (chunk, embedding) in chunk_batch.iter().zip(emb_batch.iter()) {
                let mut vector = embedding.clone();
                l2_normalize(&mut vector);

                conn.execute(
                    "INSERT OR REPLACE INTO chunks
                     (id, post_number, chunk_index, text, title, url,
                      updated_at, created_by, category, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    rusqlite::params![
                        chunk.id,
                        chunk.metadata.post_number as i64,
                        chunk.metadata.chunk_index as i64,
                        chunk.text,
                        chunk.metadata.title,
                        chunk.metadata.url,
                        chunk.metadata.updated_at,
                        chunk.metadata.created_by,
                        chunk.metadata.category,
                        encode_embedding(&vector),
                    ],
                )
                .map_err(|e| LabBotError::Index(format!("insert failed: {e}")))?;

                entries.retain(|e| e.id != chunk.id);
                entries.push(IndexEntry {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                    embedding: vector,
                });
            }
            written += chunk_batch.len();
            tracing::debug!("Indexed chunks: {}/{}", written, total);
        }
        Ok(())
    }

    /// Top-k chunks by descending cosine similarity.
    ///
    /// An empty or unbuilt index returns an empty vec — never an error.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<SearchResult> {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };
        if entries.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut normalized_query = query.to_vec();
        l2_normalize(&mut normalized_query);

        let mut scored: Vec<(f32, &IndexEntry)> = entries
            .iter()
            .map(|e| (dot(&normalized_query, &e.embedding), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(top_k)
            .map(|(similarity, entry)| SearchResult {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                distance: 1.0 - similarity,
                similarity: Some(similarity),
            })
            .collect()
    }
}

/// Normalize to unit length. The zero vector stays untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn encode_embedding(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for x in v {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
