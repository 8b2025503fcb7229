//! SQLite-backed document store.
//!
//! In-process vector store using SQLite for passages and metadata and
//! brute-force cosine distance for search.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::store::{DocumentStore, DuplicatePolicy};
use super::types::{Candidate, Passage, PassageMetadata};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::llm::Embedder;

const DELETE_BATCH: usize = 500;

const INSERT_PASSAGE: &str =
    "INSERT INTO passages (id, content, file_name, page_num, author, title, embedding)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const UPSERT_PASSAGE: &str =
    "INSERT INTO passages (id, content, file_name, page_num, author, title, embedding)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(id) DO UPDATE SET
        content = excluded.content,
        file_name = excluded.file_name,
        page_num = excluded.page_num,
        author = excluded.author,
        title = excluded.title,
        embedding = excluded.embedding";

/// A UNIQUE violation on `id` means the page is already indexed.
fn insert_error(err: sqlx::Error, id: &str) -> ApiError {
    let duplicate = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if duplicate {
        ApiError::Conflict(format!("Passage '{}' is already indexed", id))
    } else {
        ApiError::store(err)
    }
}

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    policy: DuplicatePolicy,
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    pub async fn new(
        paths: &AppPaths,
        embedder: Arc<dyn Embedder>,
        policy: DuplicatePolicy,
    ) -> Result<Self, ApiError> {
        Self::with_path(paths.db_path.clone(), embedder, policy).await
    }

    pub async fn with_path(
        db_path: PathBuf,
        embedder: Arc<dyn Embedder>,
        policy: DuplicatePolicy,
    ) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::store)?;

        let store = Self {
            pool,
            embedder,
            policy,
            db_path,
        };
        store.init_schema().await?;
        tracing::info!(
            "Document store ready at {} (duplicate policy: {:?})",
            store.db_path.display(),
            store.policy
        );
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS passages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                file_name TEXT NOT NULL,
                page_num INTEGER NOT NULL,
                author TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::store)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_passages_file_page ON passages(file_name, page_num)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::store)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_passage(row: &sqlx::sqlite::SqliteRow) -> Passage {
        let page_num: i64 = row.get("page_num");
        Passage {
            id: row.get("id"),
            text: row.get("content"),
            metadata: PassageMetadata {
                file_name: row.get("file_name"),
                page_num: u32::try_from(page_num).unwrap_or(0),
                author: row.get("author"),
                title: row.get("title"),
            },
        }
    }

    fn validate_batch(&self, passages: &[Passage]) -> Result<(), ApiError> {
        let mut seen = HashSet::with_capacity(passages.len());
        for passage in passages {
            if passage.metadata.page_num == 0 {
                return Err(ApiError::BadRequest(format!(
                    "Passage '{}' has page number 0; pages are 1-based",
                    passage.id
                )));
            }
            if passage.metadata.file_name.trim().is_empty() {
                return Err(ApiError::BadRequest(
                    "Passage is missing a file name".to_string(),
                ));
            }
            if !seen.insert(passage.id.as_str()) && self.policy == DuplicatePolicy::Reject {
                return Err(ApiError::Conflict(format!(
                    "Passage '{}' appears twice in the batch",
                    passage.id
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add(&self, passages: Vec<Passage>) -> Result<usize, ApiError> {
        if passages.is_empty() {
            return Ok(0);
        }
        self.validate_batch(&passages)?;

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != passages.len() {
            return Err(ApiError::Internal(format!(
                "Embedding count mismatch: {} != {}",
                embeddings.len(),
                passages.len()
            )));
        }

        let statement = match self.policy {
            DuplicatePolicy::Overwrite => UPSERT_PASSAGE,
            DuplicatePolicy::Reject => INSERT_PASSAGE,
        };

        let mut tx = self.pool.begin().await.map_err(ApiError::store)?;
        for (passage, embedding) in passages.iter().zip(embeddings.iter()) {
            sqlx::query(statement)
                .bind(&passage.id)
                .bind(&passage.text)
                .bind(&passage.metadata.file_name)
                .bind(i64::from(passage.metadata.page_num))
                .bind(&passage.metadata.author)
                .bind(&passage.metadata.title)
                .bind(Self::serialize_embedding(embedding))
                .execute(&mut *tx)
                .await
                .map_err(|err| insert_error(err, &passage.id))?;
        }
        tx.commit().await.map_err(ApiError::store)?;

        // an id repeated within an overwrite batch is stored once
        let distinct: HashSet<&str> = passages.iter().map(|p| p.id.as_str()).collect();
        Ok(distinct.len())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<Candidate>, ApiError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, content, file_name, page_num, author, title, embedding
             FROM passages
             ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::store)?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::model("embedding model returned no vector for query"))?;

        let mut scored: Vec<Candidate> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let distance = 1.0 - Self::cosine_similarity(&query_embedding, &stored);
                Candidate::new(Self::row_to_passage(row), distance)
            })
            .collect();

        // stable: equal distances keep insertion order
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn get_all(&self) -> Result<Vec<Passage>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, content, file_name, page_num, author, title
             FROM passages
             ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::store)?;

        Ok(rows.iter().map(Self::row_to_passage).collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, ApiError> {
        let mut deleted = 0usize;
        for batch in ids.chunks(DELETE_BATCH) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM passages WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in batch {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");

            let result = builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(ApiError::store)?;
            deleted += result.rows_affected() as usize;
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::store)?;

        Ok(count as usize)
    }
}
