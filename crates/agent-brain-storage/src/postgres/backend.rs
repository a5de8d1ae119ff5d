//! Relational storage backend (Backend B): pgvector for kNN, weighted
//! tsvector for BM25-style keyword ranking. Grounded on `vector_ops.py`
//! and `keyword_ops.py`: same operators, same score formulas, same
//! weighted-tsvector scheme (title=A, summary=B, body=C).

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{StorageError, StorageResult};
use crate::model::{DistanceMetric, DocumentMetadata, MetadataFilter, SearchResult};
use crate::traits::{EmbeddingMetadata, StorageBackend, UpsertBatch};

pub struct PostgresStorageBackend {
    pool: PgPool,
    language: String,
    distance_metric: DistanceMetric,
}

impl PostgresStorageBackend {
    #[must_use]
    pub fn new(pool: PgPool, language: String, distance_metric: DistanceMetric) -> Self {
        Self {
            pool,
            language,
            distance_metric,
        }
    }

    fn embedding_literal(embedding: &[f32]) -> String {
        let mut buf = String::with_capacity(embedding.len() * 8 + 2);
        buf.push('[');
        for (i, v) in embedding.iter().enumerate() {
            if i > 0 {
                buf.push(',');
            }
            buf.push_str(&v.to_string());
        }
        buf.push(']');
        buf
    }

    /// Builds `AND metadata->>'col' = ANY($n)` clauses for each populated
    /// filter field, starting parameter numbering at `start_param`.
    /// Returns the joined clause text and the bind values in order.
    fn build_filter_sql(
        filter: Option<&MetadataFilter>,
        start_param: usize,
    ) -> (String, Vec<Vec<String>>) {
        let Some(filter) = filter else {
            return (String::new(), Vec::new());
        };
        let mut clauses = Vec::new();
        let mut extra_params = Vec::new();
        let mut param_idx = start_param;

        if let Some(types) = &filter.source_types {
            clauses.push(format!("AND metadata->>'source_type' = ANY(${param_idx})"));
            extra_params.push(types.clone());
            param_idx += 1;
        }
        if let Some(languages) = &filter.languages {
            clauses.push(format!("AND metadata->>'language' = ANY(${param_idx})"));
            extra_params.push(languages.clone());
        }
        (clauses.join("\n"), extra_params)
    }
}

#[async_trait]
impl StorageBackend for PostgresStorageBackend {
    async fn initialize(&self) -> StorageResult<()> {
        // Migrations already ran at connect() time; nothing further to do.
        Ok(())
    }

    async fn upsert_documents(&self, batch: UpsertBatch<'_>) -> StorageResult<usize> {
        if !batch.has_equal_lengths() {
            return Err(StorageError::UnequalBatchLengths(
                "ids/embeddings/documents/metadatas",
            ));
        }
        if batch.ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for (((id, embedding), text), metadata) in batch
            .ids
            .iter()
            .zip(batch.embeddings.iter())
            .zip(batch.documents.iter())
            .zip(batch.metadatas.iter())
        {
            let title = metadata.title.clone().unwrap_or_default();
            let summary = metadata.summary.clone().unwrap_or_default();
            let embedding_literal = Self::embedding_literal(embedding);
            let metadata_json = serde_json::to_value(metadata)?;

            sqlx::query(
                r"
                INSERT INTO documents (chunk_id, document_text, metadata, embedding, tsv)
                VALUES (
                    $1, $2, $3, $4::vector,
                    setweight(to_tsvector($5::regconfig, COALESCE($6, '')), 'A') ||
                    setweight(to_tsvector($5::regconfig, COALESCE($7, '')), 'B') ||
                    setweight(to_tsvector($5::regconfig, $2), 'C')
                )
                ON CONFLICT (chunk_id) DO UPDATE SET
                    document_text = EXCLUDED.document_text,
                    metadata = EXCLUDED.metadata,
                    embedding = EXCLUDED.embedding,
                    tsv = EXCLUDED.tsv,
                    updated_at = NOW()
                ",
            )
            .bind(id)
            .bind(text)
            .bind(metadata_json)
            .bind(embedding_literal)
            .bind(&self.language)
            .bind(title)
            .bind(summary)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(batch.ids.len())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>> {
        let operator = self.distance_metric.pg_operator();
        let (filter_sql, extra_params) = Self::build_filter_sql(filter, 3);

        let sql = format!(
            r"
            SELECT chunk_id, document_text, metadata,
                   embedding {operator} $1::vector AS distance
            FROM documents
            WHERE embedding IS NOT NULL
            {filter_sql}
            ORDER BY embedding {operator} $1::vector
            LIMIT $2
            "
        );

        let embedding_literal = Self::embedding_literal(query_embedding);
        let mut query = sqlx::query(&sql)
            .bind(embedding_literal)
            .bind(i64::try_from(top_k).unwrap_or(i64::MAX));
        for param in extra_params {
            query = query.bind(param);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let distance: f32 = row.try_get("distance")?;
            let score = self.distance_metric.normalize(distance);
            if score < min_score {
                continue;
            }
            let chunk_id: String = row.try_get("chunk_id")?;
            let text: String = row.try_get("document_text")?;
            let metadata_json: serde_json::Value = row.try_get("metadata")?;
            let metadata: DocumentMetadata = serde_json::from_value(metadata_json)?;
            results.push(SearchResult {
                chunk_id,
                text,
                metadata,
                score,
                vector_score: Some(score),
                bm25_score: None,
                rerank_score: None,
            });
        }
        Ok(results)
    }

    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<SearchResult>> {
        let (filter_sql, extra_params) = Self::build_filter_sql(filter, 4);

        let sql = format!(
            r"
            SELECT chunk_id, document_text, metadata,
                   ts_rank(tsv, websearch_to_tsquery($1::regconfig, $2)) AS score
            FROM documents
            WHERE tsv @@ websearch_to_tsquery($1::regconfig, $2)
            {filter_sql}
            ORDER BY score DESC
            LIMIT $3
            "
        );

        let mut db_query = sqlx::query(&sql)
            .bind(&self.language)
            .bind(query)
            .bind(i64::try_from(top_k).unwrap_or(i64::MAX));
        for param in extra_params {
            db_query = db_query.bind(param);
        }
        let rows = db_query.fetch_all(&self.pool).await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let raw_scores: Vec<f32> = rows
            .iter()
            .map(|row| row.try_get::<f32, _>("score").unwrap_or(0.0))
            .collect();
        let normalized = crate::model::normalize_keyword_scores(&raw_scores);

        let mut results = Vec::with_capacity(rows.len());
        for (row, score) in rows.into_iter().zip(normalized) {
            let chunk_id: String = row.try_get("chunk_id")?;
            let text: String = row.try_get("document_text")?;
            let metadata_json: serde_json::Value = row.try_get("metadata")?;
            let metadata: DocumentMetadata = serde_json::from_value(metadata_json)?;
            results.push(SearchResult {
                chunk_id,
                text,
                metadata,
                score,
                vector_score: None,
                bm25_score: Some(score),
                rerank_score: None,
            });
        }
        Ok(results)
    }

    async fn get_count(&self, filter: Option<&MetadataFilter>) -> StorageResult<u64> {
        let (filter_sql, extra_params) = Self::build_filter_sql(filter, 1);
        let filter_sql = filter_sql.replacen("AND", "WHERE", 1);
        let sql = format!("SELECT COUNT(*) AS count FROM documents {filter_sql}");
        let mut query = sqlx::query(&sql);
        for param in extra_params {
            query = query.bind(param);
        }
        let row = query.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn get_by_id(&self, chunk_id: &str) -> StorageResult<Option<SearchResult>> {
        let row = sqlx::query("SELECT chunk_id, document_text, metadata FROM documents WHERE chunk_id = $1")
            .bind(chunk_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let text: String = row.try_get("document_text")?;
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: DocumentMetadata = serde_json::from_value(metadata_json)?;
        Ok(Some(SearchResult {
            chunk_id: chunk_id.to_string(),
            text,
            metadata,
            score: 1.0,
            vector_score: None,
            bm25_score: None,
            rerank_score: None,
        }))
    }

    async fn reset(&self) -> StorageResult<()> {
        sqlx::query("TRUNCATE TABLE documents").execute(&self.pool).await?;
        sqlx::query("DELETE FROM collection_meta")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_embedding_metadata(&self) -> StorageResult<Option<EmbeddingMetadata>> {
        let row = sqlx::query("SELECT provider, model, dimensions FROM collection_meta LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let dimensions: i32 = row.try_get("dimensions")?;
        Ok(Some(EmbeddingMetadata {
            provider: row.try_get("provider")?,
            model: row.try_get("model")?,
            dimensions: dimensions.max(0) as usize,
        }))
    }

    async fn set_embedding_metadata(&self, metadata: EmbeddingMetadata) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO collection_meta (id, provider, model, dimensions)
            VALUES (TRUE, $1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                provider = EXCLUDED.provider,
                model = EXCLUDED.model,
                dimensions = EXCLUDED.dimensions
            ",
        )
        .bind(metadata.provider)
        .bind(metadata.model)
        .bind(i32::try_from(metadata.dimensions).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn pool_diagnostics(&self) -> Option<crate::traits::PoolDiagnostics> {
        Some(crate::traits::PoolDiagnostics {
            size: self.pool.size(),
            idle: u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX),
        })
    }
}
