//! BM25 keyword index via tantivy. Mirrors the weighting scheme of the
//! Postgres backend's tsvector columns: title counts most, summary next,
//! body least, so the two backends rank similarly for the same corpus.

use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

use crate::error::{StorageError, StorageResult};
use crate::model::MetadataFilter;

const TITLE_BOOST: f32 = 1.0;
const SUMMARY_BOOST: f32 = 0.4;
const BODY_BOOST: f32 = 0.2;
const WRITER_HEAP_BYTES: usize = 50_000_000;

struct Fields {
    chunk_id: Field,
    title: Field,
    summary: Field,
    body: Field,
    source_type: Field,
    language: Field,
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let chunk_id = builder.add_text_field("chunk_id", STRING | STORED);
    let title = builder.add_text_field("title", TEXT);
    let summary = builder.add_text_field("summary", TEXT);
    let body = builder.add_text_field("body", TEXT | STORED);
    let source_type = builder.add_text_field("source_type", STRING | STORED);
    let language = builder.add_text_field("language", STRING | STORED);
    let schema = builder.build();
    (
        schema,
        Fields {
            chunk_id,
            title,
            summary,
            body,
            source_type,
            language,
        },
    )
}

pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    fields: Fields,
}

impl KeywordIndex {
    pub fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;
        let (schema, fields) = build_schema();
        let directory = MmapDirectory::open(dir)
            .map_err(|e| StorageError::Other(format!("opening tantivy directory: {e}")))?;
        let index = Index::open_or_create(directory, schema)
            .map_err(|e| StorageError::Other(format!("opening tantivy index: {e}")))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// Insert or replace one document's keyword-searchable text. Callers
    /// should batch several of these before calling [`Self::commit`].
    pub fn upsert(
        &self,
        writer: &mut IndexWriter,
        chunk_id: &str,
        title: Option<&str>,
        summary: Option<&str>,
        body: &str,
        source_type: Option<&str>,
        language: Option<&str>,
    ) -> StorageResult<()> {
        let term = tantivy::Term::from_field_text(self.fields.chunk_id, chunk_id);
        writer.delete_term(term);

        let mut document = TantivyDocument::default();
        document.add_text(self.fields.chunk_id, chunk_id);
        if let Some(title) = title {
            document.add_text(self.fields.title, title);
        }
        if let Some(summary) = summary {
            document.add_text(self.fields.summary, summary);
        }
        document.add_text(self.fields.body, body);
        if let Some(source_type) = source_type {
            document.add_text(self.fields.source_type, source_type);
        }
        if let Some(language) = language {
            document.add_text(self.fields.language, language);
        }
        writer.add_document(document)?;
        Ok(())
    }

    pub fn delete(&self, writer: &mut IndexWriter, chunk_id: &str) {
        let term = tantivy::Term::from_field_text(self.fields.chunk_id, chunk_id);
        writer.delete_term(term);
    }

    pub fn writer(&self) -> StorageResult<IndexWriter> {
        Ok(self.index.writer(WRITER_HEAP_BYTES)?)
    }

    /// Persist pending writes and make them visible to new searches.
    pub fn commit(&self, mut writer: IndexWriter) -> StorageResult<()> {
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    pub fn clear(&self) -> StorageResult<()> {
        let mut writer = self.writer()?;
        writer.delete_all_documents()?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// BM25 search over title/summary/body with field boosts, returning
    /// `(chunk_id, raw_score)` pairs in descending score order. Results
    /// whose `source_type`/`language` don't satisfy `filter` are dropped
    /// before the top-k cutoff, so the index is over-queried internally.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StorageResult<Vec<(String, f32)>> {
        let searcher = self.reader.searcher();
        let mut parser =
            QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.summary, self.fields.body]);
        parser.set_field_boost(self.fields.title, TITLE_BOOST);
        parser.set_field_boost(self.fields.summary, SUMMARY_BOOST);
        parser.set_field_boost(self.fields.body, BODY_BOOST);

        let parsed = parser
            .parse_query(query)
            .map_err(|e| StorageError::QueryParse(e.to_string()))?;

        let overfetch = if filter.map_or(true, MetadataFilter::is_empty) {
            top_k
        } else {
            (top_k * 5).max(50)
        };
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(overfetch))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let retrieved: TantivyDocument = searcher.doc(address)?;
            let chunk_id = retrieved
                .get_first(self.fields.chunk_id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            if let Some(filter) = filter {
                if !filter.is_empty() {
                    let source_type = retrieved
                        .get_first(self.fields.source_type)
                        .and_then(|v| v.as_str());
                    let language = retrieved
                        .get_first(self.fields.language)
                        .and_then(|v| v.as_str());
                    if let Some(types) = &filter.source_types {
                        if !source_type.is_some_and(|t| types.iter().any(|want| want == t)) {
                            continue;
                        }
                    }
                    if let Some(languages) = &filter.languages {
                        if !language.is_some_and(|l| languages.iter().any(|want| want == l)) {
                            continue;
                        }
                    }
                }
            }

            results.push((chunk_id, score));
            if results.len() >= top_k {
                break;
            }
        }
        Ok(results)
    }
}
