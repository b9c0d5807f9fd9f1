// Document Store - collections of JSON documents
//
// Services never see SQL. They talk to a `DocumentStore` handle that is
// constructed once at startup and passed in explicitly (no global connection).
//
// Query model:
// - Filter: conjunction of field == value clauses
// - FindOptions: optional sort on one field + optional limit
// - Update: $inc on one field with an optional ceiling, applied store-side

pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Stable identity of a stored document (UUID v4 string)
pub type DocumentId = String;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store has been shut down")]
    Closed,

    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("`{field}` would exceed {max}")]
    LimitExceeded { field: String, max: i64 },

    #[error("store worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ============================================================================
// DOCUMENTS & QUERIES
// ============================================================================

/// A stored document: store-assigned identity plus the JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub body: Value,
}

/// Conjunction of equality clauses. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document in the collection
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches documents whose `field` equals `value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Sort and limit for find operations.
///
/// Ties (and unsorted queries) fall back to insertion order; a descending
/// sort breaks ties newest-inserted first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn sorted(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort: Some((field.into(), order)),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `$inc` on one numeric field, applied by the store (missing counts as 0).
///
/// With a ceiling, a document whose new value would exceed it is left
/// untouched and the update fails with `StoreError::LimitExceeded`.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub field: String,
    pub by: i64,
    pub max: Option<i64>,
}

impl Update {
    pub fn inc(field: impl Into<String>, by: i64) -> Self {
        Update {
            field: field.into(),
            by,
            max: None,
        }
    }

    pub fn at_most(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }
}

/// JSON path for a top-level document field, as understood by SQLite json1
pub(crate) fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Handle to a document store.
///
/// Implementations must make `find_one_and_update` a single indivisible
/// store-side step: no other writer can observe or modify the selected
/// document between selection and mutation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, body: Value) -> StoreResult<DocumentId>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Option<Document>> {
        let options = options.clone().with_limit(1);
        let docs = self.find(collection, filter, &options).await?;
        Ok(docs.into_iter().next())
    }

    /// Selects the first match under `options.sort`, applies `update`, and
    /// returns the document as it is after the update. `None` when nothing
    /// matched; `LimitExceeded` when the match is already at the ceiling.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        update: &Update,
    ) -> StoreResult<Option<Document>>;

    /// Overwrites the body of document `id`. Returns `false` when it no
    /// longer exists.
    async fn replace_one(&self, collection: &str, id: &str, body: Value) -> StoreResult<bool>;

    /// Releases the underlying connection. Later calls fail with `Closed`.
    async fn shutdown(&self) -> StoreResult<()>;
}
