// SQLite Document Store
//
// All collections share one `documents` table. Bodies are JSON text and are
// queried through the json1 functions (json_extract / json_set). Field paths
// and values are always bound as parameters, never spliced into SQL.
//
// rusqlite is synchronous: every operation runs on the blocking pool behind
// the connection mutex, bounded by the configured timeout.

use super::{
    json_path, Document, DocumentId, DocumentStore, Filter, FindOptions, StoreError,
    StoreResult, Update,
};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default upper bound for a single store operation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed document store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    timeout: Duration,
}

impl SqliteStore {
    /// Opens (or creates) a database file, enables WAL and creates the
    /// documents table.
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> StoreResult<Self> {
        let started_at = Instant::now();
        let path = path.as_ref();

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        setup_database(&conn)?;

        info!(
            path = %path.display(),
            journal_mode = %mode,
            duration_ms = started_at.elapsed().as_millis() as u64,
            "document store opened"
        );
        Ok(Self::from_connection(conn, timeout))
    }

    /// Opens a private in-memory database (tests, `:memory:` config)
    pub fn open_in_memory(timeout: Duration) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;

        info!(mode = "memory", "document store opened");
        Ok(Self::from_connection(conn, timeout))
    }

    fn from_connection(conn: Connection, timeout: Duration) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Holds the connection lock, stalling every operation until dropped
    #[cfg(test)]
    pub(crate) fn hold_connection(&self) -> std::sync::MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap()
    }

    /// Runs `f` against the connection on the blocking pool.
    ///
    /// On timeout the caller stops waiting but the blocking task cannot be
    /// interrupted. A task still queued on the connection lock sees the
    /// abandoned flag and skips `f`; one that already started runs to
    /// completion, so a timed-out write may still land.
    async fn run<T, F>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let abandoned = Arc::new(AtomicBool::new(false));
        let task = tokio::task::spawn_blocking({
            let abandoned = Arc::clone(&abandoned);
            let timeout = self.timeout;
            move || {
                let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
                if abandoned.load(Ordering::SeqCst) {
                    debug!(op, "skipping abandoned store operation");
                    return Err(StoreError::Timeout(timeout));
                }
                let conn = guard.as_mut().ok_or(StoreError::Closed)?;
                f(conn)
            }
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                abandoned.store(true, Ordering::SeqCst);
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "store operation timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;

    // ==========================================================================
    // Documents Table (one row per document, body is JSON)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            collection TEXT NOT NULL,
            body TEXT NOT NULL CHECK (json_valid(body))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, seq)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SQL BUILDING
// ============================================================================

/// Appends the WHERE clause for `collection` + `filter`, pushing its params
fn push_where(sql: &mut String, bind: &mut Vec<SqlValue>, collection: &str, filter: &Filter) {
    sql.push_str(" WHERE collection = ?");
    bind.push(SqlValue::Text(collection.to_string()));

    for (field, value) in filter.clauses() {
        match value {
            Value::Null => {
                sql.push_str(" AND json_extract(body, ?) IS NULL");
                bind.push(SqlValue::Text(json_path(field)));
            }
            Value::Array(_) | Value::Object(_) => {
                sql.push_str(" AND json_extract(body, ?) = json(?)");
                bind.push(SqlValue::Text(json_path(field)));
                bind.push(SqlValue::Text(value.to_string()));
            }
            scalar => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                bind.push(SqlValue::Text(json_path(field)));
                bind.push(scalar_to_sql(scalar));
            }
        }
    }
}

/// Appends ORDER BY; insertion order is always the final tie-breaker
fn push_order(sql: &mut String, bind: &mut Vec<SqlValue>, options: &FindOptions) {
    match &options.sort {
        Some((field, order)) => {
            sql.push_str(&format!(
                " ORDER BY json_extract(body, ?) {dir}, seq {dir}",
                dir = order.as_sql()
            ));
            bind.push(SqlValue::Text(json_path(field)));
        }
        None => sql.push_str(" ORDER BY seq ASC"),
    }
}

fn scalar_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Null => SqlValue::Null,
        other => SqlValue::Text(other.to_string()),
    }
}

/// SET expression for an update, pushing its params
fn update_expr(update: &Update, bind: &mut Vec<SqlValue>) -> String {
    let path = json_path(&update.field);
    bind.push(SqlValue::Text(path.clone()));
    bind.push(SqlValue::Text(path));
    bind.push(SqlValue::Integer(update.by));
    "json_set(body, ?, COALESCE(json_extract(body, ?), 0) + ?)".to_string()
}

/// Ceiling guard for an update, pushing its params
fn push_ceiling(sql: &mut String, bind: &mut Vec<SqlValue>, update: &Update, max: i64) {
    sql.push_str(" AND COALESCE(json_extract(body, ?), 0) + ? <= ?");
    bind.push(SqlValue::Text(json_path(&update.field)));
    bind.push(SqlValue::Integer(update.by));
    bind.push(SqlValue::Integer(max));
}

fn parse_rows(rows: Vec<(String, String)>) -> StoreResult<Vec<Document>> {
    rows.into_iter()
        .map(|(id, body)| {
            Ok(Document {
                id,
                body: serde_json::from_str(&body)?,
            })
        })
        .collect()
}

// ============================================================================
// STORE IMPLEMENTATION
// ============================================================================

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_one(&self, collection: &str, body: Value) -> StoreResult<DocumentId> {
        let collection = collection.to_string();
        let body_json = serde_json::to_string(&body)?;

        self.run("insert_one", move |conn| {
            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO documents (id, collection, body) VALUES (?1, ?2, ?3)",
                params![id, collection, body_json],
            )?;
            debug!(collection = %collection, id = %id, "document inserted");
            Ok(id)
        })
        .await
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut sql = String::from("SELECT id, body FROM documents");
        let mut bind = Vec::new();
        push_where(&mut sql, &mut bind, collection, filter);
        push_order(&mut sql, &mut bind, options);
        sql.push_str(" LIMIT ?");
        bind.push(SqlValue::Integer(
            options.limit.map_or(-1, |limit| limit as i64),
        ));

        let rows = self
            .run("find", move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(bind), |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<(String, String)>, _>>()?;
                Ok(rows)
            })
            .await?;

        parse_rows(rows)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        update: &Update,
    ) -> StoreResult<Option<Document>> {
        // Selection and mutation are one statement, so no writer can slip
        // between them.
        let mut bind = Vec::new();
        let set_expr = update_expr(update, &mut bind);
        let mut sql = format!(
            "UPDATE documents SET body = {set_expr} WHERE seq = (SELECT seq FROM documents"
        );
        push_where(&mut sql, &mut bind, collection, filter);
        push_order(&mut sql, &mut bind, options);
        sql.push_str(" LIMIT 1)");
        if let Some(max) = update.max {
            push_ceiling(&mut sql, &mut bind, update, max);
        }
        sql.push_str(" RETURNING id, body");

        // Tells "nothing matched" apart from "match held back by the ceiling"
        let mut exists_sql = String::from("SELECT 1 FROM documents");
        let mut exists_bind = Vec::new();
        push_where(&mut exists_sql, &mut exists_bind, collection, filter);
        exists_sql.push_str(" LIMIT 1");

        let collection_name = collection.to_string();
        let field = update.field.clone();
        let max = update.max;
        let row = self
            .run("find_one_and_update", move |conn| {
                let row = conn
                    .prepare(&sql)?
                    .query_row(params_from_iter(bind), |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })
                    .optional()?;
                if let (None, Some(max)) = (&row, max) {
                    let held_back = conn
                        .prepare(&exists_sql)?
                        .exists(params_from_iter(exists_bind))?;
                    if held_back {
                        return Err(StoreError::LimitExceeded { field, max });
                    }
                }
                debug!(
                    collection = %collection_name,
                    field = %field,
                    matched = row.is_some(),
                    "find_one_and_update applied"
                );
                Ok(row)
            })
            .await?;

        Ok(parse_rows(row.into_iter().collect())?.into_iter().next())
    }

    async fn replace_one(&self, collection: &str, id: &str, body: Value) -> StoreResult<bool> {
        let collection = collection.to_string();
        let id = id.to_string();
        let body_json = serde_json::to_string(&body)?;

        self.run("replace_one", move |conn| {
            let changed = conn.execute(
                "UPDATE documents SET body = json(?1) WHERE collection = ?2 AND id = ?3",
                params![body_json, collection, id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.run("shutdown", |conn| {
            conn.execute_batch("PRAGMA optimize;")?;
            Ok(())
        })
        .await?;

        let conn = Arc::clone(&self.conn);
        let taken = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            Ok::<_, StoreError>(guard.take())
        })
        .await??;

        if let Some(conn) = taken {
            conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
            info!("document store closed");
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
