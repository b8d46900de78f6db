//! The relational store contract: `insert(table, row)` / `read(table,
//! where)` over the append-only persisted transcript.
//!
//! Tables: `chat`, `user_input`, `ai_response`, `ai_reasoning`, `tool_call`,
//! `tool_output`, all keyed by `chat_id` and carrying `created_at`. No
//! updates after insert.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{Error, Result};

/// `insert(table, row)`; `read(table, where) -> rows`. A row is a
/// flat key/value map; this crate does not model per-table schemas beyond
/// the row shapes in this module, since schema DDL is explicitly out of
/// scope.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn insert(&self, table: &str, row: HashMap<String, Value>) -> Result<()>;

    /// `where_clause` is an equality filter: every key must match the
    /// corresponding row field exactly. Sufficient for the core's own
    /// lookups (short-term memory replay keys on `chat_id`); anything
    /// richer belongs to the system-of-record, not this contract.
    async fn read(
        &self,
        table: &str,
        where_clause: &HashMap<String, Value>,
    ) -> Result<Vec<HashMap<String, Value>>>;
}

/// One row of the `chat` table.
#[derive(Debug, Clone)]
pub struct ChatRecord {
    pub chat_id: i64,
    pub user_name: String,
    pub chat_type: String,
    pub base_model: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `user_input`.
#[derive(Debug, Clone)]
pub struct UserInputRecord {
    pub chat_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `ai_response`.
#[derive(Debug, Clone)]
pub struct AiResponseRecord {
    pub chat_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `ai_reasoning`.
#[derive(Debug, Clone)]
pub struct AiReasoningRecord {
    pub chat_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `tool_call`.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub chat_id: i64,
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub created_at: DateTime<Utc>,
}

/// One row of `tool_output`.
#[derive(Debug, Clone)]
pub struct ToolOutputRecord {
    pub chat_id: i64,
    pub call_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Thin reference adapter backed by MySQL via `sqlx`.
///
/// Genuinely "contract only": this does not create tables, run migrations,
/// or manage a connection-pool lifecycle beyond what `sqlx::MySqlPool`
/// already provides. Callers own pool construction.
pub struct MySqlStore {
    pool: sqlx::MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: sqlx::MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationalStore for MySqlStore {
    async fn insert(&self, table: &str, row: HashMap<String, Value>) -> Result<()> {
        if row.is_empty() {
            return Err(Error::persistence_failed("insert with no columns"));
        }

        let mut columns: Vec<&String> = row.keys().collect();
        columns.sort();

        let column_list = columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("INSERT INTO `{table}` ({column_list}) VALUES ({placeholders})");

        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_json_value(query, &row[*column]);
        }

        query
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| Error::persistence_failed(e.to_string()))
    }

    async fn read(
        &self,
        table: &str,
        where_clause: &HashMap<String, Value>,
    ) -> Result<Vec<HashMap<String, Value>>> {
        let mut columns: Vec<&String> = where_clause.keys().collect();
        columns.sort();

        let sql = if columns.is_empty() {
            format!("SELECT * FROM `{table}`")
        } else {
            let predicate = columns
                .iter()
                .map(|c| format!("`{c}` = ?"))
                .collect::<Vec<_>>()
                .join(" AND ");
            format!("SELECT * FROM `{table}` WHERE {predicate}")
        };

        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_json_value(query, &where_clause[*column]);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::persistence_failed(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| mysql_row_to_map(row))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e: sqlx::Error| Error::persistence_failed(e.to_string()))?)
    }
}

fn bind_json_value<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) if n.is_i64() => query.bind(n.as_i64()),
        Value::Number(n) => query.bind(n.as_f64()),
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

fn mysql_row_to_map(row: &sqlx::mysql::MySqlRow) -> std::result::Result<HashMap<String, Value>, sqlx::Error> {
    use sqlx::{Column, Row, TypeInfo, ValueRef};

    let mut map = HashMap::new();
    for column in row.columns() {
        let raw = row.try_get_raw(column.ordinal())?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match column.type_info().name() {
                "BIGINT" | "INT" | "SMALLINT" | "TINYINT" => {
                    Value::from(row.try_get::<i64, _>(column.ordinal())?)
                }
                "DOUBLE" | "FLOAT" | "DECIMAL" => {
                    Value::from(row.try_get::<f64, _>(column.ordinal())?)
                }
                "BOOLEAN" | "BOOL" => Value::from(row.try_get::<bool, _>(column.ordinal())?),
                _ => Value::from(row.try_get::<String, _>(column.ordinal())?),
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

/// In-memory [`RelationalStore`] double used by this crate's own tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<HashMap<String, Vec<HashMap<String, Value>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationalStore for InMemoryStore {
    async fn insert(&self, table: &str, row: HashMap<String, Value>) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn read(
        &self,
        table: &str,
        where_clause: &HashMap<String, Value>,
    ) -> Result<Vec<HashMap<String, Value>>> {
        let tables = self.tables.lock().unwrap();
        let rows = tables.get(table).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| {
                where_clause
                    .iter()
                    .all(|(k, v)| row.get(k).map(|rv| rv == v).unwrap_or(false))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_store_roundtrips_by_equality_filter() {
        let store = InMemoryStore::new();

        let mut row = HashMap::new();
        row.insert("chat_id".to_string(), json!(42));
        row.insert("content".to_string(), json!("hello"));
        store.insert("user_input", row).await.unwrap();

        let mut other = HashMap::new();
        other.insert("chat_id".to_string(), json!(7));
        other.insert("content".to_string(), json!("unrelated"));
        store.insert("user_input", other).await.unwrap();

        let mut filter = HashMap::new();
        filter.insert("chat_id".to_string(), json!(42));
        let results = store.read("user_input", &filter).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["content"], json!("hello"));
    }

    #[tokio::test]
    async fn in_memory_store_read_on_empty_table_returns_empty() {
        let store = InMemoryStore::new();
        let results = store.read("chat", &HashMap::new()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn in_memory_store_append_only_keeps_all_inserts() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            let mut row = HashMap::new();
            row.insert("chat_id".to_string(), json!(1));
            row.insert("seq".to_string(), json!(i));
            store.insert("tool_call", row).await.unwrap();
        }

        let results = store.read("tool_call", &HashMap::new()).await.unwrap();
        assert_eq!(results.len(), 3);
    }
}
