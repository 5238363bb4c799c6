//! Remote table access.
//!
//! [`DataService`] is the seam between the store and the hosted database:
//! the store only ever speaks in tables, equality filters and JSON rows.

mod rest;

pub use rest::RestClient;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The two tables the app mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Pantry,
    Recipes,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::Pantry, Table::Recipes];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Pantry => "pantry",
            Table::Recipes => "recipes",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A conjunction of `column = value` conditions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    conditions: Vec<(String, String)>,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::default().and_eq(column, value)
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.conditions.push((column.into(), value.to_string()));
        self
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Query-string pairs in the REST filter syntax: `("user_id", "eq.abc")`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.conditions
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
            .collect()
    }

    /// The change-channel filter expression: `user_id=eq.abc`.
    ///
    /// The channel only accepts a single condition; extra ones are dropped.
    pub fn to_realtime(&self) -> Option<String> {
        self.conditions
            .first()
            .map(|(column, value)| format!("{}=eq.{}", column, value))
    }

    /// Whether `row` satisfies every condition, comparing values as text.
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            match row.get(column) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *expected,
            }
        })
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{table} request returned {status}: {message}")]
    Status {
        table: Table,
        status: u16,
        message: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Row-level access to the hosted tables.
///
/// Every call is authorized as the signed-in user; row-level security on the
/// service side decides what is visible.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Rows of `table` matching `filter`, in service order.
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, DataError>;

    /// Inserts `record` and returns the stored rows (possibly none).
    async fn insert(&self, table: Table, record: Value) -> Result<Vec<Value>, DataError>;

    /// Applies `changes` to every row matching `filter`.
    async fn update(&self, table: Table, filter: &Filter, changes: Value)
        -> Result<(), DataError>;

    /// Deletes every row matching `filter`.
    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), DataError>;
}

#[async_trait]
impl<D: DataService + ?Sized> DataService for Arc<D> {
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, DataError> {
        (**self).select(table, filter).await
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Vec<Value>, DataError> {
        (**self).insert(table, record).await
    }

    async fn update(
        &self,
        table: Table,
        filter: &Filter,
        changes: Value,
    ) -> Result<(), DataError> {
        (**self).update(table, filter, changes).await
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), DataError> {
        (**self).delete(table, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_names() {
        assert_eq!(Table::Pantry.to_string(), "pantry");
        assert_eq!(Table::Recipes.name(), "recipes");
        assert_eq!(serde_json::to_value(Table::Pantry).unwrap(), json!("pantry"));
    }

    #[test]
    fn test_filter_syntax() {
        let filter = Filter::eq("user_id", "abc").and_eq("id", 4);
        assert_eq!(
            filter.to_query_pairs(),
            vec![
                ("user_id".to_string(), "eq.abc".to_string()),
                ("id".to_string(), "eq.4".to_string()),
            ]
        );
        assert_eq!(filter.to_realtime().as_deref(), Some("user_id=eq.abc"));
        assert_eq!(Filter::default().to_realtime(), None);
    }

    #[test]
    fn test_filter_matches_rows() {
        let row = json!({"id": 4, "user_id": "abc", "name": "Milk"});
        assert!(Filter::eq("user_id", "abc").matches(&row));
        assert!(Filter::eq("id", 4).and_eq("user_id", "abc").matches(&row));
        assert!(!Filter::eq("id", 5).matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));
        assert!(Filter::default().matches(&row));
    }
}
