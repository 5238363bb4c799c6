//! Typed change events.
//!
//! Change notifications arrive as loosely shaped JSON; they are validated into
//! a tagged [`ChangeEvent`] before they are allowed near local state.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::record_list::Record;
use crate::data::Table;
use crate::models::{PantryItem, Recipe};

/// One row-level change: `{eventType, new, old}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub event_type: String,
    pub new: Option<Value>,
    pub old: Option<Value>,
}

impl RawChange {
    pub fn new(event_type: impl Into<String>, new: Option<Value>, old: Option<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            new,
            old,
        }
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Unknown change type: {0}")]
    UnknownType(String),

    #[error("{0} change is missing its record")]
    MissingRecord(&'static str),

    #[error("DELETE change is missing the record id")]
    MissingId,

    #[error("Invalid record in change: {0}")]
    InvalidRecord(#[from] serde_json::Error),
}

/// A validated change for records of type `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T: Record> {
    Insert(T),
    Update(T),
    Delete(T::Id),
}

impl<T> ChangeEvent<T>
where
    T: Record + DeserializeOwned,
    T::Id: DeserializeOwned,
{
    pub fn from_raw(raw: &RawChange) -> Result<Self, EventError> {
        match raw.event_type.as_str() {
            "INSERT" => Ok(ChangeEvent::Insert(Self::record(raw, "INSERT")?)),
            "UPDATE" => Ok(ChangeEvent::Update(Self::record(raw, "UPDATE")?)),
            "DELETE" => {
                // old rows only carry the primary key unless the table
                // uses full replica identity
                let id = raw
                    .old
                    .as_ref()
                    .and_then(|old| old.get("id"))
                    .filter(|id| !id.is_null())
                    .ok_or(EventError::MissingId)?;
                Ok(ChangeEvent::Delete(serde_json::from_value(id.clone())?))
            }
            other => Err(EventError::UnknownType(other.to_string())),
        }
    }

    fn record(raw: &RawChange, kind: &'static str) -> Result<T, EventError> {
        let value = raw
            .new
            .as_ref()
            .filter(|v| v.is_object())
            .ok_or(EventError::MissingRecord(kind))?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl<T: Record> ChangeEvent<T> {
    pub fn id(&self) -> &T::Id {
        match self {
            ChangeEvent::Insert(record) | ChangeEvent::Update(record) => record.id(),
            ChangeEvent::Delete(id) => id,
        }
    }

    /// The owner of the carried record; deletes carry only an id.
    pub fn owner(&self) -> Option<&str> {
        match self {
            ChangeEvent::Insert(record) | ChangeEvent::Update(record) => Some(record.owner()),
            ChangeEvent::Delete(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Insert(_) => "INSERT",
            ChangeEvent::Update(_) => "UPDATE",
            ChangeEvent::Delete(_) => "DELETE",
        }
    }
}

/// Everything the store's event channel can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Item(ChangeEvent<PantryItem>),
    Recipe(ChangeEvent<Recipe>),
    /// A subscription stopped delivering; the store will accept a new subscribe.
    ChannelClosed {
        table: Table,
        reason: Option<String>,
    },
}

impl StoreEvent {
    /// Validates a raw change received on `table`'s channel.
    pub fn decode(table: Table, raw: &RawChange) -> Result<Self, EventError> {
        match table {
            Table::Pantry => Ok(StoreEvent::Item(ChangeEvent::from_raw(raw)?)),
            Table::Recipes => Ok(StoreEvent::Recipe(ChangeEvent::from_raw(raw)?)),
        }
    }

    pub fn table(&self) -> Table {
        match self {
            StoreEvent::Item(_) => Table::Pantry,
            StoreEvent::Recipe(_) => Table::Recipes,
            StoreEvent::ChannelClosed { table, .. } => *table,
        }
    }
}
