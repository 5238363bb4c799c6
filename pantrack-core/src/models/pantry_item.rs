//! Pantry items and the helpers that sit around them: the "add item" form,
//! tag parsing and search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::de;
use crate::store::Record;

/// A row of the `pantry` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PantryItem {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub description: String,
    pub quantity: u32,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub tags: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de::lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl PantryItem {
    /// Case-insensitive match against name, description or any tag.
    ///
    /// An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

impl Record for PantryItem {
    type Id = i64;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }
}

impl fmt::Display for PantryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "Quantity: {}", self.quantity)?;
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        if !self.tags.is_empty() {
            writeln!(f, "Tags: {}", self.tags.join(", "))?;
        }
        Ok(())
    }
}

/// Insert payload for the `pantry` table. The id is assigned by the service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewPantryItem {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub tags: Vec<String>,
}

impl NewPantryItem {
    pub fn from_form(form: &ItemForm, user_id: impl Into<String>) -> Result<Self, FormError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(FormError::EmptyName);
        }

        Ok(Self {
            user_id: user_id.into(),
            name: name.to_string(),
            description: form.description.trim().to_string(),
            quantity: form.quantity,
            tags: parse_tags(&form.tags),
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Item name cannot be empty")]
    EmptyName,
}

/// Input state for adding a new pantry item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemForm {
    pub name: String,
    pub description: String,
    pub quantity: u32,
    /// Comma-separated tag text as typed by the user
    pub tags: String,
}

impl Default for ItemForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            quantity: 1,
            tags: String::new(),
        }
    }
}

impl ItemForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Clears the form back to its initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Splits comma-separated tag text into a set of trimmed, non-empty labels.
///
/// First occurrence wins when a label repeats.
pub fn parse_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Items whose name, description or tags contain `query`, case-insensitively.
pub fn filter_items<'a>(items: &'a [PantryItem], query: &str) -> Vec<&'a PantryItem> {
    items.iter().filter(|item| item.matches(query)).collect()
}

/// Every distinct tag across `items`, in first-seen order.
pub fn all_tags(items: &[PantryItem]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in items.iter().flat_map(|item| item.tags.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}
