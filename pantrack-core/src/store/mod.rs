//! Sync store: the session's local mirror of the `pantry` and `recipes`
//! tables.
//!
//! The store is the single writer of local state. It is filled by an initial
//! fetch, kept current by folding change events delivered over an mpsc
//! channel, and mutated optimistically only after a remote write succeeds.
//!
//! Every fold rule is idempotent by record id:
//! - INSERT appends only when the id is absent
//! - UPDATE replaces the record with the id, or does nothing
//! - DELETE removes the record with the id, or does nothing
//! - UPDATE to a record now owned by another user removes it
//!
//! so the echo of a local mutation arriving on the change channel is a no-op.

mod error;
mod event;
mod record_list;

pub use error::StoreError;
pub use event::{ChangeEvent, EventError, RawChange, StoreEvent};
pub use record_list::{Applied, Record, RecordList};

use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc;

use crate::data::{DataError, DataService, Filter, Table};
use crate::generation::{GenerationConfig, GenerationService, RecipeFlow};
use crate::models::{
    all_tags, filter_items, ItemForm, NewPantryItem, NewRecipe, PantryItem, Recipe, RecipeId,
};
use crate::realtime::{ChangeFeed, ChannelHandle, EventSink};

/// Local state for one authenticated session.
pub struct SyncStore<D> {
    data: D,
    user_id: String,
    items: RecordList<PantryItem>,
    recipes: RecordList<Recipe>,
    events_tx: EventSink,
    events_rx: mpsc::UnboundedReceiver<StoreEvent>,
    channels: Vec<ChannelHandle>,
}

impl<D: DataService> SyncStore<D> {
    /// Creates an empty store for `user_id` without touching the service.
    pub fn new(data: D, user_id: impl Into<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            data,
            user_id: user_id.into(),
            items: RecordList::new(),
            recipes: RecordList::new(),
            events_tx,
            events_rx,
            channels: Vec::new(),
        }
    }

    /// Creates a store and fetches both tables for `user_id`.
    ///
    /// Fetch failures are not fatal: the affected table stays empty and the
    /// failure is returned alongside the store.
    pub async fn initialize(data: D, user_id: impl Into<String>) -> (Self, Vec<StoreError>) {
        let mut store = Self::new(data, user_id);
        let mut failures = Vec::new();

        if let Err(e) = store.load_items().await {
            tracing::error!(error = %e, "Initial fetch failed");
            failures.push(e);
        }
        if let Err(e) = store.load_recipes().await {
            tracing::error!(error = %e, "Initial fetch failed");
            failures.push(e);
        }

        tracing::info!(
            user_id = %store.user_id,
            items = store.items.len(),
            recipes = store.recipes.len(),
            "Store initialized"
        );

        (store, failures)
    }

    /// Replaces local items with the user's rows. On failure local items are kept.
    pub async fn load_items(&mut self) -> Result<usize, StoreError> {
        let items: Vec<PantryItem> = self.fetch(Table::Pantry).await?;
        self.items = RecordList::from_records(items);
        Ok(self.items.len())
    }

    /// Replaces local recipes with the user's rows. On failure local recipes are kept.
    pub async fn load_recipes(&mut self) -> Result<usize, StoreError> {
        let recipes: Vec<Recipe> = self.fetch(Table::Recipes).await?;
        self.recipes = RecordList::from_records(recipes);
        Ok(self.recipes.len())
    }

    async fn fetch<T>(&self, table: Table) -> Result<Vec<T>, StoreError>
    where
        T: Record + DeserializeOwned,
    {
        let rows = self
            .data
            .select(table, &self.owner_filter())
            .await
            .map_err(|source| StoreError::Fetch { table, source })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<T>(row) {
                Ok(record) if record.owner() == self.user_id => records.push(record),
                Ok(record) => {
                    tracing::warn!(table = %table, id = %record.id(), "Skipping row owned by another user");
                }
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "Skipping malformed row");
                }
            }
        }
        Ok(records)
    }

    fn owner_filter(&self) -> Filter {
        Filter::eq("user_id", &self.user_id)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn items(&self) -> &[PantryItem] {
        self.items.as_slice()
    }

    pub fn recipes(&self) -> &[Recipe] {
        self.recipes.as_slice()
    }

    pub fn item(&self, id: i64) -> Option<&PantryItem> {
        self.items.get(&id)
    }

    pub fn recipe(&self, id: &RecipeId) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    /// True when the pantry has no items (the "empty pantry" state).
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn search(&self, query: &str) -> Vec<&PantryItem> {
        filter_items(self.items.as_slice(), query)
    }

    pub fn all_tags(&self) -> Vec<String> {
        all_tags(self.items.as_slice())
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Opens the change channel for `table`, filtered to this user.
    ///
    /// At most one channel per table may be open at a time.
    pub async fn subscribe<F>(&mut self, feed: &F, table: Table) -> Result<(), StoreError>
    where
        F: ChangeFeed + ?Sized,
    {
        if self.is_subscribed(table) {
            return Err(StoreError::AlreadySubscribed(table));
        }

        let handle = feed
            .open(table, self.owner_filter(), self.events_tx.clone())
            .await
            .map_err(|source| StoreError::Subscription { table, source })?;

        tracing::info!(table = %table, "Subscribed to changes");
        self.channels.push(handle);
        Ok(())
    }

    pub fn is_subscribed(&self, table: Table) -> bool {
        self.channels.iter().any(|c| c.table() == table)
    }

    /// Waits for the next event from any open channel.
    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        self.events_rx.recv().await
    }

    /// Returns an already-queued event without waiting.
    pub fn try_next_event(&mut self) -> Option<StoreEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Folds one event into local state.
    pub fn apply(&mut self, event: StoreEvent) -> Applied {
        match event {
            StoreEvent::Item(change) => {
                if !self.owns(change.owner()) {
                    return Self::leave_view(&mut self.items, change, Table::Pantry);
                }
                let kind = change.kind();
                let id = *change.id();
                let applied = self.items.apply(change);
                tracing::debug!(kind, id, ?applied, "Applied item change");
                applied
            }
            StoreEvent::Recipe(change) => {
                if !self.owns(change.owner()) {
                    return Self::leave_view(&mut self.recipes, change, Table::Recipes);
                }
                let kind = change.kind();
                let id = change.id().clone();
                let applied = self.recipes.apply(change);
                tracing::debug!(kind, id = %id, ?applied, "Applied recipe change");
                applied
            }
            StoreEvent::ChannelClosed { table, reason } => {
                tracing::warn!(
                    table = %table,
                    reason = reason.as_deref().unwrap_or("closed"),
                    "Change channel closed"
                );
                // dropping the handle releases the finished task
                self.channels.retain(|c| c.table() != table);
                Applied::Ignored
            }
        }
    }

    /// A change carrying another user's record. An UPDATE means a record we
    /// hold has moved out of this user's view; anything else is not ours.
    fn leave_view<T: Record>(
        list: &mut RecordList<T>,
        change: ChangeEvent<T>,
        table: Table,
    ) -> Applied {
        match change {
            ChangeEvent::Update(record) if list.contains(record.id()) => {
                tracing::debug!(table = %table, id = %record.id(), "Record moved to another user");
                list.remove(record.id())
            }
            other => {
                tracing::warn!(table = %table, id = %other.id(), "Ignoring change for another user");
                Applied::Ignored
            }
        }
    }

    fn owns(&self, owner: Option<&str>) -> bool {
        owner.map_or(true, |owner| owner == self.user_id)
    }

    /// Applies every event already waiting in the channel.
    pub fn drain_events(&mut self) -> usize {
        let mut count = 0;
        while let Some(event) = self.try_next_event() {
            self.apply(event);
            count += 1;
        }
        count
    }

    /// Closes every open channel and ends the store's lifetime.
    pub async fn teardown(mut self) {
        for channel in self.channels.drain(..) {
            let table = channel.table();
            channel.close().await;
            tracing::debug!(table = %table, "Channel closed");
        }
    }

    // ------------------------------------------------------------------
    // Item mutations
    // ------------------------------------------------------------------

    /// Inserts the item described by `form`, appends the stored row and resets the form.
    ///
    /// On failure neither local state nor the form is touched.
    pub async fn add_item(&mut self, form: &mut ItemForm) -> Result<Vec<PantryItem>, StoreError> {
        let new_item = NewPantryItem::from_form(form, &self.user_id)?;
        let record = serde_json::to_value(&new_item).map_err(|e| StoreError::Write {
            table: Table::Pantry,
            action: "insert",
            source: DataError::Decode(e.to_string()),
        })?;

        let rows = self
            .data
            .insert(Table::Pantry, record)
            .await
            .map_err(|source| self.write_failed(Table::Pantry, "insert", source))?;

        let created: Vec<PantryItem> = decode_rows(Table::Pantry, rows);
        for item in &created {
            self.items.insert(item.clone());
        }
        form.reset();

        tracing::info!(name = %new_item.name, "Added item");
        Ok(created)
    }

    /// Adds one to the item's quantity. Unknown ids are a no-op.
    pub async fn increment(&mut self, id: i64) -> Result<Option<PantryItem>, StoreError> {
        let Some(current) = self.items.get(&id).map(|i| i.quantity) else {
            return Ok(None);
        };
        self.set_quantity(id, current.saturating_add(1)).await
    }

    /// Takes one from the item's quantity.
    ///
    /// At zero (or for unknown ids) nothing is written and `None` is returned.
    pub async fn decrement(&mut self, id: i64) -> Result<Option<PantryItem>, StoreError> {
        let current = match self.items.get(&id) {
            Some(item) if item.quantity > 0 => item.quantity,
            _ => return Ok(None),
        };
        self.set_quantity(id, current - 1).await
    }

    async fn set_quantity(
        &mut self,
        id: i64,
        quantity: u32,
    ) -> Result<Option<PantryItem>, StoreError> {
        self.data
            .update(Table::Pantry, &Filter::eq("id", id), json!({ "quantity": quantity }))
            .await
            .map_err(|source| self.write_failed(Table::Pantry, "update", source))?;

        // look the item up again: events may have been applied meanwhile
        Ok(self
            .items
            .update_with(&id, |item| item.quantity = quantity)
            .cloned())
    }

    /// Deletes the item remotely, then locally.
    pub async fn delete_item(&mut self, id: i64) -> Result<(), StoreError> {
        self.data
            .delete(Table::Pantry, &Filter::eq("id", id))
            .await
            .map_err(|source| self.write_failed(Table::Pantry, "delete", source))?;
        self.items.remove(&id);
        Ok(())
    }

    /// Deletes the recipe remotely, then locally.
    pub async fn delete_recipe(&mut self, id: &RecipeId) -> Result<(), StoreError> {
        self.data
            .delete(Table::Recipes, &Filter::eq("id", id))
            .await
            .map_err(|source| self.write_failed(Table::Recipes, "delete", source))?;
        self.recipes.remove(id);
        Ok(())
    }

    fn write_failed(&self, table: Table, action: &'static str, source: DataError) -> StoreError {
        tracing::debug!(table = %table, action, error = %source, "Remote write failed");
        StoreError::Write {
            table,
            action,
            source,
        }
    }

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    /// Runs the recipe generation flow against the current pantry.
    ///
    /// `Ok(None)` means the recipe was saved but the service did not return
    /// the stored row; it will arrive on the recipes channel.
    pub async fn generate_recipe<G>(
        &mut self,
        service: &G,
        config: &GenerationConfig,
    ) -> Result<Option<Recipe>, StoreError>
    where
        G: GenerationService + ?Sized,
    {
        RecipeFlow::new().run(self, service, config).await
    }

    /// Saves a generated recipe and mirrors the stored row.
    pub(crate) async fn insert_recipe(
        &mut self,
        recipe: &NewRecipe,
    ) -> Result<Option<Recipe>, DataError> {
        let record =
            serde_json::to_value(recipe).map_err(|e| DataError::Decode(e.to_string()))?;
        let rows = self.data.insert(Table::Recipes, record).await?;

        let created: Vec<Recipe> = decode_rows(Table::Recipes, rows);
        for recipe in &created {
            self.recipes.insert(recipe.clone());
        }
        Ok(created.into_iter().next())
    }
}

fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<serde_json::Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Insert returned a malformed row");
                None
            }
        })
        .collect()
}
