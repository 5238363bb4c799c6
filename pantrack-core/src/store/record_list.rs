//! Ordered, id-keyed record sequence with idempotent reconciliation rules.

use std::fmt;

use super::event::ChangeEvent;

/// A row that can be mirrored locally.
pub trait Record: Clone + PartialEq {
    type Id: Clone + PartialEq + fmt::Debug + fmt::Display;

    fn id(&self) -> &Self::Id;

    /// The user id that owns this row.
    fn owner(&self) -> &str;
}

/// What applying a change did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Replaced,
    Removed,
    /// The change was valid but already reflected locally.
    Unchanged,
    /// The change was not meant for this store (foreign owner, channel notice).
    Ignored,
}

impl Applied {
    pub fn changed(self) -> bool {
        matches!(self, Applied::Inserted | Applied::Replaced | Applied::Removed)
    }
}

/// Local mirror of one remote collection.
///
/// Every mutation looks records up by id at the moment it runs, so applying
/// the same change twice is always safe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordList<T: Record> {
    records: Vec<T>,
}

impl<T: Record> Default for RecordList<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Record> RecordList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from fetched rows, keeping the first row for each id.
    pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
        let mut list = Self::new();
        for record in records {
            list.insert(record);
        }
        list
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<T::Id> {
        self.records.iter().map(|r| r.id().clone()).collect()
    }

    /// Appends `record` unless a record with the same id is already present.
    pub fn insert(&mut self, record: T) -> Applied {
        if self.contains(record.id()) {
            return Applied::Unchanged;
        }
        self.records.push(record);
        Applied::Inserted
    }

    /// Replaces the record sharing `record`'s id. Absent ids are left alone.
    pub fn replace(&mut self, record: T) -> Applied {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) if *existing == record => Applied::Unchanged,
            Some(existing) => {
                *existing = record;
                Applied::Replaced
            }
            None => Applied::Unchanged,
        }
    }

    /// Removes the record with `id`, if present.
    pub fn remove(&mut self, id: &T::Id) -> Applied {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        if self.records.len() == before {
            Applied::Unchanged
        } else {
            Applied::Removed
        }
    }

    /// Runs `update` against the current record with `id` and returns the result.
    pub fn update_with(&mut self, id: &T::Id, update: impl FnOnce(&mut T)) -> Option<&T> {
        let record = self.records.iter_mut().find(|r| r.id() == id)?;
        update(record);
        Some(record)
    }

    /// Folds one change event into the list.
    pub fn apply(&mut self, event: ChangeEvent<T>) -> Applied {
        match event {
            ChangeEvent::Insert(record) => self.insert(record),
            ChangeEvent::Update(record) => self.replace(record),
            ChangeEvent::Delete(id) => self.remove(&id),
        }
    }
}
