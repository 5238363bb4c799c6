//! In-memory fakes of the remote services for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::data::{DataError, DataService, Filter, Table};
use crate::generation::{GenerationConfig, GenerationError, GenerationService};
use crate::realtime::{ChangeFeed, ChannelHandle, EventSink, RealtimeError};
use crate::store::StoreEvent;

/// A pantry row as the REST API would return it.
pub fn item_row(id: i64, user_id: &str, name: &str, quantity: u32) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "name": name,
        "description": "",
        "quantity": quantity,
        "tags": [],
        "created_at": "2024-06-01T12:00:00+00:00"
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Default)]
struct Tables {
    rows: HashMap<Table, Vec<Value>>,
    next_id: i64,
    failing: Vec<Op>,
    calls: HashMap<Op, usize>,
    withhold_rows: bool,
}

/// A [`DataService`] backed by in-memory tables.
#[derive(Default)]
pub struct MemoryData {
    tables: Mutex<Tables>,
}

impl MemoryData {
    pub fn new() -> Self {
        let data = Self::default();
        data.tables.lock().unwrap().next_id = 100;
        data
    }

    pub fn with_rows(self, table: Table, rows: Vec<Value>) -> Self {
        self.tables.lock().unwrap().rows.insert(table, rows);
        self
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .rows
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every later call of `op` fail with a 500.
    pub fn fail(&self, op: Op) {
        self.tables.lock().unwrap().failing.push(op);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.tables
            .lock()
            .unwrap()
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// When false, inserts store the row but return nothing.
    pub fn set_return_rows(&self, return_rows: bool) {
        self.tables.lock().unwrap().withhold_rows = !return_rows;
    }

    fn begin(&self, op: Op, table: Table) -> Result<std::sync::MutexGuard<'_, Tables>, DataError> {
        let mut tables = self.tables.lock().unwrap();
        *tables.calls.entry(op).or_default() += 1;
        if tables.failing.contains(&op) {
            return Err(DataError::Status {
                table,
                status: 500,
                message: format!("{:?} failed", op),
            });
        }
        Ok(tables)
    }
}

#[async_trait]
impl DataService for MemoryData {
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, DataError> {
        let tables = self.begin(Op::Select, table)?;
        Ok(tables
            .rows
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, mut record: Value) -> Result<Vec<Value>, DataError> {
        let mut tables = self.begin(Op::Insert, table)?;
        tables.next_id += 1;
        let id = tables.next_id;
        if let Some(object) = record.as_object_mut() {
            object.insert("id".to_string(), json!(id));
            object.insert("created_at".to_string(), json!("2024-06-01T12:00:00+00:00"));
        }
        tables.rows.entry(table).or_default().push(record.clone());

        if tables.withhold_rows {
            Ok(Vec::new())
        } else {
            Ok(vec![record])
        }
    }

    async fn update(&self, table: Table, filter: &Filter, changes: Value) -> Result<(), DataError> {
        let mut tables = self.begin(Op::Update, table)?;
        for row in tables.rows.entry(table).or_default().iter_mut() {
            if !filter.matches(row) {
                continue;
            }
            if let (Some(row), Some(changes)) = (row.as_object_mut(), changes.as_object()) {
                for (key, value) in changes {
                    row.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), DataError> {
        let mut tables = self.begin(Op::Delete, table)?;
        tables
            .rows
            .entry(table)
            .or_default()
            .retain(|row| !filter.matches(row));
        Ok(())
    }
}

/// A [`GenerationService`] that answers every prompt the same way.
pub struct ScriptedGenerator {
    response: Result<String, (u16, String)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn text(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            response: Err((status, message.to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err((status, message)) => Err(GenerationError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

/// A [`ChangeFeed`] whose events are pushed by the test.
#[derive(Default)]
pub struct MemoryFeed {
    sinks: Mutex<HashMap<Table, (Filter, EventSink)>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to the channel open for its table.
    pub fn push(&self, event: StoreEvent) {
        let sinks = self.sinks.lock().unwrap();
        let (_, sink) = sinks.get(&event.table()).expect("no channel open for table");
        sink.send(event).unwrap();
    }

    pub fn filter_for(&self, table: Table) -> Option<Filter> {
        self.sinks
            .lock()
            .unwrap()
            .get(&table)
            .map(|(filter, _)| filter.clone())
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Channels closed cleanly through their handle.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeFeed for MemoryFeed {
    async fn open(
        &self,
        table: Table,
        filter: Filter,
        sink: EventSink,
    ) -> Result<ChannelHandle, RealtimeError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().insert(table, (filter, sink));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let closed = self.closed.clone();
        let task = tokio::spawn(async move {
            if shutdown_rx.await.is_ok() {
                closed.fetch_add(1, Ordering::SeqCst);
            }
        });

        Ok(ChannelHandle::new(table, shutdown_tx, task))
    }
}
