//! Row-level change channels.
//!
//! A [`ChangeFeed`] opens one channel per table. Each channel runs as its own
//! task and forwards validated [`StoreEvent`]s into the store's event sink,
//! finishing with a [`StoreEvent::ChannelClosed`] notice if the connection
//! drops.

mod client;
mod error;
mod protocol;

pub use client::RealtimeClient;
pub use error::RealtimeError;
pub use protocol::PhoenixMessage;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::data::{Filter, Table};
use crate::store::StoreEvent;

/// Where channel tasks deliver events.
pub type EventSink = mpsc::UnboundedSender<StoreEvent>;

/// Something that can open change channels.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a channel delivering changes to `table` rows matching `filter`.
    ///
    /// Returns once the channel is established.
    async fn open(
        &self,
        table: Table,
        filter: Filter,
        sink: EventSink,
    ) -> Result<ChannelHandle, RealtimeError>;
}

/// An open change channel.
///
/// Dropping the handle aborts the channel task; [`close`](Self::close) leaves
/// the channel cleanly.
#[derive(Debug)]
pub struct ChannelHandle {
    table: Table,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn new(table: Table, shutdown: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            table,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Asks the task to leave the channel and waits for it to finish.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::debug!(table = %self.table, error = %e, "Channel task ended abnormally");
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
