//! WebSocket client for the hosted realtime endpoint.
//!
//! Each channel gets its own connection:
//! 1. Connect to `/realtime/v1/websocket`
//! 2. Send `phx_join` for `realtime:<table>` with the row filter
//! 3. Wait for an `ok` reply
//! 4. Spawn a task that forwards change frames and keeps the socket alive

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::RealtimeError;
use super::protocol::{
    PhoenixMessage, PostgresChangesPayload, ReplyPayload, PHX_CLOSE, PHX_ERROR, PHX_REPLY,
    POSTGRES_CHANGES,
};
use super::{ChangeFeed, ChannelHandle, EventSink};
use crate::data::{Filter, Table};
use crate::store::{EventError, RawChange, StoreEvent};

/// Timeout for the join reply.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Interval between keep-alive heartbeats.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
/// Ref of the join frame; later frames count up from here.
const JOIN_REF: u64 = 1;
const JOIN_REF_STR: &str = "1";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSender = SplitSink<WsStream, Message>;
type WsReceiver = SplitStream<WsStream>;

/// Opens change channels against the realtime endpoint.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    base_url: String,
    api_key: String,
    access_token: String,
}

impl RealtimeClient {
    pub fn new(base_url: String, api_key: String, access_token: String) -> Self {
        Self {
            base_url,
            api_key,
            access_token,
        }
    }

    /// Builds the WebSocket URL for the realtime endpoint.
    fn build_ws_url(&self) -> String {
        // Convert http(s) to ws(s) if needed
        let base_url = if self.base_url.starts_with("http://") {
            self.base_url.replacen("http://", "ws://", 1)
        } else if self.base_url.starts_with("https://") {
            self.base_url.replacen("https://", "wss://", 1)
        } else if !self.base_url.starts_with("ws://") && !self.base_url.starts_with("wss://") {
            format!("wss://{}", self.base_url)
        } else {
            self.base_url.clone()
        };

        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.api_key)
        )
    }

    async fn join(
        &self,
        sender: &mut WsSender,
        receiver: &mut WsReceiver,
        topic: &str,
        table: Table,
        filter: &Filter,
    ) -> Result<(), RealtimeError> {
        let join = PhoenixMessage::join(
            topic,
            table.name(),
            filter.to_realtime(),
            &self.access_token,
            JOIN_REF,
        );
        let encoded = join
            .encode()
            .map_err(|e| RealtimeError::Encode(e.to_string()))?;

        sender
            .send(Message::Text(encoded.into()))
            .await
            .map_err(|e| RealtimeError::WebSocket(e.to_string()))?;

        let reply = timeout(JOIN_TIMEOUT, async {
            while let Some(msg_result) = receiver.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        let Ok(msg) = PhoenixMessage::decode(text.as_str()) else {
                            continue;
                        };
                        if msg.event != PHX_REPLY
                            || msg.topic != topic
                            || msg.reference.as_deref() != Some(JOIN_REF_STR)
                        {
                            continue;
                        }
                        let reply: ReplyPayload = serde_json::from_value(msg.payload)
                            .map_err(|e| RealtimeError::JoinRejected(e.to_string()))?;
                        if reply.is_ok() {
                            return Ok(());
                        }
                        return Err(RealtimeError::JoinRejected(reply.reason()));
                    }
                    Ok(Message::Close(_)) => return Err(RealtimeError::Closed),
                    Ok(_) => {
                        // Ignore other message types
                    }
                    Err(e) => return Err(RealtimeError::WebSocket(e.to_string())),
                }
            }
            Err(RealtimeError::Closed)
        })
        .await;

        match reply {
            Ok(result) => result,
            Err(_) => Err(RealtimeError::JoinTimeout),
        }
    }
}

#[async_trait]
impl ChangeFeed for RealtimeClient {
    async fn open(
        &self,
        table: Table,
        filter: Filter,
        sink: EventSink,
    ) -> Result<ChannelHandle, RealtimeError> {
        let (ws_stream, _) = connect_async(self.build_ws_url())
            .await
            .map_err(|e| RealtimeError::Connection(e.to_string()))?;
        let (mut sender, mut receiver) = ws_stream.split();

        let topic = format!("realtime:{}", table.name());
        self.join(&mut sender, &mut receiver, &topic, table, &filter)
            .await?;
        tracing::debug!(table = %table, topic = %topic, "Joined change channel");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_channel(
            table,
            topic,
            sender,
            receiver,
            sink,
            shutdown_rx,
            HEARTBEAT_INTERVAL,
        ));

        Ok(ChannelHandle::new(table, shutdown_tx, task))
    }
}

/// What a received text frame means for the channel.
#[derive(Debug)]
pub(crate) enum Frame {
    Change(Result<StoreEvent, EventError>),
    Closed(String),
    Ignored,
}

pub(crate) fn classify_frame(table: Table, topic: &str, text: &str) -> Frame {
    let msg = match PhoenixMessage::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(table = %table, error = %e, "Ignoring undecodable frame");
            return Frame::Ignored;
        }
    };
    if msg.topic != topic {
        return Frame::Ignored;
    }

    match msg.event.as_str() {
        POSTGRES_CHANGES => {
            let change = serde_json::from_value::<PostgresChangesPayload>(msg.payload)
                .map_err(EventError::from)
                .and_then(|payload| StoreEvent::decode(table, &RawChange::from(payload.data)));
            Frame::Change(change)
        }
        PHX_ERROR => Frame::Closed("channel error".to_string()),
        PHX_CLOSE => Frame::Closed("channel closed by server".to_string()),
        _ => Frame::Ignored,
    }
}

/// Hands out frame refs after the join; each ref is used once.
struct FrameRefs(u64);

impl FrameRefs {
    fn after_join() -> Self {
        Self(JOIN_REF + 1)
    }

    fn next(&mut self) -> u64 {
        let reference = self.0;
        self.0 += 1;
        reference
    }
}

async fn run_channel(
    table: Table,
    topic: String,
    mut sender: WsSender,
    mut receiver: WsReceiver,
    sink: EventSink,
    mut shutdown: oneshot::Receiver<()>,
    heartbeat_every: Duration,
) {
    let mut refs = FrameRefs::after_join();
    let mut heartbeat = interval_at(Instant::now() + heartbeat_every, heartbeat_every);

    let reason = loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Ok(leave) = PhoenixMessage::leave(&topic, refs.next()).encode() {
                    let _ = sender.send(Message::Text(leave.into())).await;
                }
                let _ = sender.close().await;
                return;
            }
            _ = heartbeat.tick() => {
                let Ok(frame) = PhoenixMessage::heartbeat(refs.next()).encode() else {
                    continue;
                };
                if let Err(e) = sender.send(Message::Text(frame.into())).await {
                    break format!("heartbeat failed: {}", e);
                }
            }
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match classify_frame(table, &topic, text.as_str()) {
                    Frame::Change(Ok(event)) => {
                        if sink.send(event).is_err() {
                            // the store is gone
                            return;
                        }
                    }
                    Frame::Change(Err(e)) => {
                        tracing::warn!(table = %table, error = %e, "Rejected malformed change");
                    }
                    Frame::Closed(reason) => break reason,
                    Frame::Ignored => {}
                },
                Some(Ok(Message::Close(_))) | None => break "connection closed".to_string(),
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
            },
        }
    };

    let _ = sink.send(StoreEvent::ChannelClosed {
        table,
        reason: Some(reason),
    });
}
