//! # Head Event Service
//!
//! This module provides [`HeadEventService`], which keeps a head event subscription alive for the
//! lifetime of the process and forwards every decoded event to a single consumer channel.
//!
//! ## States
//!
//! ```text
//!              connected
//!  Connecting ───────────▶ Streaming
//!      ▲                      │
//!      └──── sleep(delay) ◀───┘ connection closed / transport error
//! ```
//!
//! There is no terminal state. The loop only returns when the shutdown token is cancelled or the
//! consumer has dropped its receiver, which is noticed while waiting for events and during the
//! backoff as well as on delivery. A malformed event, whether bad JSON or a line that is not
//! valid SSE, is logged and skipped without touching the connection.
//!
//! Delivery awaits channel capacity, so a slow consumer slows the stream down instead of losing
//! events. Events are forwarded in the order the node emits them, duplicates included.

use std::{fmt, time::Duration};

use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    Error, HeadEvent,
    client::DEFAULT_RECONNECT_DELAY,
    head_subscription::{StreamEvent, subscribe_head_events},
};

/// Connection state of the head event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Connecting => f.write_str("connecting"),
            StreamState::Streaming => f.write_str("streaming"),
        }
    }
}

/// Why the service loop returned.
enum Exit {
    Shutdown,
    ConsumerClosed,
}

/// Subscribes to head events via SSE and forwards them to a consumer, reconnecting forever.
pub struct HeadEventService {
    /// Name of the beacon node, for logging.
    name: String,
    /// Base URL of the beacon node.
    url: Url,
    /// Fixed delay before every reconnection attempt.
    reconnect_delay: Duration,
    /// Channel the decoded events are delivered to.
    head_tx: mpsc::Sender<HeadEvent>,
}

impl HeadEventService {
    /// Creates a new `HeadEventService` with the default reconnect delay.
    pub fn new(name: String, url: Url, head_tx: mpsc::Sender<HeadEvent>) -> Self {
        Self {
            name,
            url,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            head_tx,
        }
    }

    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    /// Spawns the service as a background task.
    pub fn spawn(self, shutdown_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown_token))
    }

    /// Main loop. Returns once `shutdown_token` is cancelled or the consumer is gone.
    pub async fn run(self, shutdown_token: CancellationToken) {
        let exit = self.run_until_exit(&shutdown_token).await;
        match exit {
            Exit::Shutdown => {
                info!(name = %self.name, "HeadEventService received shutdown signal")
            }
            Exit::ConsumerClosed => {
                warn!(name = %self.name, "Head event consumer dropped, stopping subscription")
            }
        }
    }

    async fn run_until_exit(&self, shutdown_token: &CancellationToken) -> Exit {
        let mut state = StreamState::Connecting;

        loop {
            info!(name = %self.name, url = %self.url, %state, "Connecting to head event stream");

            match subscribe_head_events(&self.url) {
                Ok(mut stream) => loop {
                    let item = tokio::select! {
                        biased;

                        _ = shutdown_token.cancelled() => return Exit::Shutdown,
                        _ = self.head_tx.closed() => return Exit::ConsumerClosed,
                        item = stream.next() => item,
                    };

                    match item {
                        Some(Ok(StreamEvent::Connected)) => {
                            state = StreamState::Streaming;
                            info!(name = %self.name, %state, "Subscribed to head events");
                        }
                        Some(Ok(StreamEvent::Head(head))) => {
                            debug!(
                                name = %self.name,
                                slot = head.slot,
                                block = %head.block_root,
                                "Received head event"
                            );
                            if let Some(exit) = self.deliver(head, shutdown_token).await {
                                return exit;
                            }
                        }
                        Some(Err(e @ (Error::Decode(_) | Error::MalformedEvent(_)))) => {
                            error!(name = %self.name, error = %e, "Malformed head event, skipping")
                        }
                        Some(Err(e)) => {
                            warn!(name = %self.name, error = %e, "Head event stream error");
                            break;
                        }
                        None => break,
                    }
                },
                Err(e) => {
                    error!(
                        name = %self.name,
                        url = %self.url,
                        error = %e,
                        "Failed to subscribe to head events"
                    )
                }
            }

            warn!(
                name = %self.name,
                previous_state = %state,
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "Head event stream ended, reconnecting"
            );
            state = StreamState::Connecting;

            tokio::select! {
                biased;

                _ = shutdown_token.cancelled() => return Exit::Shutdown,
                _ = self.head_tx.closed() => return Exit::ConsumerClosed,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Hands `head` to the consumer, waiting for channel capacity.
    async fn deliver(&self, head: HeadEvent, shutdown_token: &CancellationToken) -> Option<Exit> {
        tokio::select! {
            biased;

            _ = shutdown_token.cancelled() => Some(Exit::Shutdown),
            result = self.head_tx.send(head) => result.err().map(|_| Exit::ConsumerClosed),
        }
    }
}
