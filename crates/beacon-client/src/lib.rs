//! Beacon client - a resilient client for a consensus layer node's HTTP API.
//!
//! This crate provides functionality to:
//! - Subscribe to head events via SSE, reconnecting for as long as the process runs
//! - Read chain state through typed accessors, one per beacon API endpoint
//! - Build validator set snapshots keyed by normalized public key
//!
//! ## Example
//!
//! ```ignore
//! use beacon_client::{BeaconClient, Config};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::load("config.toml")?;
//! let client = BeaconClient::from_config(&config)?;
//!
//! let (head_tx, mut head_rx) = mpsc::channel(config.head_event_buffer);
//! let shutdown = CancellationToken::new();
//! tokio::spawn({
//!     let client = client.clone();
//!     let shutdown = shutdown.clone();
//!     async move { client.subscribe_head_events(head_tx, shutdown).await }
//! });
//!
//! while let Some(head) = head_rx.recv().await {
//!     let validators = client.fetch_validators(head.slot).await?;
//!     // Refresh relay state...
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod head_subscription;
pub mod node;
pub mod service;
pub mod types;

// Re-export main types at crate root for convenience.
pub use client::{BeaconClient, build_validator_snapshot};
pub use config::{BeaconEndpoint, Config};
pub use error::{Error, Result};
pub use fetch::HttpFetcher;
pub use head_subscription::{
    HeadEventStream, StreamEvent, build_events_url, subscribe_head_events,
};
pub use node::BeaconNode;
pub use service::head_event::{HeadEventService, StreamState};
pub use types::{
    Block, BlockId, ChainSpec, Fork, Genesis, HeadEvent, HeaderInfo, ProposerDuty, PubkeyHex,
    SignedBeaconBlock, SyncStatus, ValidatorEntry, ValidatorSnapshot, Withdrawal,
};
