//! Beacon head follower.
//!
//! Follows the chain head of a consensus layer node and keeps the state a relay needs fresh:
//!
//! 1. Subscribe to head events (reconnecting forever)
//! 2. On every head, read the node's sync status
//! 3. On every new epoch, refresh proposer duties and the validator set
//!
//! ## Architecture
//!
//! ```text
//!   CL                 HeadEventService            HeadConsumer
//!   |                        |                          |
//!   |--head (SSE)----------->|                          |
//!   |                        |--HeadEvent (channel)---->|
//!   |                        |                          |
//!   |<--------------------------------------syncing-----|
//!   |<------------------------------proposer duties-----|
//!   |<-------------------------------------validators---|
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::bail;
use beacon_client::{BeaconClient, BeaconNode, Config, HeadEvent, HeadEventService};
use clap::Parser;
use futures::future::select_all;
use tokio::{
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Used when the node's spec endpoint cannot be read at startup.
const DEFAULT_SLOTS_PER_EPOCH: u64 = 32;

#[derive(Parser, Debug)]
#[command(name = "beacon-client")]
#[command(about = "Follow beacon chain head events and refresh validator state")]
struct Cli {
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    info!(
        name = %config.beacon_node.name,
        url = %config.beacon_node.url,
        "Loaded configuration"
    );

    let client = Arc::new(BeaconClient::from_config(&config)?);

    let slots_per_epoch = match client.spec().await {
        Ok(spec) => spec.slots_per_epoch,
        Err(e) => {
            warn!(error = %e, default = DEFAULT_SLOTS_PER_EPOCH, "Failed to read chain spec");
            DEFAULT_SLOTS_PER_EPOCH
        }
    };

    let shutdown_token = CancellationToken::new();
    let (head_tx, head_rx) = mpsc::channel(config.head_event_buffer);

    let mut handles = Vec::new();

    // Start head event service.

    handles.push(
        HeadEventService::new(client.name().to_string(), client.uri().clone(), head_tx)
            .with_reconnect_delay(config.reconnect_delay())
            .spawn(shutdown_token.clone()),
    );

    // Start head consumer.

    {
        let consumer = HeadConsumer::new(client, slots_per_epoch);
        let shutdown_token = shutdown_token.clone();

        handles.push(tokio::spawn(async move {
            consumer.run(head_rx, shutdown_token).await;
        }));
    }

    info!("All services started, waiting for shutdown signal");

    let mut signals: Vec<_> = [SignalKind::interrupt(), SignalKind::terminate()]
        .into_iter()
        .filter_map(|kind| signal(kind).ok())
        .collect();

    if signals.is_empty() {
        bail!("No shutdown signals could be registered");
    }

    let _ = select_all(signals.iter_mut().map(|s| Box::pin(s.recv()))).await;

    info!("Received shutdown signal, shutting down");

    shutdown_token.cancel();

    for handle in handles {
        let _ = handle.await;
    }

    info!("All services stopped, exiting");

    Ok(())
}

/// Reacts to head events by re-reading the state that depends on the head.
///
/// Each event is only a trigger: the state read afterwards may already be ahead of the event's
/// slot.
struct HeadConsumer<N> {
    node: Arc<N>,
    slots_per_epoch: u64,
    /// Epoch whose duties and validator set were last refreshed successfully.
    refreshed_epoch: Option<u64>,
}

impl<N: BeaconNode> HeadConsumer<N> {
    fn new(node: Arc<N>, slots_per_epoch: u64) -> Self {
        Self {
            node,
            slots_per_epoch: slots_per_epoch.max(1),
            refreshed_epoch: None,
        }
    }

    async fn run(
        mut self,
        mut head_rx: mpsc::Receiver<HeadEvent>,
        shutdown_token: CancellationToken,
    ) {
        loop {
            let head = tokio::select! {
                biased;

                _ = shutdown_token.cancelled() => {
                    info!("HeadConsumer received shutdown signal");
                    return;
                }
                head = head_rx.recv() => match head {
                    Some(head) => head,
                    None => {
                        info!("Head event channel closed");
                        return;
                    }
                },
            };

            self.handle_head(head).await;
        }
    }

    async fn handle_head(&mut self, head: HeadEvent) {
        info!(slot = head.slot, block = %head.block_root, state = %head.state_root, "New head");

        match self.node.sync_status().await {
            Ok(status) if status.is_syncing => {
                warn!(head_slot = status.head_slot, "Beacon node is syncing")
            }
            Ok(status) => debug!(head_slot = status.head_slot, "Beacon node is synced"),
            Err(e) => warn!(error = %e, "Failed to fetch sync status"),
        }

        let epoch = head.slot / self.slots_per_epoch;
        if self.refreshed_epoch == Some(epoch) {
            return;
        }

        let duties = match self.node.proposer_duties(epoch).await {
            Ok(duties) => duties,
            Err(e) => {
                warn!(epoch, error = %e, "Failed to fetch proposer duties, retrying on next head");
                return;
            }
        };

        let validators = match self.node.fetch_validators(head.slot).await {
            Ok(validators) => validators,
            Err(e) => {
                warn!(
                    slot = head.slot,
                    error = %e,
                    "Failed to fetch validators, retrying on next head"
                );
                return;
            }
        };

        info!(
            epoch,
            proposer_duties = duties.len(),
            validators = validators.len(),
            "Refreshed epoch state"
        );
        self.refreshed_epoch = Some(epoch);
    }
}
