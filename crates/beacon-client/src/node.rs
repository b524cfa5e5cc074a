//! Capability set shared by every beacon node backend.

use std::future::Future;

use alloy_primitives::B256;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    BeaconClient,
    error::Result,
    types::{
        Block, BlockId, ChainSpec, Fork, Genesis, HeadEvent, HeaderInfo, ProposerDuty,
        SignedBeaconBlock, SyncStatus, ValidatorSnapshot, Withdrawal,
    },
};

/// Operations a relay needs from a consensus layer node.
///
/// [`BeaconClient`] talks to a single node over HTTP. Other backends (a fan-out over several
/// nodes, an in-memory node for tests) implement the same trait so callers stay unchanged.
/// Implementations must be safe to call concurrently.
pub trait BeaconNode: Send + Sync {
    /// Base URL of the node.
    fn uri(&self) -> &Url;

    /// Forward head events into `head_tx` until `shutdown_token` is cancelled.
    fn subscribe_head_events(
        &self,
        head_tx: mpsc::Sender<HeadEvent>,
        shutdown_token: CancellationToken,
    ) -> impl Future<Output = ()> + Send;

    fn sync_status(&self) -> impl Future<Output = Result<SyncStatus>> + Send;

    /// Head slot reported by [`BeaconNode::sync_status`].
    fn current_slot(&self) -> impl Future<Output = Result<u64>> + Send {
        async move { Ok(self.sync_status().await?.head_slot) }
    }

    fn proposer_duties(&self, epoch: u64) -> impl Future<Output = Result<Vec<ProposerDuty>>> + Send;

    fn header(&self) -> impl Future<Output = Result<HeaderInfo>> + Send;

    fn header_for_slot(&self, slot: u64) -> impl Future<Output = Result<HeaderInfo>> + Send;

    fn block(&self, block_id: BlockId) -> impl Future<Output = Result<Block>> + Send;

    fn block_for_slot(&self, slot: u64) -> impl Future<Output = Result<Block>> + Send {
        self.block(BlockId::Slot(slot))
    }

    fn publish_block(
        &self,
        block: &SignedBeaconBlock,
    ) -> impl Future<Output = Result<StatusCode>> + Send;

    fn genesis(&self) -> impl Future<Output = Result<Genesis>> + Send;

    fn spec(&self) -> impl Future<Output = Result<ChainSpec>> + Send;

    fn fork_schedule(&self) -> impl Future<Output = Result<Vec<Fork>>> + Send;

    fn randao(&self, slot: u64) -> impl Future<Output = Result<B256>> + Send;

    fn withdrawals(&self, slot: u64) -> impl Future<Output = Result<Vec<Withdrawal>>> + Send;

    /// Active and pending validators as of `head_slot`, keyed by normalized pubkey.
    fn fetch_validators(
        &self,
        head_slot: u64,
    ) -> impl Future<Output = Result<ValidatorSnapshot>> + Send;
}

impl BeaconNode for BeaconClient {
    fn uri(&self) -> &Url {
        BeaconClient::uri(self)
    }

    fn subscribe_head_events(
        &self,
        head_tx: mpsc::Sender<HeadEvent>,
        shutdown_token: CancellationToken,
    ) -> impl Future<Output = ()> + Send {
        BeaconClient::subscribe_head_events(self, head_tx, shutdown_token)
    }

    fn sync_status(&self) -> impl Future<Output = Result<SyncStatus>> + Send {
        BeaconClient::sync_status(self)
    }

    fn current_slot(&self) -> impl Future<Output = Result<u64>> + Send {
        BeaconClient::current_slot(self)
    }

    fn proposer_duties(
        &self,
        epoch: u64,
    ) -> impl Future<Output = Result<Vec<ProposerDuty>>> + Send {
        BeaconClient::proposer_duties(self, epoch)
    }

    fn header(&self) -> impl Future<Output = Result<HeaderInfo>> + Send {
        BeaconClient::header(self)
    }

    fn header_for_slot(&self, slot: u64) -> impl Future<Output = Result<HeaderInfo>> + Send {
        BeaconClient::header_for_slot(self, slot)
    }

    fn block(&self, block_id: BlockId) -> impl Future<Output = Result<Block>> + Send {
        BeaconClient::block(self, block_id)
    }

    fn block_for_slot(&self, slot: u64) -> impl Future<Output = Result<Block>> + Send {
        BeaconClient::block_for_slot(self, slot)
    }

    fn publish_block(
        &self,
        block: &SignedBeaconBlock,
    ) -> impl Future<Output = Result<StatusCode>> + Send {
        BeaconClient::publish_block(self, block)
    }

    fn genesis(&self) -> impl Future<Output = Result<Genesis>> + Send {
        BeaconClient::genesis(self)
    }

    fn spec(&self) -> impl Future<Output = Result<ChainSpec>> + Send {
        BeaconClient::spec(self)
    }

    fn fork_schedule(&self) -> impl Future<Output = Result<Vec<Fork>>> + Send {
        BeaconClient::fork_schedule(self)
    }

    fn randao(&self, slot: u64) -> impl Future<Output = Result<B256>> + Send {
        BeaconClient::randao(self, slot)
    }

    fn withdrawals(&self, slot: u64) -> impl Future<Output = Result<Vec<Withdrawal>>> + Send {
        BeaconClient::withdrawals(self, slot)
    }

    fn fetch_validators(
        &self,
        head_slot: u64,
    ) -> impl Future<Output = Result<ValidatorSnapshot>> + Send {
        BeaconClient::fetch_validators(self, head_slot)
    }
}
