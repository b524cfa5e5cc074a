//! Beacon node HTTP API client.
//!
//! [`BeaconClient`] has one method per upstream endpoint. Each method builds the endpoint URL from
//! the fixed base URL, calls the [`HttpFetcher`], and unwraps the `data` envelope. Errors are
//! propagated unchanged; nothing here retries.

use std::time::Duration;

use alloy_primitives::B256;
use reqwest::{Method, StatusCode};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::{
    config::Config,
    error::Result,
    fetch::HttpFetcher,
    service::head_event::HeadEventService,
    types::{
        Block, BlockId, ChainSpec, DataResponse, Fork, Genesis, HeadEvent, HeaderInfo,
        ProposerDuty, RandaoInfo, SignedBeaconBlock, SyncStatus, ValidatorEntry,
        ValidatorSnapshot, Withdrawal, WithdrawalsInfo,
    },
};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for downloading the validator set, which is far larger than other responses.
pub const DEFAULT_VALIDATORS_TIMEOUT: Duration = Duration::from_secs(60);

/// Default delay between head event stream reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Validator statuses included in a [`ValidatorSnapshot`].
const SNAPSHOT_VALIDATOR_STATUSES: &str = "active,pending";

/// Consensus layer HTTP API client.
///
/// Holds no mutable state, so a single instance can be shared across tasks and called
/// concurrently.
#[derive(Debug, Clone)]
pub struct BeaconClient {
    name: String,
    url: Url,
    fetcher: HttpFetcher,
    validators_timeout: Duration,
    reconnect_delay: Duration,
}

impl BeaconClient {
    /// Create a new beacon client.
    ///
    /// A trailing slash is appended to `url` if missing so endpoint paths are resolved below any
    /// path prefix the node is served under.
    pub fn new(name: impl Into<String>, url: Url, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            url: with_trailing_slash(url),
            fetcher: HttpFetcher::new(request_timeout)?,
            validators_timeout: DEFAULT_VALIDATORS_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        })
    }

    /// Create a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.beacon_node.name.clone(),
            config.beacon_node.url.clone(),
            config.request_timeout(),
        )?
        .with_validators_timeout(config.validators_timeout())
        .with_reconnect_delay(config.reconnect_delay()))
    }

    /// Sets the timeout of [`BeaconClient::fetch_validators`], which replaces the request timeout
    /// for that call only.
    pub fn with_validators_timeout(mut self, validators_timeout: Duration) -> Self {
        self.validators_timeout = validators_timeout;
        self
    }

    /// Sets the fixed backoff used by [`BeaconClient::subscribe_head_events`].
    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    /// Return name of the beacon node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return base url of the beacon node.
    pub fn uri(&self) -> &Url {
        &self.url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.url.join(path)?)
    }

    /// Stream head events into `head_tx` until `shutdown_token` is cancelled, reconnecting
    /// whenever the connection is lost.
    pub async fn subscribe_head_events(
        &self,
        head_tx: mpsc::Sender<HeadEvent>,
        shutdown_token: CancellationToken,
    ) {
        HeadEventService::new(self.name.clone(), self.url.clone(), head_tx)
            .with_reconnect_delay(self.reconnect_delay)
            .run(shutdown_token)
            .await
    }

    /// Get node syncing status.
    pub async fn sync_status(&self) -> Result<SyncStatus> {
        let url = self.endpoint("eth/v1/node/syncing")?;
        let response: DataResponse<SyncStatus> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get the current head slot as reported by the sync status.
    pub async fn current_slot(&self) -> Result<u64> {
        Ok(self.sync_status().await?.head_slot)
    }

    /// Get proposer duties for every slot in `epoch`.
    pub async fn proposer_duties(&self, epoch: u64) -> Result<Vec<ProposerDuty>> {
        let url = self.endpoint(&format!("eth/v1/validator/duties/proposer/{epoch}"))?;
        let response: DataResponse<Vec<ProposerDuty>> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get the latest block header.
    pub async fn header(&self) -> Result<HeaderInfo> {
        let url = self.endpoint("eth/v1/beacon/headers/head")?;
        let response: DataResponse<HeaderInfo> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get block header for a slot.
    pub async fn header_for_slot(&self, slot: u64) -> Result<HeaderInfo> {
        let url = self.endpoint(&format!("eth/v1/beacon/headers/{slot}"))?;
        let response: DataResponse<HeaderInfo> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get a block by id.
    pub async fn block(&self, block_id: BlockId) -> Result<Block> {
        let url = self.endpoint(&format!("eth/v2/beacon/blocks/{block_id}"))?;
        let response: DataResponse<Block> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get the block proposed at `slot`.
    pub async fn block_for_slot(&self, slot: u64) -> Result<Block> {
        self.block(BlockId::Slot(slot)).await
    }

    /// Publish a signed block. Returns the status code of the accepting response.
    pub async fn publish_block(&self, block: &SignedBeaconBlock) -> Result<StatusCode> {
        let url = self.endpoint("eth/v1/beacon/blocks")?;
        self.fetcher.fetch_status(Method::POST, url, Some(block)).await
    }

    /// Get genesis info.
    pub async fn genesis(&self) -> Result<Genesis> {
        let url = self.endpoint("eth/v1/beacon/genesis")?;
        let response: DataResponse<Genesis> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get chain spec parameters.
    pub async fn spec(&self) -> Result<ChainSpec> {
        let url = self.endpoint("eth/v1/config/spec")?;
        let response: DataResponse<ChainSpec> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get the fork schedule.
    pub async fn fork_schedule(&self) -> Result<Vec<Fork>> {
        let url = self.endpoint("eth/v1/config/fork_schedule")?;
        let response: DataResponse<Vec<Fork>> = self.fetcher.get(url).await?;
        Ok(response.data)
    }

    /// Get the randao mix of the state at `slot`.
    pub async fn randao(&self, slot: u64) -> Result<B256> {
        let url = self.endpoint(&format!("eth/v1/beacon/states/{slot}/randao"))?;
        let response: DataResponse<RandaoInfo> = self.fetcher.get(url).await?;
        Ok(response.data.randao)
    }

    /// Get the withdrawals of the state at `slot`.
    pub async fn withdrawals(&self, slot: u64) -> Result<Vec<Withdrawal>> {
        let url = self.endpoint(&format!("eth/v1/beacon/states/{slot}/withdrawals"))?;
        let response: DataResponse<WithdrawalsInfo> = self.fetcher.get(url).await?;
        Ok(response.data.withdrawals)
    }

    /// Fetch all active and pending validators as of `head_slot`, keyed by normalized pubkey.
    pub async fn fetch_validators(&self, head_slot: u64) -> Result<ValidatorSnapshot> {
        let mut url = self.endpoint(&format!("eth/v1/beacon/states/{head_slot}/validators"))?;
        url.query_pairs_mut()
            .append_pair("status", SNAPSHOT_VALIDATOR_STATUSES);

        let response: DataResponse<Vec<ValidatorEntry>> = self
            .fetcher
            .get_with_timeout(url, self.validators_timeout)
            .await?;
        let snapshot = build_validator_snapshot(response.data);
        debug!(
            name = %self.name,
            slot = head_slot,
            validators = snapshot.len(),
            "Fetched validator set"
        );
        Ok(snapshot)
    }
}

/// Key validator entries by their normalized pubkey. Later duplicates replace earlier ones.
pub fn build_validator_snapshot(
    entries: impl IntoIterator<Item = ValidatorEntry>,
) -> ValidatorSnapshot {
    entries
        .into_iter()
        .map(|entry| (entry.pubkey().clone(), entry))
        .collect()
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
