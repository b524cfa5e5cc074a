//! Beacon node API types.
//!
//! These are read-only projections of the upstream JSON. Numeric fields are transmitted as decimal
//! strings by beacon nodes and are parsed with `serde_utils::quoted_u64`.

use std::{collections::HashMap, fmt, str::FromStr};

use alloy_primitives::{Address, B256, Bloom, Bytes, FixedBytes};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fork version.
pub type Version = FixedBytes<4>;

/// Every beacon API response wraps its payload in a `data` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Head event from the `head` SSE topic.
///
/// `{"slot":"123","block":"0x..","state":"0x..", ...}`; fields other than these three are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadEvent {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    #[serde(rename = "block")]
    pub block_root: String,
    #[serde(rename = "state")]
    pub state_root: String,
}

/// Node sync status from `/eth/v1/node/syncing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    #[serde(with = "serde_utils::quoted_u64")]
    pub head_slot: u64,
    pub is_syncing: bool,
    pub is_optimistic: Option<bool>,
}

/// Hex-encoded BLS public key, normalized to lower case with a `0x` prefix.
///
/// Used as the key of a [`ValidatorSnapshot`], so two spellings of the same key always collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PubkeyHex(String);

impl PubkeyHex {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        Self(format!("0x{}", hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PubkeyHex {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for PubkeyHex {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<PubkeyHex> for String {
    fn from(pubkey: PubkeyHex) -> Self {
        pubkey.0
    }
}

impl AsRef<str> for PubkeyHex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PubkeyHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of `/eth/v1/beacon/states/{state_id}/validators`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    /// Index of the validator in the registry.
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: u64,
    /// Current balance in gwei, kept as the decimal string the node sent.
    pub balance: String,
    pub status: String,
    pub validator: ValidatorData,
}

impl ValidatorEntry {
    pub fn pubkey(&self) -> &PubkeyHex {
        &self.validator.pubkey
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorData {
    pub pubkey: PubkeyHex,
}

/// Full validator set keyed by normalized public key. Rebuilt from scratch for every head slot.
pub type ValidatorSnapshot = HashMap<PubkeyHex, ValidatorEntry>;

/// Proposer assignment for a single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposerDuty {
    pub pubkey: PubkeyHex,
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
}

/// Payload of `/eth/v1/beacon/headers/{block_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub root: B256,
    pub header: SignedBlockHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlockHeader {
    pub message: BeaconBlockHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
    pub parent_root: B256,
    pub state_root: B256,
    pub body_root: B256,
}

/// Payload of `/eth/v2/beacon/blocks/{block_id}`.
///
/// The slot is not checked against the one requested; callers validate against their own
/// expectations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub message: BlockMessage,
}

impl Block {
    pub fn slot(&self) -> u64 {
        self.message.slot
    }

    pub fn execution_payload(&self) -> Option<&ExecutionPayload> {
        self.message.body.execution_payload.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMessage {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    pub body: BlockBody,
}

/// Block body. Only the execution payload is decoded; it is absent before the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    #[serde(default)]
    pub execution_payload: Option<ExecutionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayload {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub block_number: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    /// 256-bit decimal string, kept verbatim.
    pub base_fee_per_gas: String,
    pub block_hash: B256,
    pub transactions: Vec<Bytes>,
    /// Present from Capella onwards.
    #[serde(default)]
    pub withdrawals: Option<Vec<Withdrawal>>,
}

/// Block submitted through `POST /eth/v1/beacon/blocks`.
///
/// The body is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconBlock {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
    pub parent_root: B256,
    pub state_root: B256,
    pub body: serde_json::Value,
}

/// Payload of `/eth/v1/beacon/genesis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: B256,
    pub genesis_fork_version: Version,
}

/// Subset of `/eth/v1/config/spec` used by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ChainSpec {
    #[serde(with = "serde_utils::quoted_u64")]
    pub seconds_per_slot: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub slots_per_epoch: u64,
    pub deposit_contract_address: Option<Address>,
    pub deposit_network_id: Option<String>,
    pub domain_aggregate_and_proof: Option<String>,
    pub inactivity_penalty_quotient: Option<String>,
    pub inactivity_penalty_quotient_altair: Option<String>,
}

/// Entry of `/eth/v1/config/fork_schedule`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    pub previous_version: Version,
    pub current_version: Version,
    #[serde(with = "serde_utils::quoted_u64")]
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandaoInfo {
    pub randao: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalsInfo {
    pub withdrawals: Vec<Withdrawal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub validator_index: u64,
    pub address: Address,
    /// Amount in gwei.
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
}

/// Block identifier accepted by the block endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Head,
    Genesis,
    Finalized,
    Slot(u64),
    Root(B256),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Head => f.write_str("head"),
            BlockId::Genesis => f.write_str("genesis"),
            BlockId::Finalized => f.write_str("finalized"),
            BlockId::Slot(slot) => write!(f, "{slot}"),
            BlockId::Root(root) => write!(f, "{root}"),
        }
    }
}

impl FromStr for BlockId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "head" => Ok(BlockId::Head),
            "genesis" => Ok(BlockId::Genesis),
            "finalized" => Ok(BlockId::Finalized),
            _ if s.starts_with("0x") => s
                .parse::<B256>()
                .map(BlockId::Root)
                .map_err(|e| Error::Config(format!("invalid block root '{s}': {e}"))),
            _ => s
                .parse::<u64>()
                .map(BlockId::Slot)
                .map_err(|e| Error::Config(format!("invalid block id '{s}': {e}"))),
        }
    }
}

impl From<u64> for BlockId {
    fn from(slot: u64) -> Self {
        BlockId::Slot(slot)
    }
}
