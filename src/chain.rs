// =============================================================================
// CLAIM LEDGER — chain.rs
// =============================================================================
//
// Hash-linked audit chain:
//   1. BlockType          — one variant per state-changing registry operation
//   2. Block              — index, timestamp, typed payload, hash, previous_hash
//   3. HashChain          — append-only sequence with integrity verification
//   4. ChainVerification  — result of a full recomputation pass
//
// hash = SHA-256(canonical JSON of {index, timestamp, type, payload, previous_hash})
// serde_json keeps object keys sorted, so the encoding is stable.
// =============================================================================

use crate::constants::{GENESIS_MESSAGE, GENESIS_PREVIOUS_HASH};
use crate::error::{LedgerError, LedgerResult};
use crate::model::unix_now_millis;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// -----------------------------------------------------------------------------
// BlockType
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Genesis,
    UserRegistered,
    IdentityCreated,
    PolicyCreated,
    ClaimSubmitted,
    ClaimApproved,
    ClaimRejected,
    FlTrainingRound,
}

impl BlockType {
    pub const ALL: [BlockType; 8] = [
        BlockType::Genesis,
        BlockType::UserRegistered,
        BlockType::IdentityCreated,
        BlockType::PolicyCreated,
        BlockType::ClaimSubmitted,
        BlockType::ClaimApproved,
        BlockType::ClaimRejected,
        BlockType::FlTrainingRound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Genesis => "GENESIS",
            BlockType::UserRegistered => "USER_REGISTERED",
            BlockType::IdentityCreated => "IDENTITY_CREATED",
            BlockType::PolicyCreated => "POLICY_CREATED",
            BlockType::ClaimSubmitted => "CLAIM_SUBMITTED",
            BlockType::ClaimApproved => "CLAIM_APPROVED",
            BlockType::ClaimRejected => "CLAIM_REJECTED",
            BlockType::FlTrainingRound => "FL_TRAINING_ROUND",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LedgerError::invalid_argument("block type", s.to_string()))
    }
}

// -----------------------------------------------------------------------------
// Block
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix ms
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub payload: Value,
    pub hash: String,
    pub previous_hash: String,
}

impl Block {
    fn seal(index: u64, timestamp: i64, block_type: BlockType, payload: Value, previous_hash: String) -> Self {
        let hash = compute_hash(index, timestamp, block_type, &payload, &previous_hash);
        Block { index, timestamp, block_type, payload, hash, previous_hash }
    }

    /// Hash recomputed from the stored fields.
    pub fn recompute_hash(&self) -> String {
        compute_hash(self.index, self.timestamp, self.block_type, &self.payload, &self.previous_hash)
    }
}

pub fn compute_hash(
    index: u64,
    timestamp: i64,
    block_type: BlockType,
    payload: &Value,
    previous_hash: &str,
) -> String {
    let canonical = json!({
        "index": index,
        "timestamp": timestamp,
        "type": block_type.as_str(),
        "payload": payload,
        "previous_hash": previous_hash,
    });
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

// -----------------------------------------------------------------------------
// ChainVerification
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub blocks_checked: u64,
    pub first_invalid: Option<u64>,
    pub reason: Option<String>,
}

impl ChainVerification {
    fn ok(blocks_checked: u64) -> Self {
        ChainVerification { valid: true, blocks_checked, first_invalid: None, reason: None }
    }

    fn failed(index: u64, reason: String) -> Self {
        ChainVerification { valid: false, blocks_checked: index + 1, first_invalid: Some(index), reason: Some(reason) }
    }

    pub fn into_result(self) -> LedgerResult<u64> {
        match self.first_invalid {
            None => Ok(self.blocks_checked),
            Some(index) => Err(LedgerError::ChainCorrupted {
                index,
                reason: self.reason.unwrap_or_default(),
            }),
        }
    }
}

impl fmt::Display for ChainVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first_invalid, &self.reason) {
            (Some(index), Some(reason)) => {
                write!(f, "INVALID at block {} ({})", index, reason)
            }
            _ => write!(f, "VALID ({} blocks)", self.blocks_checked),
        }
    }
}

// -----------------------------------------------------------------------------
// HashChain
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashChain {
    blocks: Vec<Block>,
}

impl HashChain {
    /// New chain holding only the genesis block. `extra` is merged into the
    /// genesis payload next to the fixed message.
    pub fn new(extra: Value) -> Self {
        let mut payload = json!({ "message": GENESIS_MESSAGE });
        if let (Some(target), Value::Object(fields)) = (payload.as_object_mut(), extra) {
            target.extend(fields);
        }
        let genesis = Block::seal(
            0,
            unix_now_millis(),
            BlockType::Genesis,
            payload,
            GENESIS_PREVIOUS_HASH.to_string(),
        );
        HashChain { blocks: vec![genesis] }
    }

    /// Rebuild a chain from stored blocks, rejecting it on the first divergence.
    pub fn from_blocks(blocks: Vec<Block>) -> LedgerResult<Self> {
        if blocks.is_empty() {
            return Err(LedgerError::ChainCorrupted { index: 0, reason: "missing genesis block".into() });
        }
        let chain = HashChain { blocks };
        chain.verify().into_result()?;
        Ok(chain)
    }

    /// Build the next block on top of the current head without appending it.
    pub fn prepare(&self, block_type: BlockType, payload: Value) -> Block {
        let head = self.head();
        let timestamp = unix_now_millis().max(head.timestamp);
        Block::seal(head.index + 1, timestamp, block_type, payload, head.hash.clone())
    }

    /// Append a block previously produced by [`HashChain::prepare`].
    pub fn push(&mut self, block: Block) -> LedgerResult<&Block> {
        let head = self.head();
        if block.index != head.index + 1 || block.previous_hash != head.hash {
            return Err(LedgerError::InvalidState {
                reason: format!("block {} does not extend head {}", block.index, head.index),
            });
        }
        self.blocks.push(block);
        Ok(self.head())
    }

    pub fn append(&mut self, block_type: BlockType, payload: Value) -> LedgerResult<&Block> {
        let block = self.prepare(block_type, payload);
        self.push(block)
    }

    /// Recompute every hash and check every link. Stops at the first failure.
    pub fn verify(&self) -> ChainVerification {
        for (position, block) in self.blocks.iter().enumerate() {
            let position = position as u64;
            if block.index != position {
                return ChainVerification::failed(
                    position,
                    format!("index {} stored at position {}", block.index, position),
                );
            }
            if block.recompute_hash() != block.hash {
                return ChainVerification::failed(position, "hash mismatch".into());
            }
            let expected_previous = match position {
                0 => GENESIS_PREVIOUS_HASH,
                _ => self.blocks[position as usize - 1].hash.as_str(),
            };
            if block.previous_hash != expected_previous {
                return ChainVerification::failed(position, "previous_hash does not link".into());
            }
            if position == 0 && block.block_type != BlockType::Genesis {
                return ChainVerification::failed(0, "first block is not GENESIS".into());
            }
        }
        ChainVerification::ok(self.blocks.len() as u64)
    }

    pub fn head(&self) -> &Block {
        // never empty: constructors guarantee a genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(index).ok()?)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_by_type(&self, block_type: BlockType) -> Vec<&Block> {
        self.blocks.iter().filter(|b| b.block_type == block_type).collect()
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

// =============================================================================
// TESTS
// =============================================================================
