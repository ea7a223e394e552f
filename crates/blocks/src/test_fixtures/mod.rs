//! In-memory gateway and fixture builders shared by the crate's tests.

use std::collections::HashMap;

use primitive_types::H256;
use serde_json::{Value, json};

use crate::decode::{ArgValue, RawCall};
use crate::fee::{
    EXTRINSIC_BASE_WEIGHT, NEXT_FEE_MULTIPLIER, TRANSACTION_BYTE_FEE, WEIGHT_TO_FEE,
};
use crate::gateway::{EventRecord, GatewayError, Header, RawBlock, RawExtrinsic, RpcGateway};
use crate::types::{EventPhase, SignatureInfo};

/// An in-memory `RpcGateway` over fixture data. Unknown hashes report a
/// gateway failure, matching a node that cannot serve the request.
#[derive(Debug, Default)]
pub struct MockGateway {
    headers: HashMap<H256, Header>,
    blocks: HashMap<H256, RawBlock>,
    block_hashes: HashMap<u64, H256>,
    finalized_head: Option<H256>,
    events: HashMap<H256, Vec<EventRecord>>,
    constants: HashMap<&'static str, Value>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical block: header, body, and the number-to-hash
    /// mapping the canonical chain records.
    pub fn insert_block(&mut self, header: Header, extrinsics: Vec<Option<RawExtrinsic>>) {
        self.block_hashes.insert(header.number, header.hash);
        self.blocks.insert(
            header.hash,
            RawBlock {
                header: header.clone(),
                extrinsics,
            },
        );
        self.headers.insert(header.hash, header);
    }

    /// Register a header reachable by hash but absent from the canonical
    /// number-to-hash mapping (a forked/pruned branch).
    pub fn insert_header_only(&mut self, header: Header) {
        self.headers.insert(header.hash, header);
    }

    /// Register a block body for an already-registered header.
    pub fn insert_block_body(&mut self, hash: H256, extrinsics: Vec<Option<RawExtrinsic>>) {
        let header = self
            .headers
            .get(&hash)
            .expect("insert_header_only before insert_block_body")
            .clone();
        self.blocks.insert(hash, RawBlock { header, extrinsics });
    }

    pub fn set_finalized_head(&mut self, hash: H256) {
        self.finalized_head = Some(hash);
    }

    pub fn insert_events(&mut self, hash: H256, events: Vec<EventRecord>) {
        self.events.insert(hash, events);
    }

    pub fn insert_constant(&mut self, name: &'static str, value: Value) {
        self.constants.insert(name, value);
    }

    pub fn remove_constant(&mut self, name: &str) {
        self.constants.remove(name);
    }

    /// The Polkadot fee parameters around runtime 16 that produced the known
    /// fee vectors: per-byte fee 1_000_000, base weight 125_000_000, a single
    /// degree-1 coefficient of 0.08, multiplier 1e-9.
    pub fn insert_polkadot_fee_constants(&mut self) {
        self.insert_constant(TRANSACTION_BYTE_FEE, json!("1000000"));
        self.insert_constant(EXTRINSIC_BASE_WEIGHT, json!("125000000"));
        self.insert_constant(
            WEIGHT_TO_FEE,
            json!([
                { "coeffInteger": "0", "coeffFrac": 80000000, "negative": false, "degree": 1 }
            ]),
        );
        self.insert_constant(NEXT_FEE_MULTIPLIER, json!("1000000000"));
    }
}

impl RpcGateway for MockGateway {
    async fn get_block(&self, hash: H256) -> Result<RawBlock, GatewayError> {
        self.blocks
            .get(&hash)
            .cloned()
            .ok_or_else(|| GatewayError::MissingValue(format!("block {hash:?}")))
    }

    async fn get_header(&self, hash: H256) -> Result<Header, GatewayError> {
        self.headers
            .get(&hash)
            .cloned()
            .ok_or_else(|| GatewayError::MissingValue(format!("header {hash:?}")))
    }

    async fn get_block_hash(&self, number: u64) -> Result<Option<H256>, GatewayError> {
        Ok(self.block_hashes.get(&number).copied())
    }

    async fn get_finalized_head(&self) -> Result<H256, GatewayError> {
        self.finalized_head
            .ok_or_else(|| GatewayError::MissingValue("finalized head".to_string()))
    }

    async fn get_events(&self, hash: H256) -> Result<Vec<EventRecord>, GatewayError> {
        Ok(self.events.get(&hash).cloned().unwrap_or_default())
    }

    async fn get_runtime_constant(
        &self,
        name: &str,
        _at: H256,
    ) -> Result<Option<Value>, GatewayError> {
        Ok(self.constants.get(name).cloned())
    }
}

// ================================================================================================
// Fixture builders
// ================================================================================================

pub fn hash(byte: u8) -> H256 {
    H256::repeat_byte(byte)
}

pub fn header(number: u64, hash: H256, parent_hash: H256) -> Header {
    Header {
        number,
        hash,
        parent_hash,
    }
}

/// `balances.transferKeepAlive(dest, value)` with the mixed-case argument
/// names the node reports before decoding.
pub fn transfer_call() -> RawCall {
    RawCall {
        pallet: "balances".to_string(),
        method: "transferKeepAlive".to_string(),
        args: vec![
            (
                "dest".to_string(),
                ArgValue::Plain(json!("5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty")),
            ),
            ("value".to_string(), ArgValue::Plain(json!("100000000000"))),
        ],
    }
}

/// `utility.batch(calls)` wrapping the given calls in order.
pub fn batch_call(calls: Vec<RawCall>) -> RawCall {
    RawCall {
        pallet: "utility".to_string(),
        method: "batch".to_string(),
        args: vec![(
            "calls".to_string(),
            ArgValue::Calls(calls.into_iter().map(Some).collect()),
        )],
    }
}

/// `depth` batches wrapping a single transfer: batch(batch(...(transfer))).
pub fn nested_batch(depth: usize) -> RawCall {
    let mut call = transfer_call();
    for _ in 0..depth {
        call = batch_call(vec![call]);
    }
    call
}

pub fn signed_extrinsic(call: RawCall, encoded_length: u64) -> RawExtrinsic {
    RawExtrinsic {
        call,
        signature: Some(SignatureInfo {
            signature: format!("0x{}", "9a".repeat(64)),
            signer: "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5".to_string(),
        }),
        encoded_length,
        docs: Some("Same as the transfer call, but with a check that the transfer will not kill the origin account.".to_string()),
    }
}

pub fn unsigned_extrinsic(call: RawCall) -> RawExtrinsic {
    RawExtrinsic {
        call,
        signature: None,
        encoded_length: 10,
        docs: None,
    }
}

/// `System.ExtrinsicSuccess` for the extrinsic at `index`, carrying the
/// post-dispatch weight in its DispatchInfo.
pub fn success_event(index: u32, ref_time: u128) -> EventRecord {
    EventRecord {
        phase: EventPhase::ApplyExtrinsic(index),
        pallet: "system".to_string(),
        method: "ExtrinsicSuccess".to_string(),
        data: vec![json!({
            "weight": { "refTime": ref_time.to_string(), "proofSize": "0" },
            "class": "Normal",
            "paysFee": "Yes"
        })],
        docs: Some("An extrinsic completed successfully.".to_string()),
    }
}

/// `System.ExtrinsicFailed` for the extrinsic at `index`; its DispatchInfo
/// reports that no fee is paid.
pub fn failed_event(index: u32, ref_time: u128) -> EventRecord {
    EventRecord {
        phase: EventPhase::ApplyExtrinsic(index),
        pallet: "system".to_string(),
        method: "ExtrinsicFailed".to_string(),
        data: vec![
            json!({ "module": { "index": "5", "error": "0x02000000" } }),
            json!({
                "weight": { "refTime": ref_time.to_string(), "proofSize": "0" },
                "class": "Normal",
                "paysFee": "No"
            }),
        ],
        docs: Some("An extrinsic failed.".to_string()),
    }
}

/// `Balances.Transfer` emitted while applying the extrinsic at `index`.
pub fn transfer_event(index: u32) -> EventRecord {
    EventRecord {
        phase: EventPhase::ApplyExtrinsic(index),
        pallet: "balances".to_string(),
        method: "Transfer".to_string(),
        data: vec![
            json!("15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5"),
            json!("5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"),
            json!("100000000000"),
        ],
        docs: Some("Transfer succeeded.".to_string()),
    }
}
