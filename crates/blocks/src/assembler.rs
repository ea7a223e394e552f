// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Block assembly.
//!
//! One `fetch_block` call is an independent, stateless pipeline: resolve the
//! identifier, fetch the raw block / event set / fee constants (the
//! independent reads run concurrently), decode every extrinsic's call, pair
//! extrinsics with their events by index, annotate fees, and attach the
//! finality tag when asked to. Integrity failures (an undecodable extrinsic
//! slot, a malformed call) abort the whole fetch; a partially decoded block
//! is worse than an error.

use std::str::FromStr;

use primitive_types::H256;
use serde_json::Value;
use thiserror::Error;

use crate::decode::{MalformedCallError, decode_call};
use crate::fee::FeeModel;
use crate::finality::check_finality;
use crate::gateway::{EventRecord, GatewayError, Header, RpcGateway};
use crate::numeric::parse_u128;
use crate::types::{
    Block, ChainContext, Event, EventPhase, Extrinsic, ExtrinsicFee, MethodInfo, OnFinalize,
    OnInitialize,
};

// ================================================================================================
// Block Identifiers
// ================================================================================================

/// An opaque block identifier: a height or a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Hash(H256),
    Number(u64),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid block parameter: {0}")]
pub struct BlockIdParseError(pub String);

impl FromStr for BlockId {
    type Err = BlockIdParseError;

    /// A `0x`-prefixed 32-byte hex string is a hash; a decimal string is a
    /// height; anything else is invalid.
    fn from_str(param: &str) -> Result<Self, Self::Err> {
        if let Some(hex_digits) = param.strip_prefix("0x") {
            if hex_digits.len() != 64 {
                return Err(BlockIdParseError(param.to_string()));
            }
            let bytes =
                hex::decode(hex_digits).map_err(|_| BlockIdParseError(param.to_string()))?;
            Ok(BlockId::Hash(H256::from_slice(&bytes)))
        } else {
            param
                .parse::<u64>()
                .map(BlockId::Number)
                .map_err(|_| BlockIdParseError(param.to_string()))
        }
    }
}

// ================================================================================================
// Options & Errors
// ================================================================================================

/// Flags recognized by `fetch_block`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchBlockOptions {
    /// Include human-readable event documentation
    pub event_docs: bool,
    /// Include human-readable call documentation
    pub extrinsic_docs: bool,
    /// Attach a computed finality tag
    pub check_finalized: bool,
    /// Re-resolve the current finalized head rather than reuse a known value
    pub query_finalized_head: bool,
    /// Force the finality field to be absent regardless of other flags
    pub omit_finalized_tag: bool,
}

/// A raw extrinsic slot was structurally absent: data integrity, not user
/// error, and fatal to the whole fetch.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("extrinsic slot {index} is structurally absent from the raw block")]
pub struct MalformedExtrinsicError {
    pub index: usize,
}

#[derive(Debug, Error)]
pub enum BlockFetchError {
    #[error("Invalid block parameter")]
    InvalidBlockParam(#[from] BlockIdParseError),

    #[error("Block not found: {0}")]
    NotFound(String),

    #[error("Failed to fetch from node RPC")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    MalformedCall(#[from] MalformedCallError),

    #[error(transparent)]
    MalformedExtrinsic(#[from] MalformedExtrinsicError),
}

// ================================================================================================
// Event categorization
// ================================================================================================

/// Outcome of one extrinsic, extracted from its System events.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtrinsicOutcome {
    /// Whether a System.ExtrinsicSuccess event was found
    pub success: bool,
    /// Whether the extrinsic pays a fee, from DispatchInfo
    pub pays_fee: Option<bool>,
    /// Actual post-dispatch weight, from DispatchInfo; the fee formula input
    pub actual_weight: Option<u128>,
}

/// Extract `paysFee` from DispatchInfo in event data.
///
/// For ExtrinsicSuccess: event_data = [DispatchInfo]
/// For ExtrinsicFailed: event_data = [DispatchError, DispatchInfo]
///
/// paysFee arrives as a bool, a "Yes"/"No" string, or an enum object with a
/// "name" field, depending on runtime version.
fn extract_pays_fee(event_data: &[Value], is_success: bool) -> Option<bool> {
    let dispatch_info_index = if is_success { 0 } else { 1 };
    let pays_fee = event_data.get(dispatch_info_index)?.get("paysFee")?;

    match pays_fee {
        Value::Bool(flag) => Some(*flag),
        Value::String(name) => match name.as_str() {
            "Yes" => Some(true),
            "No" => Some(false),
            other => {
                tracing::debug!("Unknown paysFee value: {}", other);
                None
            }
        },
        Value::Object(object) => match object.get("name").and_then(Value::as_str) {
            Some("Yes") => Some(true),
            Some("No") => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Extract the actual weight from DispatchInfo in event data.
///
/// Weight is either the modern `{ refTime, proofSize }` object or a legacy
/// single value; numbers, decimal strings and hex strings all occur.
fn extract_actual_weight(event_data: &[Value], is_success: bool) -> Option<u128> {
    let dispatch_info_index = if is_success { 0 } else { 1 };
    let weight = event_data.get(dispatch_info_index)?.get("weight")?;

    match weight {
        Value::Object(object) => object
            .get("refTime")
            .or_else(|| object.get("ref_time"))
            .and_then(parse_u128),
        other => parse_u128(other),
    }
}

/// Categorize an event set by phase into onInitialize, per-extrinsic and
/// onFinalize groups, extracting each extrinsic's outcome along the way.
fn categorize_events(
    records: Vec<EventRecord>,
    num_extrinsics: usize,
    include_docs: bool,
) -> (OnInitialize, Vec<Vec<Event>>, OnFinalize, Vec<ExtrinsicOutcome>) {
    let mut on_initialize_events = Vec::new();
    let mut on_finalize_events = Vec::new();
    let mut per_extrinsic_events: Vec<Vec<Event>> = vec![Vec::new(); num_extrinsics];
    let mut outcomes: Vec<ExtrinsicOutcome> = vec![ExtrinsicOutcome::default(); num_extrinsics];

    for record in records {
        let is_system = record.pallet.eq_ignore_ascii_case("system");
        let is_success = is_system && record.method == "ExtrinsicSuccess";
        let is_failed = is_system && record.method == "ExtrinsicFailed";

        if let EventPhase::ApplyExtrinsic(index) = record.phase
            && let Some(outcome) = outcomes.get_mut(index as usize)
            && (is_success || is_failed)
        {
            outcome.success = is_success;
            if let Some(pays_fee) = extract_pays_fee(&record.data, is_success) {
                outcome.pays_fee = Some(pays_fee);
            }
            if let Some(weight) = extract_actual_weight(&record.data, is_success) {
                outcome.actual_weight = Some(weight);
            }
        }

        let event = Event {
            method: MethodInfo {
                pallet: record.pallet,
                method: record.method,
            },
            data: record.data,
            docs: if include_docs { record.docs } else { None },
        };

        match record.phase {
            EventPhase::Initialization => on_initialize_events.push(event),
            EventPhase::ApplyExtrinsic(index) => {
                if let Some(events) = per_extrinsic_events.get_mut(index as usize) {
                    events.push(event);
                } else {
                    tracing::warn!(
                        "Event has ApplyExtrinsic phase with index {} but only {} extrinsics exist",
                        index,
                        num_extrinsics
                    );
                }
            }
            EventPhase::Finalization => on_finalize_events.push(event),
        }
    }

    (
        OnInitialize {
            events: on_initialize_events,
        },
        per_extrinsic_events,
        OnFinalize {
            events: on_finalize_events,
        },
        outcomes,
    )
}

// ================================================================================================
// Block Assembler
// ================================================================================================

/// Assembles decoded, fee-annotated, finality-aware block views.
///
/// Holds no mutable state; concurrent `fetch_block` calls for different
/// blocks are independent. The fee model is rebuilt per parent block rather
/// than cached, because constants legitimately differ across chain history.
pub struct BlockAssembler<G> {
    gateway: G,
    chain: ChainContext,
    /// Last-known finalized head, reused unless queryFinalizedHead is set.
    known_finalized_head: Option<H256>,
}

impl<G: RpcGateway> BlockAssembler<G> {
    pub fn new(gateway: G, chain: ChainContext) -> Self {
        Self {
            gateway,
            chain,
            known_finalized_head: None,
        }
    }

    /// Seed the assembler with a known finalized head (e.g. from the
    /// sidecar's head subscription).
    pub fn with_finalized_head(mut self, hash: H256) -> Self {
        self.known_finalized_head = Some(hash);
        self
    }

    /// Fetch and assemble one block.
    pub async fn fetch_block(
        &self,
        id: BlockId,
        options: &FetchBlockOptions,
    ) -> Result<Block, BlockFetchError> {
        let hash = match id {
            BlockId::Hash(hash) => hash,
            BlockId::Number(number) => self
                .gateway
                .get_block_hash(number)
                .await
                .map_err(BlockFetchError::Gateway)?
                .ok_or_else(|| {
                    BlockFetchError::NotFound(format!("Block at height {number} not found"))
                })?,
        };

        let header = self.gateway.get_header(hash).await.map_err(BlockFetchError::Gateway)?;

        // Independent reads: the raw block, its event set, and the fee
        // constants at the parent block.
        let (raw_block, events, fee_model) = tokio::join!(
            self.gateway.get_block(hash),
            self.gateway.get_events(hash),
            FeeModel::build(&self.gateway, &self.chain, header.parent_hash),
        );
        let raw_block = raw_block?;
        let events = events?;
        let fee_model = fee_model?;

        let (on_initialize, per_extrinsic_events, on_finalize, outcomes) =
            categorize_events(events, raw_block.extrinsics.len(), options.event_docs);

        let mut extrinsics = Vec::with_capacity(raw_block.extrinsics.len());
        for (index, ((slot, events_for_extrinsic), outcome)) in raw_block
            .extrinsics
            .into_iter()
            .zip(per_extrinsic_events)
            .zip(outcomes)
            .enumerate()
        {
            let raw = slot.ok_or(MalformedExtrinsicError { index })?;
            let call = decode_call(&raw.call)?;

            // Fee computation is best-effort and only applicable to signed,
            // fee-paying extrinsics that carry weight information.
            let fee = if raw.signature.is_some() && outcome.pays_fee != Some(false) {
                outcome.actual_weight.map(|weight| {
                    match fee_model.partial_fee(weight, raw.encoded_length) {
                        Ok(partial_fee) => ExtrinsicFee::Computed(partial_fee),
                        Err(_) => ExtrinsicFee::NotSupported,
                    }
                })
            } else {
                None
            };

            extrinsics.push(Extrinsic {
                call,
                signature: raw.signature,
                fee,
                events: events_for_extrinsic,
                success: outcome.success,
                pays_fee: outcome.pays_fee,
                docs: if options.extrinsic_docs { raw.docs } else { None },
            });
        }

        let finalized = if options.omit_finalized_tag {
            None
        } else if options.check_finalized {
            Some(self.resolve_finality(&header, hash, options).await?)
        } else {
            None
        };

        Ok(Block {
            number: header.number,
            hash,
            parent_hash: header.parent_hash,
            on_initialize,
            extrinsics,
            on_finalize,
            finalized,
        })
    }

    async fn resolve_finality(
        &self,
        header: &Header,
        hash: H256,
        options: &FetchBlockOptions,
    ) -> Result<bool, BlockFetchError> {
        let finalized_head = match self.known_finalized_head {
            Some(head) if !options.query_finalized_head => head,
            _ => self.gateway.get_finalized_head().await?,
        };
        let head_header = self.gateway.get_header(finalized_head).await?;
        let below_finalized_head = header.number <= head_header.number;

        let verdict = check_finality(
            &self.gateway,
            header.number,
            hash,
            finalized_head,
            below_finalized_head,
        )
        .await?;

        Ok(verdict.finalized)
    }
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{
        MockGateway, batch_call, failed_event, hash, header, signed_extrinsic, success_event,
        transfer_call, transfer_event, unsigned_extrinsic,
    };
    use serde_json::json;

    const BLOCK_NUMBER: u64 = 789629;

    fn block_hash() -> H256 {
        hash(0xb1)
    }

    fn parent_hash() -> H256 {
        hash(0xb0)
    }

    /// A chain with one canonical block at 789629 holding an unsigned
    /// timestamp inherent and a signed transfer, plus realistic fee
    /// constants at the parent.
    fn fixture_gateway() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway.insert_block(
            header(BLOCK_NUMBER, block_hash(), parent_hash()),
            vec![
                Some(unsigned_extrinsic(transfer_call_timestamp())),
                Some(signed_extrinsic(transfer_call(), 534)),
            ],
        );
        gateway.insert_events(
            block_hash(),
            vec![
                success_event(0, 159_111_000),
                transfer_event(1),
                success_event(1, 399_480_000),
            ],
        );
        gateway.insert_header_only(header(BLOCK_NUMBER - 1, parent_hash(), hash(0xaf)));
        gateway.set_finalized_head(block_hash());
        gateway.insert_polkadot_fee_constants();
        gateway
    }

    fn transfer_call_timestamp() -> crate::decode::RawCall {
        crate::decode::RawCall {
            pallet: "timestamp".to_string(),
            method: "set".to_string(),
            args: vec![(
                "now".to_string(),
                crate::decode::ArgValue::Plain(json!("1588085034000")),
            )],
        }
    }

    fn assembler(gateway: MockGateway) -> BlockAssembler<MockGateway> {
        BlockAssembler::new(gateway, ChainContext::new("polkadot", 16))
    }

    #[test]
    fn test_block_id_parsing() {
        assert_eq!("789629".parse::<BlockId>(), Ok(BlockId::Number(789629)));

        let hash_param = format!("0x{}", "ab".repeat(32));
        assert_eq!(
            hash_param.parse::<BlockId>(),
            Ok(BlockId::Hash(H256::repeat_byte(0xab)))
        );

        assert!("0xabcd".parse::<BlockId>().is_err());
        assert!("-1".parse::<BlockId>().is_err());
        assert!("latest".parse::<BlockId>().is_err());
    }

    #[tokio::test]
    async fn test_fetch_block_assembles_extrinsics_in_order() {
        let block = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();

        assert_eq!(block.number, BLOCK_NUMBER);
        assert_eq!(block.hash, block_hash());
        assert_eq!(block.parent_hash, parent_hash());
        assert_eq!(block.extrinsics.len(), 2);
        assert_eq!(block.extrinsics[0].call.method.pallet, "timestamp");
        assert_eq!(block.extrinsics[1].call.method.pallet, "balances");
        // No finality tag unless requested
        assert_eq!(block.finalized, None);
    }

    #[tokio::test]
    async fn test_fetch_block_pairs_events_by_extrinsic_index() {
        let block = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();

        assert_eq!(block.extrinsics[0].events.len(), 1);
        assert_eq!(block.extrinsics[1].events.len(), 2);
        assert_eq!(
            block.extrinsics[1].events[0].method.method,
            "Transfer".to_string()
        );
        assert!(block.extrinsics[0].success);
        assert!(block.extrinsics[1].success);
    }

    #[tokio::test]
    async fn test_fetch_block_computes_partial_fee_for_signed_extrinsic() {
        let block = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();

        // Inherent: fee computation inapplicable, field absent
        assert_eq!(block.extrinsics[0].fee, None);
        // Signed transfer: weight 399_480_000 at length 534
        assert_eq!(
            block.extrinsics[1].fee,
            Some(ExtrinsicFee::Computed(544_000_000))
        );
    }

    #[tokio::test]
    async fn test_fetch_block_fee_degrades_without_aborting() {
        let mut gateway = fixture_gateway();
        gateway.remove_constant(crate::fee::TRANSACTION_BYTE_FEE);

        let block = assembler(gateway)
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();

        // The fetch itself succeeds; the signed extrinsic records the
        // explicit not-supported marker instead.
        assert_eq!(block.extrinsics[1].fee, Some(ExtrinsicFee::NotSupported));
        assert_eq!(block.extrinsics[0].fee, None);
    }

    #[tokio::test]
    async fn test_fetch_block_skips_fee_when_pays_fee_is_no() {
        let mut gateway = MockGateway::new();
        gateway.insert_block(
            header(BLOCK_NUMBER, block_hash(), parent_hash()),
            vec![Some(signed_extrinsic(transfer_call(), 534))],
        );
        gateway.insert_events(
            block_hash(),
            vec![failed_event(0, 399_480_000)],
        );
        gateway.insert_polkadot_fee_constants();

        let block = assembler(gateway)
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();

        assert!(!block.extrinsics[0].success);
        assert_eq!(block.extrinsics[0].pays_fee, Some(false));
        assert_eq!(block.extrinsics[0].fee, None);
    }

    #[tokio::test]
    async fn test_fetch_block_aborts_on_absent_extrinsic_slot() {
        let mut gateway = MockGateway::new();
        gateway.insert_block(
            header(BLOCK_NUMBER, block_hash(), parent_hash()),
            vec![Some(signed_extrinsic(transfer_call(), 534)), None],
        );
        gateway.insert_polkadot_fee_constants();

        let result = assembler(gateway)
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(BlockFetchError::MalformedExtrinsic(MalformedExtrinsicError { index: 1 }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_block_aborts_on_malformed_call() {
        let mut gateway = MockGateway::new();
        let broken = crate::decode::RawCall {
            pallet: "utility".to_string(),
            method: "batch".to_string(),
            args: vec![("calls".to_string(), crate::decode::ArgValue::Calls(vec![None]))],
        };
        gateway.insert_block(
            header(BLOCK_NUMBER, block_hash(), parent_hash()),
            vec![Some(signed_extrinsic(broken, 534))],
        );
        gateway.insert_polkadot_fee_constants();

        let result = assembler(gateway)
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await;

        assert!(matches!(result, Err(BlockFetchError::MalformedCall(_))));
    }

    #[tokio::test]
    async fn test_fetch_block_not_found_by_number() {
        let result = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(1), &FetchBlockOptions::default())
            .await;

        assert!(matches!(result, Err(BlockFetchError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_block_surfaces_gateway_failure() {
        // Unknown hash: the gateway reports failure and the assembler
        // surfaces it rather than retrying.
        let result = assembler(fixture_gateway())
            .fetch_block(BlockId::Hash(hash(0xee)), &FetchBlockOptions::default())
            .await;

        assert!(matches!(result, Err(BlockFetchError::Gateway(_))));
    }

    #[tokio::test]
    async fn test_check_finalized_attaches_tag() {
        let options = FetchBlockOptions {
            check_finalized: true,
            ..Default::default()
        };

        let block = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &options)
            .await
            .unwrap();

        assert_eq!(block.finalized, Some(true));
    }

    #[tokio::test]
    async fn test_forked_block_is_not_finalized() {
        let mut gateway = fixture_gateway();
        // A sibling of the canonical block at the same height, reachable by
        // hash but superseded on the canonical chain.
        let fork = hash(0xdd);
        gateway.insert_header_only(header(BLOCK_NUMBER, fork, parent_hash()));
        gateway.insert_block_body(fork, vec![]);

        let options = FetchBlockOptions {
            check_finalized: true,
            ..Default::default()
        };

        let block = assembler(gateway)
            .fetch_block(BlockId::Hash(fork), &options)
            .await
            .unwrap();

        assert_eq!(block.finalized, Some(false));
    }

    #[tokio::test]
    async fn test_omit_finalized_tag_wins_over_check_finalized() {
        let options = FetchBlockOptions {
            check_finalized: true,
            omit_finalized_tag: true,
            ..Default::default()
        };

        let block = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &options)
            .await
            .unwrap();

        assert_eq!(block.finalized, None);
    }

    #[tokio::test]
    async fn test_known_finalized_head_is_reused_unless_requeried() {
        let gateway = fixture_gateway();
        // Seed a stale known head below the queried block; without
        // re-resolution the block counts as not yet finalized.
        let stale_head = parent_hash();
        let assembler = BlockAssembler::new(gateway, ChainContext::new("polkadot", 16))
            .with_finalized_head(stale_head);

        let options = FetchBlockOptions {
            check_finalized: true,
            ..Default::default()
        };
        let block = assembler
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &options)
            .await
            .unwrap();
        assert_eq!(block.finalized, Some(false));

        // queryFinalizedHead re-resolves the head and the tag flips.
        let options = FetchBlockOptions {
            check_finalized: true,
            query_finalized_head: true,
            ..Default::default()
        };
        let block = assembler
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &options)
            .await
            .unwrap();
        assert_eq!(block.finalized, Some(true));
    }

    #[tokio::test]
    async fn test_docs_are_stripped_unless_requested() {
        let block = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();
        assert!(block.extrinsics[1].docs.is_none());
        assert!(block.extrinsics[1].events.iter().all(|e| e.docs.is_none()));

        let options = FetchBlockOptions {
            event_docs: true,
            extrinsic_docs: true,
            ..Default::default()
        };
        let block = assembler(fixture_gateway())
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &options)
            .await
            .unwrap();
        assert!(block.extrinsics[1].docs.is_some());
        assert!(block.extrinsics[1].events.iter().any(|e| e.docs.is_some()));
    }

    #[tokio::test]
    async fn test_nested_batch_decodes_inside_block() {
        let mut gateway = MockGateway::new();
        gateway.insert_block(
            header(BLOCK_NUMBER, block_hash(), parent_hash()),
            vec![Some(signed_extrinsic(
                batch_call(vec![transfer_call(), transfer_call()]),
                1247,
            ))],
        );
        gateway.insert_polkadot_fee_constants();

        let block = assembler(gateway)
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();

        let calls = block.extrinsics[0].call.args["calls"].as_array().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0]["method"]["pallet"], json!("balances"));
    }

    #[tokio::test]
    async fn test_event_with_out_of_range_index_is_dropped() {
        let mut gateway = fixture_gateway();
        gateway.insert_events(
            block_hash(),
            vec![success_event(0, 159_111_000), transfer_event(9)],
        );

        let block = assembler(gateway)
            .fetch_block(BlockId::Number(BLOCK_NUMBER), &FetchBlockOptions::default())
            .await
            .unwrap();

        // The stray event is logged and dropped; assembly continues.
        assert!(block.extrinsics.iter().all(|xt| {
            xt.events.iter().all(|e| e.method.method != "Transfer")
        }));
    }
}
