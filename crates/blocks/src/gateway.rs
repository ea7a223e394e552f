// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! The RPC gateway boundary.
//!
//! Everything the block-assembly core knows about the chain arrives through
//! the [`RpcGateway`] trait: raw blocks, headers, canonical hashes, the
//! finalized head, decoded event sets and runtime constants. The transport
//! itself (connection handling, retries, metadata decoding into a queryable
//! schema) lives behind this boundary; the core only surfaces its failures.

use primitive_types::H256;
use serde_json::Value;
use thiserror::Error;

use crate::decode::RawCall;
use crate::types::{EventPhase, SignatureInfo};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("RPC request failed")]
    Rpc(#[from] subxt_rpcs::Error),

    #[error("node returned no value for {0}")]
    MissingValue(String),
}

/// Block header identity as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
}

/// A raw extrinsic as handed over by the gateway: the undecoded inner call,
/// the signature payload if the extrinsic was signed, and the encoded length
/// the fee formula charges per byte.
#[derive(Debug, Clone)]
pub struct RawExtrinsic {
    pub call: RawCall,
    pub signature: Option<SignatureInfo>,
    pub encoded_length: u64,
    /// Call documentation from the metadata schema, when the node exposes it
    pub docs: Option<String>,
}

/// A raw block: header plus one slot per on-chain extrinsic, in on-chain
/// order. A `None` slot is an extrinsic the gateway could not decode; the
/// assembler treats it as a data-integrity failure.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub header: Header,
    pub extrinsics: Vec<Option<RawExtrinsic>>,
}

/// A single decoded event record from the block's event set.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub phase: EventPhase,
    pub pallet: String,
    pub method: String,
    pub data: Vec<Value>,
    pub docs: Option<String>,
}

/// Read access to a node, as consumed by the block-assembly core.
///
/// All calls are potentially slow network reads. Implementations must not
/// retry silently; retry policy belongs to the transport. Each method is
/// independent and side-effect free for a fixed chain state.
#[allow(async_fn_in_trait)]
pub trait RpcGateway {
    async fn get_block(&self, hash: H256) -> Result<RawBlock, GatewayError>;

    async fn get_header(&self, hash: H256) -> Result<Header, GatewayError>;

    /// Canonical-chain hash at a height; `None` when the chain has no block
    /// there.
    async fn get_block_hash(&self, number: u64) -> Result<Option<H256>, GatewayError>;

    async fn get_finalized_head(&self) -> Result<H256, GatewayError>;

    async fn get_events(&self, hash: H256) -> Result<Vec<EventRecord>, GatewayError>;

    /// Runtime constant by name, evaluated at the given (parent) block.
    /// `None` means the constant is not exposed at that point in history.
    async fn get_runtime_constant(
        &self,
        name: &str,
        at: H256,
    ) -> Result<Option<Value>, GatewayError>;
}
