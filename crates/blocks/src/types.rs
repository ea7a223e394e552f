//! Shared data model for assembled blocks.
//!
//! These are the types a block fetch produces: the block itself, its
//! extrinsics, the events paired with them, and the small wrappers the
//! serialized response is built from. Large numbers stay exact (`u128`
//! internally, emitted as decimal strings) and hashes serialize as
//! `0x`-prefixed hex.

use primitive_types::H256;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::decode::DecodedCall;

/// Format bytes as hex string with "0x" prefix
pub fn hex_with_prefix(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn serialize_h256<S>(hash: &H256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex_with_prefix(hash.as_bytes()))
}

/// Chain identity used when building per-block fee models.
///
/// Carries the runtime's spec name/version plus the static per-chain fee
/// support table loaded from the config crate.
#[derive(Debug, Clone)]
pub struct ChainContext {
    pub spec_name: String,
    pub spec_version: u32,
    pub fee_configs: config::ChainFeeConfigs,
}

impl ChainContext {
    pub fn new(spec_name: impl Into<String>, spec_version: u32) -> Self {
        Self {
            spec_name: spec_name.into(),
            spec_version,
            fee_configs: config::ChainFeeConfigs::default(),
        }
    }
}

/// Method information for calls and events
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MethodInfo {
    pub pallet: String,
    pub method: String,
}

/// Event phase - when during block execution the event was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// During block initialization
    Initialization,
    /// During extrinsic application (contains extrinsic index)
    ApplyExtrinsic(u32),
    /// During block finalization
    Finalization,
}

/// Event information in block response
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub method: MethodInfo,
    pub data: Vec<Value>,
    /// Documentation for this event (only present when eventDocs is requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// Events that occurred during block initialization
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OnInitialize {
    pub events: Vec<Event>,
}

/// Events that occurred during block finalization
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OnFinalize {
    pub events: Vec<Event>,
}

/// Signature information for signed extrinsics
///
/// The signer is kept as the opaque address string the node reported;
/// SS58 rendering belongs to the serialization boundary, not here.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub signer: String,
}

/// Fee outcome attached to a single extrinsic.
///
/// Fee computation is best-effort per extrinsic: an unavailable fee is
/// recorded inline and never aborts block assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrinsicFee {
    /// The exact partial fee (inclusion fee, excluding tip).
    Computed(u128),
    /// The runtime at this block does not expose what fee calculation needs.
    NotSupported,
}

impl Serialize for ExtrinsicFee {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            ExtrinsicFee::Computed(partial_fee) => {
                map.serialize_entry("partialFee", &partial_fee.to_string())?;
            }
            ExtrinsicFee::NotSupported => {
                map.serialize_entry("error", crate::fee::FEE_NOT_SUPPORTED)?;
            }
        }
        map.end()
    }
}

/// A fully assembled extrinsic: decoded call, signature, fee and events.
///
/// Created once per block fetch and immutable afterwards.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Extrinsic {
    #[serde(flatten)]
    pub call: DecodedCall,
    /// Signature information - None for unsigned extrinsics (inherents)
    pub signature: Option<SignatureInfo>,
    /// Fee information - None when fee computation is inapplicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<ExtrinsicFee>,
    /// Events emitted while this extrinsic was applied
    pub events: Vec<Event>,
    /// Whether the extrinsic executed successfully (from System.ExtrinsicSuccess)
    pub success: bool,
    /// Whether the extrinsic pays a fee, as reported by its DispatchInfo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pays_fee: Option<bool>,
    /// Documentation for this call (only present when extrinsicDocs is requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// An assembled block view: header identity, decoded extrinsics, phase-grouped
/// events and an optional finality tag.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub number: u64,
    #[serde(serialize_with = "serialize_h256")]
    pub hash: H256,
    #[serde(serialize_with = "serialize_h256")]
    pub parent_hash: H256,
    pub on_initialize: OnInitialize,
    pub extrinsics: Vec<Extrinsic>,
    pub on_finalize: OnFinalize,
    /// Whether this block has been finalized; absent when the caller did not
    /// ask for the tag (or explicitly omitted it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized: Option<bool>,
}
