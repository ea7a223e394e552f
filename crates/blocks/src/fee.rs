// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-block fee model.
//!
//! Reproduces the chain's own inclusion-fee computation bit-exactly:
//!
//! ```text
//! partial_fee = base_fee + len_fee + adjusted_weight_fee
//!
//! base_fee            = weight_to_fee(extrinsic_base_weight)
//! len_fee             = encoded_length * per_byte_fee
//! adjusted_weight_fee = multiplier * weight_to_fee(weight)
//! ```
//!
//! where `weight_to_fee` evaluates the runtime's weight-to-fee polynomial
//! (signed coefficients with integer and Perbill-fraction parts) and the
//! multiplier is the `FixedU128` fee adjustment sampled at the parent block.
//! All intermediate arithmetic is `U256`; nothing in the pipeline touches
//! floating point, because any rounding drift would desynchronize the result
//! from the fee the node itself charged.
//!
//! The model is a short-lived value object: built once per parent-block
//! context, used for every extrinsic of one fetch, then dropped. Constants
//! legitimately differ across chain history, so nothing is cached.

use primitive_types::{H256, U256};
use serde_json::Value;
use sp_runtime::traits::One;
use sp_runtime::{FixedPointNumber, FixedU128, Perbill};
use thiserror::Error;

use crate::gateway::{GatewayError, RpcGateway};
use crate::numeric::parse_u128;
use crate::types::ChainContext;

/// Marker message recorded on extrinsics whose fee could not be computed.
pub const FEE_NOT_SUPPORTED: &str = "fee calculation not supported";

/// Runtime constant names the model is built from, resolved at the parent
/// block of the one being assembled.
pub const TRANSACTION_BYTE_FEE: &str = "TransactionPayment.TransactionByteFee";
pub const EXTRINSIC_BASE_WEIGHT: &str = "System.ExtrinsicBaseWeight";
pub const WEIGHT_TO_FEE: &str = "TransactionPayment.WeightToFee";
pub const NEXT_FEE_MULTIPLIER: &str = "TransactionPayment.NextFeeMultiplier";

/// Per-extrinsic condition: this block's runtime does not expose what fee
/// calculation needs. Never fatal to block assembly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("fee calculation not supported")]
pub struct FeeUnavailable;

/// One term of the weight-to-fee polynomial, in the runtime's own shape:
/// `±(coeff_integer + coeff_frac) * weight^degree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightToFeeCoefficient {
    pub coeff_integer: u128,
    pub coeff_frac: Perbill,
    pub negative: bool,
    pub degree: u8,
}

/// Fee constants and coefficients sampled at one parent block.
#[derive(Debug, Clone)]
pub struct FeeModel {
    supported: bool,
    multiplier: FixedU128,
    per_byte_fee: Option<u128>,
    base_weight: Option<u128>,
    coefficients: Vec<WeightToFeeCoefficient>,
}

impl FeeModel {
    /// Build a fee model from explicit parts. Used when the constants were
    /// obtained out of band; `build` is the gateway-backed path.
    pub fn from_parts(
        multiplier: FixedU128,
        per_byte_fee: Option<u128>,
        base_weight: Option<u128>,
        coefficients: Vec<WeightToFeeCoefficient>,
    ) -> Self {
        Self {
            supported: true,
            multiplier,
            per_byte_fee,
            base_weight,
            coefficients,
        }
    }

    /// A model on which every `partial_fee` call reports `FeeUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            supported: false,
            multiplier: FixedU128::one(),
            per_byte_fee: None,
            base_weight: None,
            coefficients: Vec::new(),
        }
    }

    /// Fetch the fee constants at `parent_hash` and build the model.
    ///
    /// Missing constants never fail the build: the model degrades so that
    /// `partial_fee` reports `FeeUnavailable` per extrinsic instead of
    /// aborting the whole block fetch. Only gateway failures propagate.
    pub async fn build<G: RpcGateway>(
        gateway: &G,
        chain: &ChainContext,
        parent_hash: H256,
    ) -> Result<Self, GatewayError> {
        if !chain
            .fee_configs
            .supports_fee_calculation(&chain.spec_name, chain.spec_version)
        {
            tracing::debug!(
                spec_name = %chain.spec_name,
                spec_version = chain.spec_version,
                "runtime below the minimum version for fee calculation"
            );
            return Ok(Self::unavailable());
        }

        // Independent reads; issue them together.
        let (per_byte_fee, base_weight, coefficients, multiplier) = tokio::join!(
            gateway.get_runtime_constant(TRANSACTION_BYTE_FEE, parent_hash),
            gateway.get_runtime_constant(EXTRINSIC_BASE_WEIGHT, parent_hash),
            gateway.get_runtime_constant(WEIGHT_TO_FEE, parent_hash),
            gateway.get_runtime_constant(NEXT_FEE_MULTIPLIER, parent_hash),
        );

        let per_byte_fee = per_byte_fee?.as_ref().and_then(parse_u128);
        if per_byte_fee.is_none() {
            tracing::debug!(
                constant = TRANSACTION_BYTE_FEE,
                "per-byte fee not exposed at parent block; fees unavailable"
            );
        }
        let base_weight = base_weight?.as_ref().and_then(parse_u128);
        let coefficients = coefficients?
            .as_ref()
            .map(parse_coefficients)
            .unwrap_or_default();
        let multiplier = multiplier?
            .as_ref()
            .and_then(parse_u128)
            .map(FixedU128::from_inner)
            .unwrap_or_else(FixedU128::one);

        Ok(Self {
            supported: true,
            multiplier,
            per_byte_fee,
            base_weight,
            coefficients,
        })
    }

    /// Compute the partial (inclusion) fee for an extrinsic of the given
    /// post-dispatch weight and encoded length.
    ///
    /// Pure: identical inputs always reproduce identical output.
    pub fn partial_fee(&self, weight: u128, encoded_length: u64) -> Result<u128, FeeUnavailable> {
        if !self.supported {
            return Err(FeeUnavailable);
        }
        let per_byte_fee = self.per_byte_fee.ok_or(FeeUnavailable)?;
        let base_weight = self.base_weight.ok_or(FeeUnavailable)?;
        if self.coefficients.is_empty() {
            return Err(FeeUnavailable);
        }

        let base_fee = self.weight_to_fee(base_weight);
        let len_fee = U256::from(per_byte_fee).saturating_mul(U256::from(encoded_length));
        let adjusted_weight_fee = U256::from(self.multiplier.into_inner())
            .saturating_mul(self.weight_to_fee(weight))
            / U256::from(FixedU128::DIV);

        let total = base_fee
            .saturating_add(len_fee)
            .saturating_add(adjusted_weight_fee);
        Ok(saturate_to_u128(total))
    }

    /// Evaluate the weight-to-fee polynomial. Positive and negative terms are
    /// summed separately and the total clamps at zero.
    fn weight_to_fee(&self, weight: u128) -> U256 {
        let weight = U256::from(weight);
        let mut positive = U256::zero();
        let mut negative = U256::zero();

        for coefficient in &self.coefficients {
            let weight_pow = weight
                .checked_pow(U256::from(coefficient.degree))
                .unwrap_or(U256::MAX);
            let integer_part = weight_pow.saturating_mul(U256::from(coefficient.coeff_integer));
            let frac_part = weight_pow
                .saturating_mul(U256::from(coefficient.coeff_frac.deconstruct()))
                / U256::from(Perbill::one().deconstruct());
            let term = integer_part.saturating_add(frac_part);

            if coefficient.negative {
                negative = negative.saturating_add(term);
            } else {
                positive = positive.saturating_add(term);
            }
        }

        positive.saturating_sub(negative)
    }
}

fn saturate_to_u128(value: U256) -> u128 {
    if value > U256::from(u128::MAX) {
        u128::MAX
    } else {
        value.as_u128()
    }
}

/// Parse the runtime's `WeightToFee` coefficient list out of its JSON form.
/// Unrecognized entries are skipped rather than failing the whole model.
fn parse_coefficients(value: &Value) -> Vec<WeightToFeeCoefficient> {
    let Some(items) = value.as_array() else {
        tracing::debug!("weight-to-fee constant is not a coefficient list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let coeff_integer = item.get("coeffInteger").and_then(parse_u128)?;
            let coeff_frac = item.get("coeffFrac").and_then(parse_u128)?;
            let negative = item.get("negative").and_then(Value::as_bool).unwrap_or(false);
            let degree = item.get("degree").and_then(Value::as_u64).unwrap_or(1) as u8;

            Some(WeightToFeeCoefficient {
                coeff_integer,
                coeff_frac: Perbill::from_parts(
                    coeff_frac.min(u128::from(Perbill::one().deconstruct())) as u32,
                ),
                negative,
                degree,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{MockGateway, hash, header};
    use serde_json::json;

    /// Polkadot parameters around runtime 16: per-byte fee 1_000_000,
    /// extrinsic base weight 125_000_000, a single degree-1 coefficient of
    /// 0.08, multiplier 1e-9.
    fn polkadot_model() -> FeeModel {
        FeeModel::from_parts(
            FixedU128::from_inner(1_000_000_000),
            Some(1_000_000),
            Some(125_000_000),
            vec![WeightToFeeCoefficient {
                coeff_integer: 0,
                coeff_frac: Perbill::from_parts(80_000_000),
                negative: false,
                degree: 1,
            }],
        )
    }

    #[test]
    fn test_partial_fee_known_vectors() {
        let model = polkadot_model();

        // base_fee 10_000_000 + len_fee 534_000_000 + adjusted weight fee 0
        assert_eq!(model.partial_fee(399_480_000, 534), Ok(544_000_000));
        // base_fee 10_000_000 + len_fee 1_247_000_000 + adjusted weight fee 75
        assert_eq!(model.partial_fee(941_325_000_000, 1247), Ok(1_257_000_075));
    }

    #[test]
    fn test_partial_fee_is_deterministic() {
        let model = polkadot_model();
        let first = model.partial_fee(941_325_000_000, 1247);
        let second = model.partial_fee(941_325_000_000, 1247);
        assert_eq!(first, second);
    }

    #[test]
    fn test_partial_fee_without_per_byte_fee_is_unavailable() {
        let model = FeeModel::from_parts(
            FixedU128::one(),
            None,
            Some(125_000_000),
            vec![WeightToFeeCoefficient {
                coeff_integer: 0,
                coeff_frac: Perbill::from_parts(80_000_000),
                negative: false,
                degree: 1,
            }],
        );
        assert_eq!(model.partial_fee(399_480_000, 534), Err(FeeUnavailable));
    }

    #[test]
    fn test_partial_fee_unavailable_model() {
        assert_eq!(
            FeeModel::unavailable().partial_fee(399_480_000, 534),
            Err(FeeUnavailable)
        );
    }

    #[test]
    fn test_negative_terms_clamp_at_zero() {
        let model = FeeModel::from_parts(
            FixedU128::one(),
            Some(0),
            Some(0),
            vec![
                WeightToFeeCoefficient {
                    coeff_integer: 1,
                    coeff_frac: Perbill::zero(),
                    negative: false,
                    degree: 1,
                },
                WeightToFeeCoefficient {
                    coeff_integer: 3,
                    coeff_frac: Perbill::zero(),
                    negative: true,
                    degree: 1,
                },
            ],
        );
        // 1*w - 3*w would be negative; clamps to zero instead
        assert_eq!(model.partial_fee(1_000, 0), Ok(0));
    }

    #[test]
    fn test_polynomial_higher_degree_uses_wide_arithmetic() {
        // coeff * w^2 overflows u128 for large weights; U256 keeps it exact
        // until the final saturation.
        let model = FeeModel::from_parts(
            FixedU128::one(),
            Some(0),
            Some(0),
            vec![WeightToFeeCoefficient {
                coeff_integer: u128::from(u64::MAX),
                coeff_frac: Perbill::zero(),
                negative: false,
                degree: 2,
            }],
        );
        assert_eq!(model.partial_fee(u128::from(u64::MAX), 0), Ok(u128::MAX));
    }

    #[test]
    fn test_parse_coefficients_runtime_shape() {
        let value = json!([
            { "coeffInteger": "0", "coeffFrac": 80000000, "negative": false, "degree": 1 }
        ]);
        let coefficients = parse_coefficients(&value);
        assert_eq!(coefficients.len(), 1);
        assert_eq!(coefficients[0].coeff_integer, 0);
        assert_eq!(coefficients[0].coeff_frac, Perbill::from_parts(80_000_000));
        assert!(!coefficients[0].negative);
        assert_eq!(coefficients[0].degree, 1);
    }

    #[tokio::test]
    async fn test_build_from_gateway_constants() {
        let parent = hash(1);
        let mut gateway = MockGateway::new();
        gateway.insert_block(header(100, parent, hash(0)), vec![]);
        gateway.insert_polkadot_fee_constants();

        let chain = ChainContext::new("polkadot", 16);
        let model = FeeModel::build(&gateway, &chain, parent).await.unwrap();

        assert_eq!(model.partial_fee(399_480_000, 534), Ok(544_000_000));
    }

    #[tokio::test]
    async fn test_build_degrades_when_per_byte_fee_absent() {
        let parent = hash(1);
        let mut gateway = MockGateway::new();
        gateway.insert_polkadot_fee_constants();
        gateway.remove_constant(TRANSACTION_BYTE_FEE);

        let chain = ChainContext::new("polkadot", 16);
        let model = FeeModel::build(&gateway, &chain, parent).await.unwrap();

        // The model is usable; every partial_fee call signals unavailability.
        assert_eq!(model.partial_fee(399_480_000, 534), Err(FeeUnavailable));
        assert_eq!(model.partial_fee(941_325_000_000, 1247), Err(FeeUnavailable));
    }

    #[tokio::test]
    async fn test_build_respects_chain_minimum_runtime() {
        let parent = hash(1);
        let mut gateway = MockGateway::new();
        gateway.insert_polkadot_fee_constants();

        // Kusama below minCalcFeeRuntime (1058): no constants are consulted.
        let chain = ChainContext::new("kusama", 1057);
        let model = FeeModel::build(&gateway, &chain, parent).await.unwrap();

        assert_eq!(model.partial_fee(399_480_000, 534), Err(FeeUnavailable));
    }
}
