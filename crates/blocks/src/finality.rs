//! Finality and canonicality checking.
//!
//! Decides whether a queried block is finalized *and* on the canonical
//! chain, using only what the node reports. A block at or below the
//! finalized head can still sit on a pruned fork, so its height alone is
//! never enough: the canonical hash recorded at that height has to match
//! byte for byte.

use primitive_types::H256;

use crate::gateway::{GatewayError, RpcGateway};

/// Result of a finality check. Ephemeral; never persisted or cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalityVerdict {
    pub finalized: bool,
    /// The finalized-head hash the verdict was computed against.
    pub finalized_head: H256,
}

/// Check whether `candidate_hash` at `candidate_number` is finalized and
/// canonical, given the chain's reported finalized head.
///
/// When the candidate is above the finalized head it can only be "finalized"
/// by being the head itself. When it is at or below the head, the canonical
/// hash at its height is fetched (only then; the lookup blocks on network
/// I/O) and compared: a mismatch means the candidate lives on a branch that
/// was superseded before finalization.
pub async fn check_finality<G: RpcGateway>(
    gateway: &G,
    candidate_number: u64,
    candidate_hash: H256,
    finalized_head: H256,
    below_finalized_head: bool,
) -> Result<FinalityVerdict, GatewayError> {
    if !below_finalized_head {
        return Ok(FinalityVerdict {
            finalized: candidate_hash == finalized_head,
            finalized_head,
        });
    }

    let canonical_hash = gateway.get_block_hash(candidate_number).await?;
    let finalized = match canonical_hash {
        Some(canonical) => canonical == candidate_hash,
        // No canonical hash recorded at this height: not on the chain at all.
        None => false,
    };

    Ok(FinalityVerdict {
        finalized,
        finalized_head,
    })
}
