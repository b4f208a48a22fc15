//! Settlement gateway seam used by withdrawals.

use async_trait::async_trait;
use thiserror::Error;

use crate::amount::TokenAmount;

/// Failure reported by a settlement backend. A failed settlement rolls
/// the withdrawal back; no entry flips to claimed.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct SettlementError(pub String);

/// Pays out a withdrawn balance to an address.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    async fn settle(&self, address: &str, amount: TokenAmount) -> Result<(), SettlementError>;
}

/// Acknowledges every settlement without an external call.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSettlement;

#[async_trait]
impl SettlementGateway for InstantSettlement {
    async fn settle(&self, address: &str, amount: TokenAmount) -> Result<(), SettlementError> {
        tracing::debug!(%address, %amount, "settled instantly");
        Ok(())
    }
}
