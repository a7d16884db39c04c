use alloy_primitives::hex;
use async_graphql::SimpleObject;
use orderbook_core::calls::CallRequest;
use orderbook_oracle::PriceUpdate;

/// An unsigned transaction for the wallet to sign
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlCallRequest {
    pub to: String,
    /// 0x-prefixed calldata
    pub data: String,
    /// Native value in wei
    pub value: String,
}

impl From<CallRequest> for GqlCallRequest {
    fn from(request: CallRequest) -> Self {
        Self {
            to: request.to.to_checksum(None),
            data: hex::encode_prefixed(&request.data),
            value: request.value.to_string(),
        }
    }
}

/// Opaque oracle payloads, hex encoded
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlPriceUpdate {
    pub data: Vec<String>,
}

impl From<PriceUpdate> for GqlPriceUpdate {
    fn from(update: PriceUpdate) -> Self {
        Self {
            data: update.to_hex(),
        }
    }
}

/// Current allowance and whether an approval must be sent first
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlAllowance {
    pub allowance: String,
    pub needs_approval: bool,
    /// Approval to send when `needs_approval` is set
    pub approve: Option<GqlCallRequest>,
}
