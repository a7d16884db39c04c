//! Argument assembly for the exchange and ERC-20 calls the frontend triggers.
//!
//! Nothing here validates economics: the wallet and the contract enforce
//! correctness. Oracle update payloads are passed through untouched.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::{sol, sol_data, SolCall, SolType};

use crate::error::{IndexerError, Result};

sol! {
    #[derive(Debug)]
    function createOrder(
        address token0,
        address token1,
        uint256 amount0,
        uint256 maxPrice,
        uint256 minPrice,
        bytes[] priceUpdateData
    ) external payable returns (uint256 orderId);

    #[derive(Debug)]
    function cancelOrReduceOrder(
        bytes32 marketId,
        uint256 orderId,
        uint256 amount0Close
    ) external;

    #[derive(Debug)]
    function fillOrderExactAmountIn(
        bytes32 marketId,
        uint256 orderId,
        uint256 amount1In,
        uint256 minAmount0Out,
        bytes[] priceUpdateData
    ) external payable;

    #[derive(Debug)]
    function approve(address spender, uint256 amount) external returns (bool);

    #[derive(Debug)]
    function allowance(address owner, address spender) external view returns (uint256);

    #[derive(Debug)]
    function decimals() external view returns (uint8);
}

/// A ready-to-sign call: target, calldata and native value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl CallRequest {
    fn new(to: Address, call: impl SolCall) -> Self {
        Self {
            to,
            data: call.abi_encode().into(),
            value: U256::ZERO,
        }
    }

    fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateOrderArgs {
    pub token0: Address,
    pub token1: Address,
    pub amount0: U256,
    /// Zero for no upper bound
    pub max_price: U256,
    /// Zero for no lower bound
    pub min_price: U256,
    pub price_update_data: Vec<Bytes>,
    /// Native value forwarded to pay the oracle update fee
    pub update_fee: U256,
}

#[derive(Debug, Clone)]
pub struct FillOrderArgs {
    pub market_id: FixedBytes<32>,
    pub order_id: U256,
    pub amount1_in: U256,
    pub min_amount0_out: U256,
    pub price_update_data: Vec<Bytes>,
    pub update_fee: U256,
}

/// Builds calldata against a single exchange deployment
#[derive(Debug, Clone, Copy)]
pub struct OrderCalls {
    exchange: Address,
}

impl OrderCalls {
    pub fn new(exchange: Address) -> Self {
        Self { exchange }
    }

    pub fn exchange(&self) -> Address {
        self.exchange
    }

    pub fn create_order(&self, args: CreateOrderArgs) -> CallRequest {
        let call = createOrderCall {
            token0: args.token0,
            token1: args.token1,
            amount0: args.amount0,
            maxPrice: args.max_price,
            minPrice: args.min_price,
            priceUpdateData: args.price_update_data,
        };
        CallRequest::new(self.exchange, call).with_value(args.update_fee)
    }

    pub fn cancel_or_reduce(
        &self,
        market_id: FixedBytes<32>,
        order_id: U256,
        amount0_close: U256,
    ) -> CallRequest {
        let call = cancelOrReduceOrderCall {
            marketId: market_id,
            orderId: order_id,
            amount0Close: amount0_close,
        };
        CallRequest::new(self.exchange, call)
    }

    pub fn fill_exact_amount_in(&self, args: FillOrderArgs) -> CallRequest {
        let call = fillOrderExactAmountInCall {
            marketId: args.market_id,
            orderId: args.order_id,
            amount1In: args.amount1_in,
            minAmount0Out: args.min_amount0_out,
            priceUpdateData: args.price_update_data,
        };
        CallRequest::new(self.exchange, call).with_value(args.update_fee)
    }

    /// ERC-20 approval letting the exchange pull `amount` of `token`
    pub fn approve(&self, token: Address, amount: U256) -> CallRequest {
        CallRequest::new(
            token,
            approveCall {
                spender: self.exchange,
                amount,
            },
        )
    }

    /// ERC-20 allowance the exchange currently holds from `owner`
    pub fn allowance(&self, token: Address, owner: Address) -> CallRequest {
        CallRequest::new(
            token,
            allowanceCall {
                owner,
                spender: self.exchange,
            },
        )
    }

    pub fn decimals(&self, token: Address) -> CallRequest {
        CallRequest::new(token, decimalsCall {})
    }
}

/// Whether an approval must be sent before spending `amount`
pub fn needs_approval(allowance: U256, amount: U256) -> bool {
    allowance < amount
}

/// Decode the return data of an `allowance` call
pub fn decode_allowance(data: &[u8]) -> Result<U256> {
    sol_data::Uint::<256>::abi_decode(data).map_err(|e| IndexerError::Call(e.to_string()))
}

/// Decode the return data of a `decimals` call
pub fn decode_decimals(data: &[u8]) -> Result<u8> {
    sol_data::Uint::<8>::abi_decode(data).map_err(|e| IndexerError::Call(e.to_string()))
}
