use alloy_sol_types::sol;

sol! {
    /// Emitted once when a token pair is listed
    #[derive(Debug)]
    event MarketCreated(
        bytes32 indexed marketId,
        address token0,
        address token1
    );

    /// Emitted when a maker rests a new sell order.
    /// A zero price bound means the side is unbounded.
    #[derive(Debug)]
    event OrderCreated(
        bytes32 indexed marketId,
        address indexed maker,
        address token0,
        address token1,
        uint256 amount0,
        uint256 maxPrice,
        uint256 minPrice,
        uint256 indexed orderId
    );

    /// Emitted when a maker shrinks or fully closes an order
    #[derive(Debug)]
    event OrderReducedOrCancelled(
        bytes32 indexed marketId,
        address indexed maker,
        address token0,
        address token1,
        uint256 indexed orderId,
        uint256 amount0Closed
    );

    /// Emitted when a taker fills (part of) an order
    #[derive(Debug)]
    event OrderFilled(
        bytes32 indexed marketId,
        address token0,
        address token1,
        uint256 indexed orderId,
        uint256 amount0Filled,
        uint256 amount1Spent,
        address indexed taker
    );

    /// Emitted when the oracle feed for a token is configured
    #[derive(Debug)]
    event PriceFeedSet(
        address indexed tokenAddress,
        bytes32 priceFeedId,
        address owner
    );
}
