//! Solidity interfaces of the contracts the workflow drives.

use alloy_sol_types::sol;

sol! {
    #[sol(rpc)]
    contract IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    contract IPairFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
        function createPair(address tokenA, address tokenB) external returns (address pair);
    }
}

sol! {
    #[sol(rpc)]
    contract IPair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function totalSupply() external view returns (uint256);
        function sync() external;
    }
}

sol! {
    #[sol(rpc)]
    contract IRouter {
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);

        function addLiquidityNative(
            address token,
            uint256 amountTokenDesired,
            uint256 amountTokenMin,
            uint256 amountNativeMin,
            address to,
            uint256 deadline
        ) external payable returns (uint256 amountToken, uint256 amountNative, uint256 liquidity);
    }
}

sol! {
    #[sol(rpc)]
    contract IPriceOracle {
        function isPairSupported(address pair) external view returns (bool);
        function addPair(address pair, address token0, address token1) external;
    }
}
