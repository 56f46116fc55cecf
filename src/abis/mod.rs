pub mod aave;
pub mod erc20;
pub mod multicall;
pub mod v2;

pub use aave::{IAaveOracle, IPoolDataProvider};
pub use erc20::IERC20;
pub use multicall::{Call3, IMulticall3};
pub use v2::IUniswapV2Pair;
