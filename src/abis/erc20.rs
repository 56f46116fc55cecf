use alloy::sol;

sol! {
    /// Only the metadata needed to normalize raw balances.
    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
    }
}
