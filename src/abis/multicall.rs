//! Multicall3, deployed at the same address on every supported chain.

use alloy::sol;

sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Call3Result {
        bool success;
        bytes returnData;
    }

    /// Batches several view calls into one `eth_call` pinned to a single block.
    #[sol(rpc)]
    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }
}
