use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Duration;

use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, MULTICALL3_ADDRESS};
use alloy::sol_types::SolCall;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use moka::future::Cache;
use url::Url;

use super::ChainDataSource;
use crate::abis::{Call3, IAaveOracle, IERC20, IMulticall3, IPoolDataProvider, IUniswapV2Pair};
use crate::config::{RpcSettings, SourceSettings};
use crate::error::ComputeError;
use crate::models::{AssetBlockTotals, PairBlockReserves, TxInteraction};
use crate::utils::{
    hex_encode, pair_usd_prices, reserve_to_f64, u256_to_f64, ORACLE_PRICE_DECIMALS,
    RAY_DECIMALS,
};

/// Delay between retries (exponential backoff base)
const RETRY_DELAY_MS: u64 = 100;

/// Token decimals above this are treated as a broken contract.
const MAX_TOKEN_DECIMALS: u8 = 36;

/// Static pair data, resolved once per pair.
#[derive(Debug, Clone, Copy)]
struct PairMetadata {
    decimals0: u8,
    decimals1: u8,
    token0_stable: bool,
    token1_stable: bool,
}

/// Chain data layer backed by a JSON-RPC endpoint.
///
/// Every call is pinned to its block, wrapped in a timeout and retried with
/// exponential backoff. Per-block results are cached so overlapping epochs and
/// recomputations do not hit the node twice.
#[derive(Clone)]
pub struct RpcChainData {
    provider: DynProvider,
    stablecoins: HashSet<Address>,
    pool_data_provider: Address,
    price_oracle: Address,
    timeout: Duration,
    max_retries: u32,
    block_concurrency: usize,
    token_decimals: Cache<Address, u8>,
    pair_metadata: Cache<Address, PairMetadata>,
    pair_blocks: Cache<(Address, u64), PairBlockReserves>,
    asset_blocks: Cache<(Address, u64), AssetBlockTotals>,
}

impl RpcChainData {
    pub fn new(rpc: &RpcSettings, sources: &SourceSettings) -> Result<Self> {
        let url = Url::parse(&rpc.url).context("Invalid RPC URL")?;
        let provider = DynProvider::new(ProviderBuilder::new().connect_http(url));

        let stablecoins = sources
            .stablecoins
            .iter()
            .map(|addr| parse_address(addr))
            .collect::<Result<HashSet<_>>>()?;

        let pool_data_provider = parse_address(&sources.pool_data_provider)?;
        let price_oracle = parse_address(&sources.price_oracle)?;

        info!(
            "RPC chain data layer ready ({} stablecoins, {} blocks in flight per source)",
            stablecoins.len(),
            rpc.block_concurrency
        );

        Ok(Self {
            provider,
            stablecoins,
            pool_data_provider,
            price_oracle,
            timeout: Duration::from_secs(rpc.timeout_secs),
            max_retries: rpc.max_retries.max(1),
            block_concurrency: rpc.block_concurrency.max(1),
            token_decimals: Cache::builder().max_capacity(10_000).build(),
            pair_metadata: Cache::builder().max_capacity(10_000).build(),
            pair_blocks: Cache::builder()
                .max_capacity(rpc.block_cache_capacity)
                .time_to_live(Duration::from_secs(3600))
                .build(),
            asset_blocks: Cache::builder()
                .max_capacity(rpc.block_cache_capacity)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        })
    }

    /// Run `op` with a per-attempt timeout, retrying with exponential backoff.
    async fn with_retry<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = anyhow!("{label} was never attempted");

        for attempt in 0..self.max_retries {
            match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = anyhow!("{label} timed out after {:?}", self.timeout),
            }

            if attempt < self.max_retries - 1 {
                let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(attempt));
                debug!("{label} attempt {} failed, retrying in {:?}", attempt + 1, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.context(format!("{label} failed after {} attempts", self.max_retries)))
    }

    async fn decimals_of(&self, token: Address) -> Result<u8> {
        if let Some(decimals) = self.token_decimals.get(&token).await {
            return Ok(decimals);
        }

        let provider = self.provider.clone();
        let decimals = self
            .with_retry("decimals", || {
                let erc20 = IERC20::new(token, provider.clone());
                async move { Ok::<_, anyhow::Error>(erc20.decimals().call().await?) }
            })
            .await?;

        if decimals > MAX_TOKEN_DECIMALS {
            bail!("token {token} reports {decimals} decimals");
        }

        self.token_decimals.insert(token, decimals).await;
        Ok(decimals)
    }

    async fn metadata_of(&self, pair: Address) -> Result<PairMetadata> {
        if let Some(metadata) = self.pair_metadata.get(&pair).await {
            return Ok(metadata);
        }

        let provider = self.provider.clone();
        let (token0, token1) = self
            .with_retry("token0/token1", || {
                let contract = IUniswapV2Pair::new(pair, provider.clone());
                async move {
                    let token0 = contract.token0().call().await?;
                    let token1 = contract.token1().call().await?;
                    Ok::<_, anyhow::Error>((token0, token1))
                }
            })
            .await?;

        let metadata = PairMetadata {
            decimals0: self.decimals_of(token0).await?,
            decimals1: self.decimals_of(token1).await?,
            token0_stable: self.stablecoins.contains(&token0),
            token1_stable: self.stablecoins.contains(&token1),
        };

        self.pair_metadata.insert(pair, metadata).await;
        Ok(metadata)
    }

    async fn pair_block(
        &self,
        pair: Address,
        metadata: PairMetadata,
        block: u64,
    ) -> Result<(u64, PairBlockReserves)> {
        if let Some(cached) = self.pair_blocks.get(&(pair, block)).await {
            return Ok((block, cached));
        }

        let provider = self.provider.clone();
        let reserves = self
            .with_retry("getReserves", || {
                let contract = IUniswapV2Pair::new(pair, provider.clone());
                async move {
                    let reserves = contract
                        .getReserves()
                        .block(BlockId::number(block))
                        .call()
                        .await?;
                    Ok::<_, anyhow::Error>(reserves)
                }
            })
            .await?;

        let reserve0 = reserve_to_f64(reserves.reserve0.to::<u128>(), metadata.decimals0);
        let reserve1 = reserve_to_f64(reserves.reserve1.to::<u128>(), metadata.decimals1);
        let prices = pair_usd_prices(
            reserve0,
            reserve1,
            metadata.token0_stable,
            metadata.token1_stable,
        );

        let record = PairBlockReserves {
            token0: reserve0,
            token1: reserve1,
            token0_usd: reserve0 * prices.token0,
            token1_usd: reserve1 * prices.token1,
            token0_price: prices.token0,
            token1_price: prices.token1,
        };

        self.pair_blocks.insert((pair, block), record).await;
        Ok((block, record))
    }

    async fn asset_block(
        &self,
        asset: Address,
        decimals: u8,
        block: u64,
    ) -> Result<(u64, AssetBlockTotals)> {
        if let Some(cached) = self.asset_blocks.get(&(asset, block)).await {
            return Ok((block, cached));
        }

        let provider = self.provider.clone();
        let data_provider = self.pool_data_provider;
        let oracle = self.price_oracle;

        let results = self
            .with_retry("getReserveData/getAssetPrice", || {
                let multicall = IMulticall3::new(MULTICALL3_ADDRESS, provider.clone());
                let calls = vec![
                    Call3 {
                        target: data_provider,
                        allowFailure: false,
                        callData: IPoolDataProvider::getReserveDataCall { asset }
                            .abi_encode()
                            .into(),
                    },
                    Call3 {
                        target: oracle,
                        allowFailure: false,
                        callData: IAaveOracle::getAssetPriceCall { asset }.abi_encode().into(),
                    },
                ];
                async move {
                    let results = multicall
                        .aggregate3(calls)
                        .block(BlockId::number(block))
                        .call()
                        .await?;
                    Ok::<_, anyhow::Error>(results)
                }
            })
            .await?;

        if results.len() != 2 || results.iter().any(|r| !r.success) {
            bail!("multicall for asset {asset} at block {block} returned unusable results");
        }

        let reserve = IPoolDataProvider::getReserveDataCall::abi_decode_returns(
            &results[0].returnData,
        )
        .context("Failed to decode getReserveData")?;
        let price: U256 = IAaveOracle::getAssetPriceCall::abi_decode_returns(&results[1].returnData)
            .context("Failed to decode getAssetPrice")?;

        let price_usd = u256_to_f64(price, ORACLE_PRICE_DECIMALS);
        let total_supply = u256_to_f64(reserve.totalAToken, decimals);
        let variable_debt = u256_to_f64(reserve.totalVariableDebt, decimals);
        let stable_debt = u256_to_f64(reserve.totalStableDebt, decimals);

        let record = AssetBlockTotals {
            total_supply,
            supply_usd: total_supply * price_usd,
            variable_debt,
            variable_debt_usd: variable_debt * price_usd,
            stable_debt,
            stable_debt_usd: stable_debt * price_usd,
            liquidity_rate: u256_to_f64(reserve.liquidityRate, RAY_DECIMALS),
            variable_borrow_rate: u256_to_f64(reserve.variableBorrowRate, RAY_DECIMALS),
            price_usd,
        };

        self.asset_blocks.insert((asset, block), record).await;
        Ok((block, record))
    }
}

#[async_trait]
impl ChainDataSource for RpcChainData {
    async fn fetch_pair_reserves(
        &self,
        pair: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<BTreeMap<u64, PairBlockReserves>, ComputeError> {
        if to_block < from_block {
            return Err(ComputeError::InvalidRange {
                min: from_block,
                max: to_block,
            });
        }
        let address =
            parse_address(pair).map_err(|e| ComputeError::Malformed(format!("{e:#}")))?;

        let metadata = self
            .metadata_of(address)
            .await
            .map_err(|e| ComputeError::rpc(pair, e))?;

        let blocks: Vec<(u64, PairBlockReserves)> = stream::iter(from_block..=to_block)
            .map(|block| self.pair_block(address, metadata, block))
            .buffered(self.block_concurrency)
            .try_collect()
            .await
            .map_err(|e| ComputeError::rpc(pair, e))?;

        Ok(blocks.into_iter().collect())
    }

    async fn fetch_asset_totals(
        &self,
        asset: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<BTreeMap<u64, AssetBlockTotals>, ComputeError> {
        if to_block < from_block {
            return Err(ComputeError::InvalidRange {
                min: from_block,
                max: to_block,
            });
        }
        let address =
            parse_address(asset).map_err(|e| ComputeError::Malformed(format!("{e:#}")))?;

        let decimals = self
            .decimals_of(address)
            .await
            .map_err(|e| ComputeError::rpc(asset, e))?;

        let blocks: Vec<(u64, AssetBlockTotals)> = stream::iter(from_block..=to_block)
            .map(|block| self.asset_block(address, decimals, block))
            .buffered(self.block_concurrency)
            .try_collect()
            .await
            .map_err(|e| ComputeError::rpc(asset, e))?;

        Ok(blocks.into_iter().collect())
    }

    async fn block_interactions(&self, block: u64) -> Result<Vec<TxInteraction>, ComputeError> {
        let provider = self.provider.clone();
        let receipts = self
            .with_retry("eth_getBlockReceipts", || {
                let provider = provider.clone();
                async move {
                    let receipts = provider.get_block_receipts(BlockId::number(block)).await?;
                    Ok::<_, anyhow::Error>(receipts)
                }
            })
            .await
            .map_err(|e| ComputeError::rpc(format!("block {block}"), e))?
            .ok_or_else(|| ComputeError::NoData(format!("receipts of block {block}")))?;

        Ok(receipts
            .into_iter()
            .map(|receipt| TxInteraction {
                tx_hash: hex_encode(receipt.transaction_hash.as_slice()),
                from: hex_encode(receipt.from.as_slice()),
                to: receipt.to.map(|to| hex_encode(to.as_slice())),
                block_number: receipt.block_number.unwrap_or(block),
                status: receipt.status(),
            })
            .collect())
    }

    async fn latest_block(&self) -> Result<u64, ComputeError> {
        let provider = self.provider.clone();
        self.with_retry("eth_blockNumber", || {
            let provider = provider.clone();
            async move { Ok::<_, anyhow::Error>(provider.get_block_number().await?) }
        })
        .await
        .map_err(|e| ComputeError::rpc("chain head", e))
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, ComputeError> {
        let provider = self.provider.clone();
        let header = self
            .with_retry("eth_getBlockByNumber", || {
                let provider = provider.clone();
                async move {
                    let block = provider
                        .get_block_by_number(BlockNumberOrTag::Number(block))
                        .await?;
                    Ok::<_, anyhow::Error>(block)
                }
            })
            .await
            .map_err(|e| ComputeError::rpc(format!("block {block}"), e))?
            .ok_or_else(|| ComputeError::NoData(format!("header of block {block}")))?;

        Ok(header.header.timestamp)
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse().with_context(|| format!("Invalid address {raw}"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn chain_data(max_retries: u32) -> RpcChainData {
        let rpc = RpcSettings {
            url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 1,
            max_retries,
            block_concurrency: 4,
            block_cache_capacity: 16,
        };
        let sources = SourceSettings {
            pairs: vec![],
            assets: vec![],
            stablecoins: vec!["0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string()],
            tracked_wallets: vec![],
            pool_data_provider: "0x7B4EB56E7CD4b454BA8ff71E4518426369a138a3".to_string(),
            price_oracle: "0x54586bE62E3c3580375aE3723C145253060Ca0C2".to_string(),
        };
        RpcChainData::new(&rpc, &sources).unwrap()
    }

    #[tokio::test]
    async fn test_retry_recovers_on_last_attempt() {
        let chain = chain_data(3);
        let attempts = AtomicU32::new(0);

        let value = chain
            .with_retry("getReserves", || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt < 3 {
                        return Err(anyhow!("attempt {attempt} rejected"));
                    }
                    Ok::<_, anyhow::Error>(attempt)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let chain = chain_data(3);
        let attempts = AtomicU32::new(0);

        let err = chain
            .with_retry("eth_blockNumber", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<u64, _>(anyhow!("node unavailable")) }
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "eth_blockNumber failed after 3 attempts");
        assert!(format!("{err:#}").contains("node unavailable"));
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out() {
        let chain = chain_data(1);

        let err = chain
            .with_retry("eth_getBlockReceipts", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, anyhow::Error>(())
            })
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("eth_getBlockReceipts timed out after 1s"));
    }
}
