//! Reads of on-chain state needed to poll conditional orders.

use {
    crate::{
        contracts::{COMPOSABLE_COW, ComposableCoW, ConditionalOrderParams, GPv2Order},
        poll::BlockInfo,
    },
    alloy::{
        primitives::{Address, B256, Bytes},
        providers::{DynProvider, Provider},
        rpc::types::BlockNumberOrTag,
    },
    anyhow::{Context, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeableOrder {
    pub order: GPv2Order::Data,
    pub signature: Bytes,
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait ChainRead: Send + Sync {
    /// Whether `owner` authorized the single order `id`.
    async fn single_order(&self, owner: Address, id: B256) -> Result<bool>;

    /// The merkle root committed by `owner`.
    async fn root(&self, owner: Address) -> Result<B256>;

    async fn cabinet(&self, owner: Address, ctx: B256) -> Result<B256>;

    /// Asks the handler for the order that is tradeable right now along with
    /// its EIP-1271 signature. Reverts when there is none.
    async fn tradeable_order(
        &self,
        owner: Address,
        params: ConditionalOrderParams,
        off_chain_input: Bytes,
        proof: Vec<B256>,
    ) -> Result<TradeableOrder>;

    async fn latest_block(&self) -> Result<BlockInfo>;
}

/// [`ChainRead`] backed by a node.
pub struct AlloyChain {
    provider: DynProvider,
    composable_cow: ComposableCoW::ComposableCoWInstance<DynProvider>,
}

impl AlloyChain {
    pub fn new(provider: DynProvider) -> Self {
        Self::with_composable_cow(provider, COMPOSABLE_COW)
    }

    pub fn with_composable_cow(provider: DynProvider, composable_cow: Address) -> Self {
        Self {
            composable_cow: ComposableCoW::new(composable_cow, provider.clone()),
            provider,
        }
    }
}

#[async_trait::async_trait]
impl ChainRead for AlloyChain {
    async fn single_order(&self, owner: Address, id: B256) -> Result<bool> {
        self.composable_cow
            .singleOrders(owner, id)
            .call()
            .await
            .context("singleOrders")
    }

    async fn root(&self, owner: Address) -> Result<B256> {
        self.composable_cow
            .roots(owner)
            .call()
            .await
            .context("roots")
    }

    async fn cabinet(&self, owner: Address, ctx: B256) -> Result<B256> {
        self.composable_cow
            .cabinet(owner, ctx)
            .call()
            .await
            .context("cabinet")
    }

    async fn tradeable_order(
        &self,
        owner: Address,
        params: ConditionalOrderParams,
        off_chain_input: Bytes,
        proof: Vec<B256>,
    ) -> Result<TradeableOrder> {
        let result = self
            .composable_cow
            .getTradeableOrderWithSignature(owner, params, off_chain_input, proof)
            .call()
            .await
            .context("getTradeableOrderWithSignature")?;
        Ok(TradeableOrder {
            order: result.order,
            signature: result.signature,
        })
    }

    async fn latest_block(&self) -> Result<BlockInfo> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .context("failed to get latest block")?
            .context("no latest block")?;
        Ok(BlockInfo {
            block_number: block.header.number,
            block_timestamp: block.header.timestamp,
        })
    }
}
