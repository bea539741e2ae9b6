//! Inputs and outcomes of polling a conditional order.

use {
    crate::{chain::ChainRead, contracts::GPv2Order, order_book::OrderBookApi},
    alloy::primitives::{Address, B256, Bytes},
    anyhow::Result,
    strum::IntoStaticStr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub block_number: u64,
    pub block_timestamp: u64,
}

/// Who owns the order and where to read its on-chain state.
#[derive(Clone, Copy)]
pub struct OwnerContext<'a> {
    pub owner: Address,
    pub chain_id: u64,
    pub chain: &'a dyn ChainRead,
    /// Whether the order was created with `ComposableCoW.create` rather than
    /// committed through a merkle root.
    pub is_single_order: bool,
}

pub struct PollParams<'a> {
    pub owner: Address,
    pub chain_id: u64,
    pub chain: &'a dyn ChainRead,
    pub order_book: &'a dyn OrderBookApi,
    /// Inclusion proof for orders committed through a merkle root. `None` for
    /// single orders.
    pub proof: Option<Vec<B256>>,
    /// Overrides the order's own off-chain input.
    pub off_chain_input: Option<Bytes>,
    /// The block to evaluate the order at. The latest block is fetched when
    /// missing.
    pub block_info: Option<BlockInfo>,
}

impl<'a> PollParams<'a> {
    pub fn owner_context(&self) -> OwnerContext<'a> {
        OwnerContext {
            owner: self.owner,
            chain_id: self.chain_id,
            chain: self.chain,
            is_single_order: self.proof.is_none(),
        }
    }

    pub async fn block_info(&self) -> Result<BlockInfo> {
        match self.block_info {
            Some(block_info) => Ok(block_info),
            None => self.chain.latest_block().await,
        }
    }
}

/// Outcome of a poll. Every poll produces exactly one of these, including when
/// something unexpected went wrong.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PollResult {
    /// The order can be posted to the order book right now.
    Success {
        order: GPv2Order::Data,
        signature: Bytes,
    },
    TryAtEpoch {
        epoch: u64,
        reason: String,
    },
    TryNextBlock {
        reason: String,
    },
    TryOnBlock {
        block_number: u64,
        reason: String,
    },
    DontTryAgain {
        reason: String,
    },
    UnexpectedError {
        reason: Option<String>,
        error: Option<String>,
    },
}

impl PollResult {
    pub fn code(&self) -> &'static str {
        self.into()
    }

    pub fn unexpected(err: anyhow::Error) -> Self {
        Self::UnexpectedError {
            reason: None,
            error: Some(format!("{err:#}")),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::TryAtEpoch { reason, .. }
            | Self::TryNextBlock { reason }
            | Self::TryOnBlock { reason, .. }
            | Self::DontTryAgain { reason } => Some(reason),
            Self::UnexpectedError { reason, .. } => reason.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsValid {
    Valid,
    Invalid { reason: String },
}

impl IsValid {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}
