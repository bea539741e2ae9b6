//! Remembers when each order wants to be polled next.

use {
    alloy::primitives::B256,
    composable::{PollResult, poll::BlockInfo},
    std::collections::HashMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// On the next run.
    Block,
    /// Once a block at or after this timestamp was mined.
    Epoch(u64),
    /// Once this block was mined.
    BlockNumber(u64),
    Never,
}

impl Next {
    fn is_due(&self, block: &BlockInfo) -> bool {
        match *self {
            Self::Block => true,
            Self::Epoch(epoch) => block.block_timestamp >= epoch,
            Self::BlockNumber(number) => block.block_number >= number,
            Self::Never => false,
        }
    }
}

impl From<&PollResult> for Next {
    fn from(result: &PollResult) -> Self {
        match result {
            PollResult::Success { .. }
            | PollResult::TryNextBlock { .. }
            | PollResult::UnexpectedError { .. } => Self::Block,
            PollResult::TryAtEpoch { epoch, .. } => Self::Epoch(*epoch),
            PollResult::TryOnBlock { block_number, .. } => Self::BlockNumber(*block_number),
            PollResult::DontTryAgain { .. } => Self::Never,
        }
    }
}

#[derive(Debug, Default)]
pub struct Schedule(HashMap<B256, Next>);

impl Schedule {
    /// Orders that were never polled are always due.
    pub fn is_due(&self, id: &B256, block: &BlockInfo) -> bool {
        self.0.get(id).is_none_or(|next| next.is_due(block))
    }

    pub fn record(&mut self, id: B256, result: &PollResult) {
        self.0.insert(id, result.into());
    }

    pub fn next(&self, id: &B256) -> Option<Next> {
        self.0.get(id).copied()
    }

    /// Number of orders that will never be polled again.
    pub fn finished(&self) -> usize {
        self.0.values().filter(|next| **next == Next::Never).count()
    }
}
