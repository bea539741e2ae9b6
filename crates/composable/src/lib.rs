//! Conditional orders for `ComposableCoW`: order identity and encoding, the
//! TWAP order family, merkle committed multiplexers and the polling logic
//! watchtowers use to find tradeable orders.

pub mod chain;
pub mod conditional_order;
pub mod contracts;
pub mod error;
pub mod merkle;
pub mod multiplexer;
pub mod order_book;
pub mod order_types;
pub mod poll;
pub mod util;

pub use {
    conditional_order::ConditionalOrder,
    multiplexer::{Multiplexer, ProofLocation},
    order_types::{Order, OrderCatalog, twap::Twap},
    poll::{PollParams, PollResult},
};
