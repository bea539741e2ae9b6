//! The settlement contract's order in the shape owners sign it, and the uid
//! the order book knows a signed order by.

pub mod order;

use alloy::{
    primitives::{Address, B256},
    sol_types::eip712_domain,
};

/// Separator of the settlement contract's EIP-712 domain on `chain_id`.
pub fn domain_separator(chain_id: u64, settlement: Address) -> B256 {
    eip712_domain! {
        name: "Gnosis Protocol",
        version: "v2",
        chain_id: chain_id,
        verifying_contract: settlement,
    }
    .separator()
}
