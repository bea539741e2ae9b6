use {
    crate::contracts::GPv2Order,
    alloy::primitives::{Address, B256, keccak256},
    anyhow::{Context, Result},
    chrono::{DateTime, SecondsFormat},
    model::order::{BuyTokenDestination, Marker, Order, OrderKind, SellTokenSource},
    serde::{Deserialize, Deserializer, Serializer},
    serde_with::{DeserializeAs, SerializeAs},
};

/// Writes an [`Address`] with its EIP-55 checksum. Reads hex addresses in any
/// case.
pub struct ChecksummedAddress;

impl SerializeAs<Address> for ChecksummedAddress {
    fn serialize_as<S: Serializer>(source: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&source.to_checksum(None))
    }
}

impl<'de> DeserializeAs<'de, Address> for ChecksummedAddress {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        Address::deserialize(deserializer)
    }
}

/// Formats a unix timestamp as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format_epoch(epoch: u64) -> String {
    i64::try_from(epoch)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| "Invalid Date".to_string())
}

/// `keccak256` of 32 random bytes.
pub fn random_salt() -> B256 {
    keccak256(rand::random::<[u8; 32]>())
}

/// Converts the order returned by `getTradeableOrderWithSignature` into the
/// form it is signed in.
pub fn signed_order(order: &GPv2Order::Data) -> Result<Order> {
    Ok(Order {
        sellToken: order.sellToken,
        buyToken: order.buyToken,
        receiver: order.receiver,
        sellAmount: order.sellAmount,
        buyAmount: order.buyAmount,
        validTo: order.validTo,
        appData: order.appData,
        feeAmount: order.feeAmount,
        kind: marker_name::<OrderKind>(order.kind, "kind")?,
        partiallyFillable: order.partiallyFillable,
        sellTokenBalance: marker_name::<SellTokenSource>(order.sellTokenBalance, "sellTokenBalance")?,
        buyTokenBalance: marker_name::<BuyTokenDestination>(order.buyTokenBalance, "buyTokenBalance")?,
    })
}

fn marker_name<M: Marker>(hash: B256, field: &str) -> Result<String> {
    M::from_hash(hash)
        .map(|marker| marker.as_ref().to_owned())
        .with_context(|| format!("unknown {field} {hash}"))
}
