//! The concrete conditional order families and the catalog used to restore
//! them from their JSON documents.

pub mod twap;

use {
    crate::{
        conditional_order::{ConditionalOrder, ContextFactory},
        contracts::GPv2Order,
        error::MultiplexerError,
        poll::{IsValid, PollParams, PollResult},
        util::ChecksummedAddress,
    },
    alloy::primitives::{Address, B256, Bytes},
    anyhow::Result,
    model::order::OrderUid,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    std::{collections::HashMap, fmt},
    twap::{TWAP_ORDER_TYPE, Twap, TwapData},
};

/// Every order family a multiplexer can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Twap(Twap),
}

impl From<Twap> for Order {
    fn from(twap: Twap) -> Self {
        Self::Twap(twap)
    }
}

impl Order {
    fn inner(&self) -> &dyn ConditionalOrder {
        match self {
            Self::Twap(twap) => twap,
        }
    }

    /// The JSON document this order is persisted as inside a multiplexer.
    pub fn to_document(&self) -> Result<OrderDocument, serde_json::Error> {
        let data = match self {
            Self::Twap(twap) => serde_json::to_value(twap.data())?,
        };
        Ok(OrderDocument {
            order_type: self.order_type().to_string(),
            handler: self.handler(),
            salt: self.salt(),
            data,
        })
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Twap(twap) => fmt::Display::fmt(twap, f),
        }
    }
}

#[async_trait::async_trait]
impl ConditionalOrder for Order {
    fn handler(&self) -> Address {
        self.inner().handler()
    }

    fn salt(&self) -> B256 {
        self.inner().salt()
    }

    fn order_type(&self) -> &'static str {
        self.inner().order_type()
    }

    fn encode_static_input(&self) -> Bytes {
        self.inner().encode_static_input()
    }

    fn is_valid(&self) -> IsValid {
        self.inner().is_valid()
    }

    fn has_off_chain_input(&self) -> bool {
        self.inner().has_off_chain_input()
    }

    fn off_chain_input(&self) -> Bytes {
        self.inner().off_chain_input()
    }

    fn context(&self) -> Option<ContextFactory> {
        self.inner().context()
    }

    async fn poll_validate(&self, params: &PollParams<'_>) -> Result<Option<PollResult>> {
        self.inner().poll_validate(params).await
    }

    async fn handle_poll_failed_already_present(
        &self,
        uid: &OrderUid,
        order: &GPv2Order::Data,
        params: &PollParams<'_>,
    ) -> Result<Option<PollResult>> {
        self.inner()
            .handle_poll_failed_already_present(uid, order, params)
            .await
    }
}

/// Type tagged JSON form of an order.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    pub order_type: String,
    #[serde_as(as = "ChecksummedAddress")]
    pub handler: Address,
    pub salt: B256,
    pub data: serde_json::Value,
}

pub type OrderDeserializer = fn(OrderDocument) -> Result<Order, MultiplexerError>;

/// The order types a multiplexer accepts, keyed by their type tag.
#[derive(Debug, Clone)]
pub struct OrderCatalog(HashMap<&'static str, OrderDeserializer>);

impl OrderCatalog {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, order_type: &'static str, deserializer: OrderDeserializer) -> Self {
        self.0.insert(order_type, deserializer);
        self
    }

    pub fn contains(&self, order_type: &str) -> bool {
        self.0.contains_key(order_type)
    }

    pub fn order_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn deserialize(&self, document: OrderDocument) -> Result<Order, MultiplexerError> {
        let deserializer = self
            .0
            .get(document.order_type.as_str())
            .ok_or_else(|| MultiplexerError::UnknownOrderType(document.order_type.clone()))?;
        deserializer(document)
    }
}

impl Default for OrderCatalog {
    fn default() -> Self {
        Self::empty().with(TWAP_ORDER_TYPE, twap_from_document)
    }
}

fn twap_from_document(document: OrderDocument) -> Result<Order, MultiplexerError> {
    let data: TwapData =
        serde_json::from_value(document.data).map_err(MultiplexerError::InvalidOrderData)?;
    let twap = Twap::new(document.handler, data, Some(&document.salt.to_string()))?;
    Ok(twap.into())
}
