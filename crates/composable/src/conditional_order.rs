//! The behaviour shared by every conditional order type: identity, binary
//! encoding, on-chain calldata and the polling state machine.

use {
    crate::{
        chain::TradeableOrder,
        contracts::{ComposableCoW, ConditionalOrderParams, GPv2Order, SETTLEMENT},
        error::{ConstructionError, ValidationError},
        merkle,
        poll::{IsValid, OwnerContext, PollParams, PollResult},
        util,
    },
    alloy::{
        primitives::{Address, B256, Bytes, keccak256},
        sol_types::{SolCall, SolValue},
    },
    anyhow::Result,
    model::order::OrderUid,
    tracing::Instrument,
};

/// A context factory `ComposableCoW` calls when creating an order to populate
/// its cabinet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFactory {
    pub address: Address,
    /// ABI encoded arguments passed to the factory.
    pub factory_args: Bytes,
}

/// Identity of a leaf: `keccak256(abi.encode(params))`.
pub fn leaf_to_id(leaf: &ConditionalOrderParams) -> B256 {
    keccak256(encode_params(leaf))
}

pub fn encode_params(params: &ConditionalOrderParams) -> Bytes {
    params.abi_encode().into()
}

pub fn decode_params(encoded: &[u8]) -> Result<ConditionalOrderParams, ConstructionError> {
    ConditionalOrderParams::abi_decode(encoded)
        .map_err(|_| ConstructionError::InvalidSerializedConditionalOrder)
}

/// Parses a user supplied salt which must be exactly 32 bytes of `0x`
/// prefixed hex.
pub fn parse_salt(salt: &str) -> Result<B256, ConstructionError> {
    salt.strip_prefix("0x")
        .filter(|hex| hex.len() == 64)
        .and_then(|hex| const_hex::decode_to_array(hex).ok())
        .map(B256::new)
        .ok_or_else(|| ConstructionError::InvalidSalt(salt.to_string()))
}

#[async_trait::async_trait]
pub trait ConditionalOrder: Send + Sync {
    /// The handler contract that verifies orders of this type.
    fn handler(&self) -> Address;

    fn salt(&self) -> B256;

    /// Tag identifying the order type in serialized multiplexers.
    fn order_type(&self) -> &'static str;

    /// ABI encoding of the type specific static input.
    fn encode_static_input(&self) -> Bytes;

    /// Local validation, without any network calls.
    fn is_valid(&self) -> IsValid;

    fn has_off_chain_input(&self) -> bool {
        false
    }

    fn off_chain_input(&self) -> Bytes {
        Bytes::new()
    }

    fn context(&self) -> Option<ContextFactory> {
        None
    }

    fn leaf(&self) -> ConditionalOrderParams {
        ConditionalOrderParams {
            handler: self.handler(),
            salt: self.salt(),
            staticInput: self.encode_static_input(),
        }
    }

    fn id(&self) -> B256 {
        leaf_to_id(&self.leaf())
    }

    /// The cabinet slot of the order: its id for single orders, zero for
    /// orders committed through a merkle root.
    fn ctx(&self, is_single_order: bool) -> B256 {
        if is_single_order { self.id() } else { B256::ZERO }
    }

    fn serialize(&self) -> Bytes {
        encode_params(&self.leaf())
    }

    fn assert_is_valid(&self) -> Result<(), ValidationError> {
        match self.is_valid() {
            IsValid::Valid => Ok(()),
            IsValid::Invalid { reason } => Err(ValidationError(reason)),
        }
    }

    /// Calldata for `ComposableCoW.create` or, for orders with a context
    /// factory, `ComposableCoW.createWithContext`.
    fn create_calldata(&self) -> Result<Bytes, ValidationError> {
        self.assert_is_valid()?;
        let params = self.leaf();
        let calldata = match self.context() {
            Some(context) => ComposableCoW::createWithContextCall {
                params,
                factory: context.address,
                data: context.factory_args,
                dispatch: true,
            }
            .abi_encode(),
            None => ComposableCoW::createCall {
                params,
                dispatch: true,
            }
            .abi_encode(),
        };
        Ok(calldata.into())
    }

    fn remove_calldata(&self) -> Result<Bytes, ValidationError> {
        self.assert_is_valid()?;
        Ok(ComposableCoW::removeCall {
            singleOrderHash: self.id(),
        }
        .abi_encode()
        .into())
    }

    /// Whether the owner authorized the order on chain.
    async fn is_authorized(&self, ctx: &OwnerContext<'_>, proof: Option<&[B256]>) -> Result<bool> {
        match proof {
            Some(proof) => {
                let root = ctx.chain.root(ctx.owner).await?;
                Ok(merkle::verify(root, &self.leaf(), proof))
            }
            None => ctx.chain.single_order(ctx.owner, self.id()).await,
        }
    }

    async fn cabinet(&self, ctx: &OwnerContext<'_>) -> Result<B256> {
        ctx.chain
            .cabinet(ctx.owner, self.ctx(ctx.is_single_order))
            .await
    }

    /// Type specific checks run before asking the chain for a tradeable
    /// order. `None` lets the poll continue.
    async fn poll_validate(&self, params: &PollParams<'_>) -> Result<Option<PollResult>>;

    /// Decides what to do when the tradeable order is already in the order
    /// book. `None` falls back to retrying on the next block.
    async fn handle_poll_failed_already_present(
        &self,
        uid: &OrderUid,
        order: &GPv2Order::Data,
        params: &PollParams<'_>,
    ) -> Result<Option<PollResult>>;

    /// Checks whether the order can be posted to the order book right now.
    async fn poll(&self, params: &PollParams<'_>) -> PollResult {
        let span = tracing::debug_span!("poll", id = %self.id(), owner = %params.owner);
        let result = async {
            if let IsValid::Invalid { reason } = self.is_valid() {
                return PollResult::DontTryAgain {
                    reason: format!("InvalidConditionalOrder. Reason: {reason}"),
                };
            }
            poll_inner(self, params)
                .await
                .unwrap_or_else(PollResult::unexpected)
        }
        .instrument(span)
        .await;
        tracing::debug!(id = %self.id(), code = result.code(), reason = ?result.reason(), "polled");
        result
    }
}

async fn poll_inner<O: ConditionalOrder + ?Sized>(
    order: &O,
    params: &PollParams<'_>,
) -> Result<PollResult> {
    if let Some(result) = order.poll_validate(params).await? {
        return Ok(result);
    }

    let owner = params.owner_context();
    if !order.is_authorized(&owner, params.proof.as_deref()).await? {
        return Ok(PollResult::DontTryAgain {
            reason: format!(
                "NotAuthorized: Order {} is not authorized for {} on chain {}",
                order.id(),
                params.owner,
                params.chain_id
            ),
        });
    }

    let TradeableOrder {
        order: tradeable,
        signature,
    } = params
        .chain
        .tradeable_order(
            params.owner,
            order.leaf(),
            params
                .off_chain_input
                .clone()
                .unwrap_or_else(|| order.off_chain_input()),
            params.proof.clone().unwrap_or_default(),
        )
        .await?;

    let domain = model::domain_separator(params.chain_id, SETTLEMENT);
    let uid = util::signed_order(&tradeable)?.uid(domain, params.owner);
    let exists = match params.order_book.order_exists(&uid).await {
        Ok(exists) => exists,
        Err(err) => {
            tracing::warn!(?err, %uid, "failed to look up order in the order book");
            false
        }
    };
    if exists {
        return Ok(order
            .handle_poll_failed_already_present(&uid, &tradeable, params)
            .await?
            .unwrap_or_else(|| PollResult::TryNextBlock {
                reason: "Order already in orderbook".to_string(),
            }));
    }

    Ok(PollResult::Success {
        order: tradeable,
        signature,
    })
}
