//! Many conditional orders committed on chain through a single merkle root.
//!
//! A [`Multiplexer`] keeps its orders in insertion order, keyed by order id,
//! and lazily builds the merkle tree over their leaves. The tree is dropped on
//! every mutation and rebuilt the next time it is needed.

use {
    crate::{
        chain::{ChainRead, TradeableOrder},
        conditional_order::ConditionalOrder,
        contracts::{ComposableCoW, ConditionalOrderParams, ProofWithParams},
        error::{MultiplexerError, ProofStructError, ProofStructErrorKind},
        merkle::StandardMerkleTree,
        order_types::{Order, OrderCatalog, OrderDocument},
        util::ChecksummedAddress,
    },
    alloy::{
        primitives::{Address, B256, Bytes, U256},
        sol_types::{SolCall, SolValue},
    },
    anyhow::Result,
    indexmap::IndexMap,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    std::{cell::OnceCell, fmt},
    thiserror::Error,
};

/// Where the proofs of a root are published, as understood by watchtowers
/// indexing `ComposableCoW.MerkleRootSet` events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ProofLocation {
    #[default]
    Private = 0,
    Emitted = 1,
    Swarm = 2,
    Waku = 3,
    Reserved = 4,
    Ipfs = 5,
}

#[derive(Debug, Error)]
#[error("unknown proof location {0}")]
pub struct UnknownProofLocation(pub u8);

impl TryFrom<u8> for ProofLocation {
    type Error = UnknownProofLocation;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Private,
            1 => Self::Emitted,
            2 => Self::Swarm,
            3 => Self::Waku,
            4 => Self::Reserved,
            5 => Self::Ipfs,
            _ => return Err(UnknownProofLocation(value)),
        })
    }
}

impl From<ProofLocation> for u8 {
    fn from(location: ProofLocation) -> Self {
        location as u8
    }
}

impl fmt::Display for ProofLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Publishes proofs to decentralized storage.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads the JSON encoded proofs and returns a `0x` prefixed hex pointer
    /// to them.
    async fn upload(&self, data: String) -> Result<String>;
}

/// Supplies the off-chain input of orders that need one.
#[mockall::automock]
#[async_trait::async_trait]
pub trait OffChainInputProvider: Send + Sync {
    async fn off_chain_input(&self, owner: Address, params: &ConditionalOrderParams)
    -> Result<Bytes>;
}

pub type ProofFilter<'a> = &'a dyn Fn(&ConditionalOrderParams) -> bool;

#[derive(Debug, Clone)]
pub struct Multiplexer {
    chain: u64,
    location: ProofLocation,
    orders: IndexMap<B256, Order>,
    tree: OnceCell<StandardMerkleTree>,
}

/// JSON form of a multiplexer. The tree is not persisted, only its root.
#[derive(Serialize, Deserialize)]
struct Document {
    chain: u64,
    location: ProofLocation,
    orders: IndexMap<B256, OrderDocument>,
    root: B256,
}

/// A proof as published for watchtowers and indexers.
#[derive(Serialize, Deserialize)]
struct ProofDocument {
    proof: Vec<B256>,
    params: ParamsDocument,
}

#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParamsDocument {
    #[serde_as(as = "ChecksummedAddress")]
    handler: Address,
    salt: B256,
    static_input: Bytes,
}

impl From<ProofWithParams> for ProofDocument {
    fn from(ProofWithParams { proof, params }: ProofWithParams) -> Self {
        Self {
            proof,
            params: ParamsDocument {
                handler: params.handler,
                salt: params.salt,
                static_input: params.staticInput,
            },
        }
    }
}

impl From<ProofDocument> for ProofWithParams {
    fn from(ProofDocument { proof, params }: ProofDocument) -> Self {
        Self {
            proof,
            params: ConditionalOrderParams {
                handler: params.handler,
                salt: params.salt,
                staticInput: params.static_input,
            },
        }
    }
}

impl Multiplexer {
    pub fn empty(chain: u64) -> Self {
        Self {
            chain,
            location: ProofLocation::Private,
            orders: IndexMap::new(),
            tree: OnceCell::new(),
        }
    }

    /// Restores a multiplexer from orders and the root they were committed
    /// under. The root is recomputed and has to match.
    pub fn new(
        chain: u64,
        orders: Option<Vec<Order>>,
        root: Option<B256>,
        location: ProofLocation,
        catalog: &OrderCatalog,
    ) -> Result<Self, MultiplexerError> {
        let mut multiplexer = Self {
            location,
            ..Self::empty(chain)
        };
        let (orders, root) = match (orders, root) {
            (Some(orders), _) if orders.is_empty() => return Err(MultiplexerError::EmptyOrders),
            (Some(orders), Some(root)) => (orders, root),
            (None, None) => return Ok(multiplexer),
            _ => return Err(MultiplexerError::MissingRoot),
        };

        for order in orders {
            if !catalog.contains(order.order_type()) {
                return Err(MultiplexerError::UnknownOrderType(
                    order.order_type().to_string(),
                ));
            }
            multiplexer.orders.insert(order.id(), order);
        }

        if multiplexer.root()? != root {
            return Err(MultiplexerError::RootMismatch);
        }
        Ok(multiplexer)
    }

    pub fn chain(&self) -> u64 {
        self.chain
    }

    pub fn location(&self) -> ProofLocation {
        self.location
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn tree(&self) -> Result<&StandardMerkleTree, MultiplexerError> {
        if let Some(tree) = self.tree.get() {
            return Ok(tree);
        }
        let tree = StandardMerkleTree::of(self.orders.values().map(|order| order.leaf()).collect())?;
        Ok(self.tree.get_or_init(|| tree))
    }

    fn reset(&mut self) {
        self.tree = OnceCell::new();
    }

    pub fn root(&self) -> Result<B256, MultiplexerError> {
        Ok(self.tree()?.root())
    }

    pub fn add(&mut self, order: impl Into<Order>) -> Result<(), MultiplexerError> {
        let order = order.into();
        order.assert_is_valid()?;
        self.orders.insert(order.id(), order);
        self.reset();
        Ok(())
    }

    /// Removes the order with `id`, if there is one.
    pub fn remove(&mut self, id: B256) {
        if self.orders.shift_remove(&id).is_some() {
            self.reset();
        }
    }

    /// Replaces the order with `id` by what `updater` makes of it. The new
    /// order may have a different id and moves to the end.
    pub fn update(
        &mut self,
        id: B256,
        updater: impl FnOnce(&Order) -> Order,
    ) -> Result<(), MultiplexerError> {
        let order = self
            .orders
            .shift_remove(&id)
            .ok_or(MultiplexerError::IdNotFound(id))?;
        let updated = updater(&order);
        self.orders.insert(updated.id(), updated);
        self.reset();
        Ok(())
    }

    pub fn get_by_id(&self, id: B256) -> Result<&Order, MultiplexerError> {
        self.orders.get(&id).ok_or(MultiplexerError::IdNotFound(id))
    }

    pub fn get_by_index(&self, index: usize) -> Result<&Order, MultiplexerError> {
        self.orders
            .get_index(index)
            .map(|(_, order)| order)
            .ok_or(MultiplexerError::IndexNotFound(index))
    }

    pub fn order_ids(&self) -> impl Iterator<Item = B256> + '_ {
        self.orders.keys().copied()
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Proofs of the orders accepted by `filter`, in insertion order.
    pub fn get_proofs(
        &self,
        filter: Option<ProofFilter<'_>>,
    ) -> Result<Vec<ProofWithParams>, MultiplexerError> {
        let tree = self.tree()?;
        tree.entries()
            .filter(|(_, leaf)| filter.is_none_or(|filter| filter(*leaf)))
            .map(|(index, leaf)| {
                Ok(ProofWithParams {
                    proof: tree.get_proof(index)?,
                    params: leaf.clone(),
                })
            })
            .collect()
    }

    /// JSON encoded proofs for watchtowers and indexers. Depending on
    /// `filter` this may not include every order.
    pub fn dump_proofs(&self, filter: Option<ProofFilter<'_>>) -> Result<String, MultiplexerError> {
        self.encode_to_json(filter)
    }

    pub fn dump_proofs_and_params(
        &self,
        filter: Option<ProofFilter<'_>>,
    ) -> Result<Vec<ProofWithParams>, MultiplexerError> {
        self.get_proofs(filter)
    }

    pub fn encode_to_json(
        &self,
        filter: Option<ProofFilter<'_>>,
    ) -> Result<String, MultiplexerError> {
        let documents = self
            .get_proofs(filter)?
            .into_iter()
            .map(ProofDocument::from)
            .collect::<Vec<_>>();
        Ok(serde_json::to_string(&documents)?)
    }

    pub fn decode_from_json(json: &str) -> Result<Vec<ProofWithParams>, MultiplexerError> {
        let documents: Vec<ProofDocument> = serde_json::from_str(json)?;
        Ok(documents.into_iter().map(ProofWithParams::from).collect())
    }

    /// ABI encoding of `tuple(bytes32[] proof, tuple(address, bytes32, bytes)
    /// params)[]`, the payload of proofs emitted on chain.
    pub fn encode_to_abi(&self, filter: Option<ProofFilter<'_>>) -> Result<Bytes, MultiplexerError> {
        Ok(self.get_proofs(filter)?.abi_encode().into())
    }

    /// Builds the proof argument of `ComposableCoW.setRoot`, uploading the
    /// proofs first for locations backed by decentralized storage. The
    /// multiplexer's location is only updated when this succeeds.
    pub async fn prepare_proof_struct(
        &mut self,
        location: Option<ProofLocation>,
        filter: Option<ProofFilter<'_>>,
        uploader: Option<&dyn Uploader>,
    ) -> Result<ComposableCoW::Proof, ProofStructError> {
        let location = location.unwrap_or(self.location);
        let data = match location {
            ProofLocation::Private => Bytes::new(),
            ProofLocation::Emitted => self.encode_to_abi(filter).map_err(ProofStructErrorKind::from)?,
            ProofLocation::Swarm | ProofLocation::Waku | ProofLocation::Ipfs => {
                let uploader = uploader.ok_or(ProofStructErrorKind::MissingUploader)?;
                let json = self
                    .encode_to_json(filter)
                    .map_err(ProofStructErrorKind::from)?;
                let pointer = uploader
                    .upload(json)
                    .await
                    .map_err(|source| ProofStructErrorKind::Upload { location, source })?;
                tracing::debug!(%location, %pointer, "uploaded proofs");
                pointer
                    .strip_prefix("0x")
                    .and_then(|hex| const_hex::decode(hex).ok())
                    .ok_or(ProofStructErrorKind::InvalidData)?
                    .into()
            }
            ProofLocation::Reserved => return Err(ProofStructErrorKind::UnsupportedLocation.into()),
        };

        self.location = location;
        Ok(ComposableCoW::Proof {
            location: U256::from(u8::from(location)),
            data,
        })
    }

    /// Calldata committing this multiplexer's root on chain.
    pub fn set_root_calldata(&self, proof: ComposableCoW::Proof) -> Result<Bytes, MultiplexerError> {
        Ok(ComposableCoW::setRootCall {
            root: self.root()?,
            proof,
        }
        .abi_encode()
        .into())
    }

    /// Asks `ComposableCoW` for the tradeable order of a merkle committed
    /// order, without any of the checks [`ConditionalOrder::poll`] does.
    pub async fn poll(
        owner: Address,
        proof: &ProofWithParams,
        chain: &dyn ChainRead,
        off_chain_input: Option<&dyn OffChainInputProvider>,
    ) -> Result<TradeableOrder> {
        let off_chain_input = match off_chain_input {
            Some(provider) => provider.off_chain_input(owner, &proof.params).await?,
            None => Bytes::new(),
        };
        chain
            .tradeable_order(
                owner,
                proof.params.clone(),
                off_chain_input,
                proof.proof.clone(),
            )
            .await
    }

    pub fn to_json(&self) -> Result<String, MultiplexerError> {
        let orders = self
            .orders
            .iter()
            .map(|(id, order)| Ok((*id, order.to_document()?)))
            .collect::<Result<_, serde_json::Error>>()?;
        let document = Document {
            chain: self.chain,
            location: self.location,
            orders,
            root: self.root()?,
        };
        Ok(serde_json::to_string(&document)?)
    }

    /// Inverse of [`Multiplexer::to_json`]. Every order type has to be in
    /// `catalog`.
    pub fn from_json(json: &str, catalog: &OrderCatalog) -> Result<Self, MultiplexerError> {
        let document: Document = serde_json::from_str(json)?;
        let orders = document
            .orders
            .into_values()
            .map(|order| catalog.deserialize(order))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            document.chain,
            Some(orders),
            Some(document.root),
            document.location,
            catalog,
        )
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            contracts::GPv2Order,
            merkle,
            order_types::twap::{DurationOfPart, StartTime, Twap, TwapData},
        },
        alloy::primitives::{I256, address},
        mockall::predicate::eq,
        model::order::{BuyTokenDestination, Marker, OrderKind, SellTokenSource},
    };

    fn int(value: i64) -> I256 {
        I256::try_from(value).unwrap()
    }

    fn twap(salt: u8) -> Twap {
        Twap::with_salt(
            TwapData {
                sell_token: address!("6810e776880c02933d47db1b9fc05908e5386b96"),
                buy_token: address!("dae5f1590db13e3b40423b5b5c5fbf175515910b"),
                receiver: Address::ZERO,
                sell_amount: int(1_000_000),
                buy_amount: int(10_000),
                start_time: StartTime::AtEpoch {
                    epoch: int(1700000000),
                },
                number_of_parts: int(10),
                time_between_parts: int(3600),
                duration_of_part: DurationOfPart::Auto,
                app_data: B256::ZERO,
            },
            B256::repeat_byte(salt),
        )
    }

    fn multiplexer() -> Multiplexer {
        let mut multiplexer = Multiplexer::empty(1);
        for salt in 1..=3 {
            multiplexer.add(twap(salt)).unwrap();
        }
        multiplexer
    }

    #[test]
    fn construction() {
        let catalog = OrderCatalog::default();
        let orders = || Some(vec![Order::from(twap(1)), Order::from(twap(2))]);
        let root = {
            let mut multiplexer = Multiplexer::empty(1);
            multiplexer.add(twap(1)).unwrap();
            multiplexer.add(twap(2)).unwrap();
            multiplexer.root().unwrap()
        };

        let empty = Multiplexer::new(1, None, None, ProofLocation::Private, &catalog).unwrap();
        assert!(empty.is_empty());
        assert_eq!(
            empty.root().unwrap_err().to_string(),
            "Expected non-zero number of leaves"
        );

        let restored =
            Multiplexer::new(1, orders(), Some(root), ProofLocation::Emitted, &catalog).unwrap();
        assert_eq!(restored.root().unwrap(), root);
        assert_eq!(restored.location(), ProofLocation::Emitted);
        assert_eq!(restored.len(), 2);

        let error = |orders, root, catalog: &OrderCatalog| {
            Multiplexer::new(1, orders, root, ProofLocation::Private, catalog)
                .unwrap_err()
                .to_string()
        };
        assert_eq!(
            error(Some(vec![]), Some(root), &catalog),
            "orders must have non-zero length"
        );
        assert_eq!(
            error(orders(), None, &catalog),
            "orders cannot have undefined root"
        );
        assert_eq!(
            error(None, Some(root), &catalog),
            "orders cannot have undefined root"
        );
        assert_eq!(
            error(orders(), Some(B256::repeat_byte(1)), &catalog),
            "root mismatch"
        );
        assert_eq!(
            error(orders(), Some(root), &OrderCatalog::empty()),
            "Unknown order type: twap"
        );
    }

    #[test]
    fn crud() {
        let mut multiplexer = multiplexer();
        let ids = multiplexer.order_ids().collect::<Vec<_>>();
        assert_eq!(ids, vec![twap(1).id(), twap(2).id(), twap(3).id()]);
        assert_eq!(multiplexer.get_by_index(1).unwrap(), &Order::from(twap(2)));
        assert_eq!(multiplexer.get_by_id(ids[2]).unwrap(), &Order::from(twap(3)));
        assert_eq!(
            multiplexer.get_by_index(10).unwrap_err().to_string(),
            "Order with index 10 not found"
        );

        let root = multiplexer.root().unwrap();
        multiplexer.remove(B256::repeat_byte(0xff));
        assert_eq!(multiplexer.root().unwrap(), root);

        multiplexer.remove(ids[0]);
        assert_eq!(multiplexer.len(), 2);
        assert_ne!(multiplexer.root().unwrap(), root);
        assert_eq!(
            multiplexer.get_by_id(ids[0]).unwrap_err().to_string(),
            format!("Order with id {} not found", ids[0])
        );

        let mut single = Multiplexer::empty(1);
        let order = twap(1);
        single.add(order.clone()).unwrap();
        assert_eq!(single.order_ids().collect::<Vec<_>>(), vec![order.id()]);
        single.remove(order.id());
        assert_eq!(single.order_ids().count(), 0);
        assert!(single.is_empty());
    }

    #[test]
    fn update_replaces_order_and_root() {
        let mut multiplexer = multiplexer();
        let root = multiplexer.root().unwrap();
        let old = twap(1).id();
        let new = twap(4).id();

        multiplexer
            .update(old, |order| {
                assert_eq!(order.id(), old);
                twap(4).into()
            })
            .unwrap();

        assert_ne!(multiplexer.root().unwrap(), root);
        assert!(multiplexer.get_by_id(old).is_err());
        assert_eq!(multiplexer.order_ids().last(), Some(new));

        let missing = B256::repeat_byte(0xff);
        assert_eq!(
            multiplexer
                .update(missing, |order| order.clone())
                .unwrap_err()
                .to_string(),
            format!("Order with id {missing} not found")
        );
    }

    #[test]
    fn add_rejects_invalid_orders() {
        let mut multiplexer = Multiplexer::empty(1);
        let invalid = Twap::with_salt(
            TwapData {
                number_of_parts: int(1),
                ..twap(1).data().clone()
            },
            B256::ZERO,
        );
        assert_eq!(
            multiplexer.add(invalid).unwrap_err().to_string(),
            "Invalid order: InvalidNumParts"
        );
        assert!(multiplexer.is_empty());
    }

    #[test]
    fn proofs_verify_against_root() {
        let multiplexer = multiplexer();
        let root = multiplexer.root().unwrap();
        let proofs = multiplexer.get_proofs(None).unwrap();
        assert_eq!(proofs.len(), 3);
        for (proof, order) in proofs.iter().zip(multiplexer.orders()) {
            assert_eq!(proof.params, order.leaf());
            assert!(merkle::verify(root, &proof.params, &proof.proof));
        }

        let only_second = |leaf: &ConditionalOrderParams| leaf.salt == B256::repeat_byte(2);
        let filtered = multiplexer.get_proofs(Some(&only_second)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0], proofs[1]);
        assert_eq!(
            multiplexer.dump_proofs_and_params(Some(&only_second)).unwrap(),
            filtered
        );
    }

    #[test]
    fn proof_encodings() {
        let multiplexer = multiplexer();
        let proofs = multiplexer.get_proofs(None).unwrap();

        let json = multiplexer.dump_proofs(None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value[0]["params"]["handler"],
            crate::contracts::TWAP_HANDLER.to_string()
        );
        assert!(value[0]["params"]["staticInput"].is_string());
        assert_eq!(Multiplexer::decode_from_json(&json).unwrap(), proofs);
        let handler = crate::contracts::TWAP_HANDLER.to_string();
        let lowercase = json.replace(&handler, &handler.to_lowercase());
        assert_ne!(lowercase, json);
        assert_eq!(Multiplexer::decode_from_json(&lowercase).unwrap(), proofs);

        let abi = multiplexer.encode_to_abi(None).unwrap();
        assert_eq!(Vec::<ProofWithParams>::abi_decode(&abi).unwrap(), proofs);
    }

    #[test]
    fn json_round_trip() {
        let mut multiplexer = multiplexer();
        multiplexer.location = ProofLocation::Ipfs;
        let json = multiplexer.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["chain"], 1);
        assert_eq!(value["location"], 5);
        assert!(value.get("tree").is_none());
        let id = twap(1).id().to_string();
        assert_eq!(value["orders"][&id]["orderType"], "twap");
        assert_eq!(
            value["orders"][&id]["handler"],
            "0x6cF1e9cA41f7611dEf408122793c358a3d11E5a5"
        );
        assert_eq!(value["orders"][&id]["data"]["sellAmount"], "1000000");

        let restored = Multiplexer::from_json(&json, &OrderCatalog::default()).unwrap();
        assert_eq!(restored.root().unwrap(), multiplexer.root().unwrap());
        assert_eq!(restored.location(), ProofLocation::Ipfs);
        assert_eq!(restored.chain(), 1);
        assert!(restored.orders().eq(multiplexer.orders()));
    }

    #[test]
    fn from_json_checks_integrity() {
        let json = multiplexer().to_json().unwrap();

        assert_eq!(
            Multiplexer::from_json(&json, &OrderCatalog::empty())
                .unwrap_err()
                .to_string(),
            "Unknown order type: twap"
        );

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["root"] = B256::repeat_byte(1).to_string().into();
        assert_eq!(
            Multiplexer::from_json(&value.to_string(), &OrderCatalog::default())
                .unwrap_err()
                .to_string(),
            "root mismatch"
        );
    }

    #[test]
    fn set_root_calldata() {
        let multiplexer = multiplexer();
        let proof = ComposableCoW::Proof {
            location: U256::ZERO,
            data: Bytes::new(),
        };
        let calldata = multiplexer.set_root_calldata(proof.clone()).unwrap();
        let call = ComposableCoW::setRootCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.root, multiplexer.root().unwrap());
        assert_eq!(call.proof, proof);
    }

    #[tokio::test]
    async fn prepare_private_and_emitted() {
        let mut multiplexer = multiplexer();

        let proof = multiplexer
            .prepare_proof_struct(Some(ProofLocation::Emitted), None, None)
            .await
            .unwrap();
        assert_eq!(proof.location, U256::from(1));
        assert_eq!(proof.data, multiplexer.encode_to_abi(None).unwrap());
        assert_eq!(multiplexer.location(), ProofLocation::Emitted);

        let proof = multiplexer
            .prepare_proof_struct(Some(ProofLocation::Private), None, None)
            .await
            .unwrap();
        assert_eq!(proof.location, U256::ZERO);
        assert!(proof.data.is_empty());
        assert_eq!(multiplexer.location(), ProofLocation::Private);
    }

    #[tokio::test]
    async fn prepare_uploaded() {
        let mut multiplexer = multiplexer();
        let json = multiplexer.encode_to_json(None).unwrap();
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .with(eq(json))
            .times(1)
            .returning(|_| Ok("0xdeadbeef".to_string()));

        let proof = multiplexer
            .prepare_proof_struct(Some(ProofLocation::Ipfs), None, Some(&uploader))
            .await
            .unwrap();
        assert_eq!(proof.location, U256::from(5));
        assert_eq!(proof.data, Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(multiplexer.location(), ProofLocation::Ipfs);
    }

    #[tokio::test]
    async fn prepare_errors() {
        let mut multiplexer = multiplexer();

        let error = multiplexer
            .prepare_proof_struct(Some(ProofLocation::Swarm), None, None)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Error preparing proof struct: Must provide an uploader function"
        );

        let mut failing = MockUploader::new();
        failing
            .expect_upload()
            .returning(|_| Err(anyhow::anyhow!("bee node unreachable")));
        let error = multiplexer
            .prepare_proof_struct(Some(ProofLocation::Swarm), None, Some(&failing))
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Error preparing proof struct: Error uploading to decentralized storage 2: bee node \
             unreachable"
        );

        let mut garbage = MockUploader::new();
        garbage
            .expect_upload()
            .returning(|_| Ok("cowtomoon".to_string()));
        let error = multiplexer
            .prepare_proof_struct(Some(ProofLocation::Waku), None, Some(&garbage))
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Error preparing proof struct: data returned by uploader is invalid"
        );

        let error = multiplexer
            .prepare_proof_struct(Some(ProofLocation::Reserved), None, None)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Error preparing proof struct: Unsupported location"
        );

        let error = Multiplexer::empty(1)
            .prepare_proof_struct(Some(ProofLocation::Emitted), None, None)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Error preparing proof struct: Expected non-zero number of leaves"
        );

        assert_eq!(multiplexer.location(), ProofLocation::Private);
    }

    #[test]
    fn proof_locations() {
        assert_eq!(ProofLocation::default(), ProofLocation::Private);
        assert_eq!(ProofLocation::Ipfs.to_string(), "5");
        assert_eq!(ProofLocation::try_from(3).unwrap(), ProofLocation::Waku);
        assert!(ProofLocation::try_from(6).is_err());
        assert_eq!(
            serde_json::from_str::<ProofLocation>("2").unwrap(),
            ProofLocation::Swarm
        );
        assert!(serde_json::from_str::<ProofLocation>("9").is_err());
    }

    #[tokio::test]
    async fn poll_asks_for_the_tradeable_order() {
        let multiplexer = multiplexer();
        let proof = multiplexer.get_proofs(None).unwrap().remove(0);
        let owner = Address::repeat_byte(0x42);
        let order = GPv2Order::Data {
            sellToken: Address::repeat_byte(1),
            buyToken: Address::repeat_byte(2),
            receiver: Address::ZERO,
            sellAmount: U256::from(100_000),
            buyAmount: U256::from(1000),
            validTo: 1700003600,
            appData: B256::ZERO,
            feeAmount: U256::ZERO,
            kind: OrderKind::Sell.hash(),
            partiallyFillable: false,
            sellTokenBalance: SellTokenSource::Erc20.hash(),
            buyTokenBalance: BuyTokenDestination::Erc20.hash(),
        };

        let mut input = MockOffChainInputProvider::new();
        let params = proof.params.clone();
        input
            .expect_off_chain_input()
            .withf(move |o, p| *o == owner && *p == params)
            .returning(|_, _| Ok(Bytes::from_static(&[1, 2, 3])));

        let mut chain = crate::chain::MockChainRead::new();
        let expected = proof.clone();
        let tradeable = TradeableOrder {
            order,
            signature: Bytes::from_static(&[0xca, 0xfe]),
        };
        let returned = tradeable.clone();
        chain
            .expect_tradeable_order()
            .withf(move |o, params, input, proof| {
                *o == owner
                    && *params == expected.params
                    && input[..] == [1u8, 2, 3]
                    && *proof == expected.proof
            })
            .times(1)
            .returning(move |_, _, _, _| Ok(returned.clone()));

        let result = Multiplexer::poll(owner, &proof, &chain, Some(&input))
            .await
            .unwrap();
        assert_eq!(result, tradeable);
    }
}
