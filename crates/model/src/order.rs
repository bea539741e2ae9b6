use {
    alloy::{
        primitives::{Address, B256, FixedBytes, keccak256},
        sol,
        sol_types::SolStruct,
    },
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
    strum::{AsRefStr, EnumIter, IntoEnumIterator},
};

sol! {
    /// `GPv2Order.Data` with the kind and balance markers spelled out as
    /// names, which is how its EIP-712 type is declared.
    #[derive(Debug, PartialEq, Eq)]
    struct Order {
        address sellToken;
        address buyToken;
        address receiver;
        uint256 sellAmount;
        uint256 buyAmount;
        uint32 validTo;
        bytes32 appData;
        uint256 feeAmount;
        string kind;
        bool partiallyFillable;
        string sellTokenBalance;
        string buyTokenBalance;
    }
}

impl Order {
    /// The uid of this order once `owner` signed it in the domain with
    /// `domain_separator`.
    pub fn uid(&self, domain_separator: B256, owner: Address) -> OrderUid {
        let digest = keccak256(
            [
                &[0x19, 0x01][..],
                domain_separator.as_slice(),
                self.eip712_hash_struct().as_slice(),
            ]
            .concat(),
        );
        OrderUid::from_parts(digest, owner, self.validTo)
    }
}

/// Order fields the contract stores as the `keccak256` of a name.
pub trait Marker: AsRef<str> + IntoEnumIterator + Copy {
    fn hash(self) -> B256 {
        let name: &str = self.as_ref();
        keccak256(name)
    }

    fn from_hash(hash: B256) -> Option<Self> {
        Self::iter().find(|marker| marker.hash() == hash)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OrderKind {
    Sell,
    Buy,
}

impl Marker for OrderKind {}

/// Where the sell amount is taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SellTokenSource {
    Erc20,
    External,
    Internal,
}

impl Marker for SellTokenSource {}

/// Where the buy amount is paid to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BuyTokenDestination {
    Erc20,
    Internal,
}

impl Marker for BuyTokenDestination {}

/// Order digest, owner and `validTo` packed into 56 bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderUid(pub FixedBytes<56>);

impl OrderUid {
    pub fn from_parts(digest: B256, owner: Address, valid_to: u32) -> Self {
        Self(FixedBytes::from_slice(
            &[
                digest.as_slice(),
                owner.as_slice(),
                &valid_to.to_be_bytes(),
            ]
            .concat(),
        ))
    }

    pub fn owner(&self) -> Address {
        Address::from_slice(&self.0[32..52])
    }
}

impl FromStr for OrderUid {
    type Err = <FixedBytes<56> as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
