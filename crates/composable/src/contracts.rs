//! Bindings and deployment addresses of the contracts conditional orders
//! interact with. All of them are deployed at the same address on every
//! supported chain.

use alloy::{
    primitives::{Address, address},
    sol,
};

/// `ComposableCoW`, the registry of conditional orders owned by safes.
pub const COMPOSABLE_COW: Address = address!("fdaFc9d1902f4e0b84f65F49f244b32b31013b74");

/// The settlement contract whose EIP-712 domain order uids are computed in.
pub const SETTLEMENT: Address = address!("9008D19f58AAbD9eD0D60971565AA8510560ab41");

/// The handler contract validating TWAP parts.
pub const TWAP_HANDLER: Address = address!("6cF1e9cA41f7611dEf408122793c358a3d11E5a5");

/// Context factory storing the block timestamp at creation in the cabinet.
pub const CURRENT_BLOCK_TIMESTAMP_FACTORY: Address =
    address!("52eD56Da04309Aca4c3FECC595298d80C2f16BAc");

sol! {
    /// The leaf committed on chain for a conditional order.
    #[derive(Debug, PartialEq, Eq, Hash)]
    struct ConditionalOrderParams {
        address handler;
        bytes32 salt;
        bytes staticInput;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ProofWithParams {
        bytes32[] proof;
        ConditionalOrderParams params;
    }

    /// Static input of the TWAP handler.
    #[derive(Debug, PartialEq, Eq)]
    struct TwapStruct {
        address sellToken;
        address buyToken;
        address receiver;
        uint256 partSellAmount;
        uint256 minPartLimit;
        uint256 t0;
        uint256 n;
        uint256 t;
        uint256 span;
        bytes32 appData;
    }

    library GPv2Order {
        #[derive(Debug, PartialEq, Eq)]
        struct Data {
            address sellToken;
            address buyToken;
            address receiver;
            uint256 sellAmount;
            uint256 buyAmount;
            uint32 validTo;
            bytes32 appData;
            uint256 feeAmount;
            bytes32 kind;
            bool partiallyFillable;
            bytes32 sellTokenBalance;
            bytes32 buyTokenBalance;
        }
    }

    #[sol(rpc)]
    interface ComposableCoW {
        #[derive(Debug, PartialEq, Eq)]
        struct Proof {
            uint256 location;
            bytes data;
        }

        function singleOrders(address owner, bytes32 id) external view returns (bool);
        function roots(address owner) external view returns (bytes32);
        function cabinet(address owner, bytes32 ctx) external view returns (bytes32);
        function getTradeableOrderWithSignature(
            address owner,
            ConditionalOrderParams calldata params,
            bytes calldata offchainInput,
            bytes32[] calldata proof
        ) external view returns (GPv2Order.Data memory order, bytes memory signature);

        function create(ConditionalOrderParams calldata params, bool dispatch) external;
        function createWithContext(
            ConditionalOrderParams calldata params,
            address factory,
            bytes calldata data,
            bool dispatch
        ) external;
        function remove(bytes32 singleOrderHash) external;
        function setRoot(bytes32 root, Proof calldata proof) external;
    }
}
