use {
    crate::multiplexer::ProofLocation,
    alloy::primitives::{Address, B256},
    thiserror::Error,
};

/// Failures constructing a conditional order from its parts or from its
/// serialized form.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("InvalidHandler: Expected: {expected}, provided: {provided}")]
    InvalidHandler { expected: Address, provided: Address },
    #[error("Invalid salt: {0}")]
    InvalidSalt(String),
    #[error("HandlerMismatch: Expected: {expected}, provided: {provided}")]
    HandlerMismatch { expected: Address, provided: Address },
    #[error("InvalidSerializedConditionalOrder")]
    InvalidSerializedConditionalOrder,
}

#[derive(Debug, Error)]
#[error("Invalid order: {0}")]
pub struct ValidationError(pub String);

#[derive(Debug, Error)]
pub enum MultiplexerError {
    #[error("orders must have non-zero length")]
    EmptyOrders,
    #[error("orders cannot have undefined root")]
    MissingRoot,
    #[error("root mismatch")]
    RootMismatch,
    #[error("Unknown order type: {0}")]
    UnknownOrderType(String),
    #[error("Order with id {0} not found")]
    IdNotFound(B256),
    #[error("Order with index {0} not found")]
    IndexNotFound(usize),
    #[error(transparent)]
    Tree(#[from] crate::merkle::TreeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error("invalid order data: {0}")]
    InvalidOrderData(#[source] serde_json::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures while preparing the `setRoot` proof argument.
#[derive(Debug, Error)]
#[error("Error preparing proof struct: {0}")]
pub struct ProofStructError(#[from] pub ProofStructErrorKind);

#[derive(Debug, Error)]
pub enum ProofStructErrorKind {
    #[error("Must provide an uploader function")]
    MissingUploader,
    #[error("Error uploading to decentralized storage {location}: {source}")]
    Upload {
        location: ProofLocation,
        source: anyhow::Error,
    },
    #[error("Unsupported location")]
    UnsupportedLocation,
    #[error("data returned by uploader is invalid")]
    InvalidData,
    #[error(transparent)]
    Multiplexer(#[from] MultiplexerError),
}
