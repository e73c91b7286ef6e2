use crate::ledger::LedgerError;
use crate::product::ProductId;

/// Errors raised by contract invocations.
///
/// Every variant aborts the invocation before the ledger is written, so a
/// failed call never leaves partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    /// The payload could not be decoded into a product.
    #[error("malformed product payload: {0}")]
    MalformedInput(String),

    #[error("The product {0} already exists.")]
    AlreadyExists(ProductId),

    /// A required field was empty, zero, null or absent.
    #[error("The '{0}' field is required.")]
    MissingField(&'static str),

    #[error("The product {0} does not exist.")]
    NotFound(ProductId),

    /// Bytes under a product key failed to decode.
    #[error("stored record for product {id} is corrupt: {reason}")]
    CorruptRecord { id: ProductId, reason: String },

    #[error("failed to encode product: {0}")]
    Encode(String),

    #[error("unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("transaction {function} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// A read-only transaction was submitted where a state change is required.
    #[error("transaction {0} does not modify the ledger")]
    ReadOnly(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result alias for contract operations.
pub type ProductResult<T> = Result<T, ProductError>;
