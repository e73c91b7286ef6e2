//! Product traceability contract: data model, codec and state transitions
//! over an injected key-value ledger.

pub mod codec;
pub mod contract;
pub mod error;
pub mod ledger;
pub mod location;
pub mod product;
pub mod snapshot;
pub mod transaction;
pub mod validation;

pub use contract::ProductContract;
pub use error::{ProductError, ProductResult};
pub use ledger::{InMemoryLedger, LedgerError, LedgerResult, LedgerState};
pub use product::{Product, ProductId, ProductWithHistory};
