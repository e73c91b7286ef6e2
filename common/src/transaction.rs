//! Name-and-arguments dispatch onto [`ProductContract`].
//!
//! Ledger platforms invoke contract functions by name with string arguments.
//! [`Invocation`] is that raw form, [`Transaction`] its checked, typed form.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::contract::ProductContract;
use crate::error::{ProductError, ProductResult};
use crate::ledger::LedgerState;

pub const CONTRACT_TITLE: &str = "ProductSupplyChain";
pub const CONTRACT_DESCRIPTION: &str = "Smart Contract for handling product supply chain.";

/// A raw contract call as the platform delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    ProductExists {
        product_id: String,
    },
    CreateProduct {
        product_json: String,
    },
    ShipProductTo {
        product_id: String,
        new_location: String,
        arrival_date: String,
    },
    GetProduct {
        product_id: String,
    },
    GetProductWithHistory {
        product_id: String,
    },
}

/// Name, arity and read-only flag of every transaction.
const TRANSACTIONS: [(&str, usize, bool); 5] = [
    ("productExists", 1, true),
    ("createProduct", 1, false),
    ("shipProductTo", 3, false),
    ("getProduct", 1, true),
    ("getProductWithHistory", 1, true),
];

impl Transaction {
    pub fn name(&self) -> &'static str {
        match self {
            Transaction::ProductExists { .. } => "productExists",
            Transaction::CreateProduct { .. } => "createProduct",
            Transaction::ShipProductTo { .. } => "shipProductTo",
            Transaction::GetProduct { .. } => "getProduct",
            Transaction::GetProductWithHistory { .. } => "getProductWithHistory",
        }
    }

    /// Read-only transactions may be evaluated without going through ordering.
    pub fn is_read_only(&self) -> bool {
        !matches!(
            self,
            Transaction::CreateProduct { .. } | Transaction::ShipProductTo { .. }
        )
    }

    pub fn from_invocation(invocation: Invocation) -> ProductResult<Self> {
        let Invocation { function, args } = invocation;
        let expected = TRANSACTIONS
            .iter()
            .find(|(name, _, _)| *name == function)
            .map(|(_, arity, _)| *arity)
            .ok_or_else(|| ProductError::UnknownTransaction(function.clone()))?;

        if args.len() != expected {
            return Err(ProductError::ArgumentCount {
                function,
                expected,
                actual: args.len(),
            });
        }

        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or_default();
        let tx = match function.as_str() {
            "productExists" => Transaction::ProductExists { product_id: next() },
            "createProduct" => Transaction::CreateProduct { product_json: next() },
            "shipProductTo" => Transaction::ShipProductTo {
                product_id: next(),
                new_location: next(),
                arrival_date: next(),
            },
            "getProduct" => Transaction::GetProduct { product_id: next() },
            _ => Transaction::GetProductWithHistory { product_id: next() },
        };
        Ok(tx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub name: String,
    pub read_only: bool,
    pub arity: usize,
}

/// What the contract tells clients about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub title: String,
    pub description: String,
    pub transactions: Vec<TransactionInfo>,
}

pub fn metadata() -> ContractMetadata {
    ContractMetadata {
        title: CONTRACT_TITLE.to_string(),
        description: CONTRACT_DESCRIPTION.to_string(),
        transactions: TRANSACTIONS
            .iter()
            .map(|(name, arity, read_only)| TransactionInfo {
                name: name.to_string(),
                read_only: *read_only,
                arity: *arity,
            })
            .collect(),
    }
}

impl<L: LedgerState> ProductContract<L> {
    /// Run a transaction and return its JSON response payload.
    ///
    /// Writes return an empty payload.
    pub fn execute(&self, tx: Transaction) -> ProductResult<Vec<u8>> {
        tracing::debug!(transaction = tx.name(), "executing");
        match tx {
            Transaction::ProductExists { product_id } => {
                codec::encode(&self.product_exists(&product_id)?)
            }
            Transaction::CreateProduct { product_json } => {
                self.create_product(product_json)?;
                Ok(Vec::new())
            }
            Transaction::ShipProductTo {
                product_id,
                new_location,
                arrival_date,
            } => {
                self.ship_product_to(&product_id, &new_location, &arrival_date)?;
                Ok(Vec::new())
            }
            Transaction::GetProduct { product_id } => {
                codec::encode(&self.get_product(&product_id)?)
            }
            Transaction::GetProductWithHistory { product_id } => {
                codec::encode(&self.get_product_with_history(&product_id)?)
            }
        }
    }

    /// Apply a batch of state-changing invocations in order.
    ///
    /// Stops at the first failure; earlier invocations in the batch stay
    /// applied. Read-only invocations are refused.
    pub fn apply_invocations(&self, invocations: Vec<Invocation>) -> ProductResult<usize> {
        let mut applied = 0;
        for invocation in invocations {
            let tx = Transaction::from_invocation(invocation)?;
            if tx.is_read_only() {
                return Err(ProductError::ReadOnly(tx.name().to_string()));
            }
            self.execute(tx)?;
            applied += 1;
        }
        Ok(applied)
    }
}
