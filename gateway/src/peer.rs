//! In-process peer that executes contract transactions for the gateway.
//!
//! Write transactions pass through a single ordering lock, one at a time, the
//! way a ledger's ordering service would sequence them. Reads skip the lock.
//! Writes run on the blocking pool since the file ledger does synchronous I/O.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracechain_common::transaction::Transaction;
use tracechain_common::{LedgerError, LedgerState, ProductContract, ProductResult};

pub struct LocalPeer {
    contract: Arc<ProductContract<Arc<dyn LedgerState>>>,
    ordering: Mutex<()>,
}

impl LocalPeer {
    pub fn new(ledger: Arc<dyn LedgerState>) -> Self {
        Self {
            contract: Arc::new(ProductContract::new(ledger)),
            ordering: Mutex::new(()),
        }
    }

    /// Evaluate a read-only transaction or submit a write, returning the
    /// contract's JSON payload.
    pub async fn invoke(&self, tx: Transaction) -> ProductResult<Vec<u8>> {
        let name = tx.name();
        if tx.is_read_only() {
            return self.contract.execute(tx);
        }

        let _turn = self.ordering.lock().await;
        let contract = Arc::clone(&self.contract);
        let result = match tokio::task::spawn_blocking(move || contract.execute(tx)).await {
            Ok(result) => result,
            Err(e) => Err(LedgerError::Unavailable(format!("write task failed: {e}")).into()),
        };
        match &result {
            Ok(_) => tracing::info!(transaction = name, "committed"),
            Err(e) => tracing::warn!(transaction = name, error = %e, "rejected"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracechain_common::InMemoryLedger;

    use crate::store::FileLedger;

    fn product(id: &str) -> String {
        json!({
            "id": id,
            "barcode": "0001",
            "name": "Honey",
            "placeOfOrigin": "Devon",
            "productionDate": "2021-05-01T00:00:00.000Z",
            "expirationDate": "2023-05-01T00:00:00.000Z",
            "unitQuantity": 454,
            "unitQuantityType": "g",
            "unitPrice": "6.00",
            "category": "Pantry",
            "locationData": { "current": { "location": "Apiary", "arrivalDate": "2021-05-01T00:00:00.000Z" } }
        })
        .to_string()
    }

    #[tokio::test]
    async fn concurrent_ships_are_all_recorded() {
        let peer = Arc::new(LocalPeer::new(Arc::new(InMemoryLedger::new())));
        peer.invoke(Transaction::CreateProduct {
            product_json: product("h1"),
        })
        .await
        .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let peer = Arc::clone(&peer);
            handles.push(tokio::spawn(async move {
                peer.invoke(Transaction::ShipProductTo {
                    product_id: "h1".into(),
                    new_location: format!("Stop {i}"),
                    arrival_date: format!("T{i}"),
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let payload = peer
            .invoke(Transaction::GetProduct {
                product_id: "h1".into(),
            })
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["locationData"]["previous"].as_array().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn writes_reach_the_ledger_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let peer = LocalPeer::new(Arc::new(FileLedger::open(&path).unwrap()));

        peer.invoke(Transaction::CreateProduct {
            product_json: product("h2"),
        })
        .await
        .unwrap();
        peer.invoke(Transaction::ShipProductTo {
            product_id: "h2".into(),
            new_location: "Deli".into(),
            arrival_date: "2021-05-02T00:00:00.000Z".into(),
        })
        .await
        .unwrap();

        let reopened = FileLedger::open(&path).unwrap();
        let stored = reopened.get_state("h2").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(value["locationData"]["current"]["location"], "Deli");
    }

    #[tokio::test]
    async fn reads_return_payloads() {
        let peer = LocalPeer::new(Arc::new(InMemoryLedger::new()));
        let payload = peer
            .invoke(Transaction::ProductExists {
                product_id: "none".into(),
            })
            .await
            .unwrap();
        assert_eq!(payload, b"false");
    }
}
