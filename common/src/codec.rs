//! JSON codec for ledger values.
//!
//! The same encoding is used on the wire to the gateway and for the bytes
//! stored under a product's key.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ProductError, ProductResult};
use crate::product::{Product, ProductId};

/// Deserialize `null` as the type's default instead of failing.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn encode<T: Serialize>(value: &T) -> ProductResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ProductError::Encode(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Decode an incoming product payload. Failures are the caller's fault.
pub fn decode_payload(payload: &[u8]) -> ProductResult<Product> {
    decode(payload).map_err(|e| ProductError::MalformedInput(e.to_string()))
}

/// Decode a record read back from the ledger. Failures mean stored data is bad.
pub fn decode_record(id: &ProductId, bytes: &[u8]) -> ProductResult<Product> {
    decode(bytes).map_err(|e| ProductError::CorruptRecord {
        id: id.clone(),
        reason: e.to_string(),
    })
}
