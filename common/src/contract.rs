//! Product supply-chain contract.
//!
//! All state lives in the injected [`LedgerState`]; the contract itself holds
//! nothing between calls. Each operation performs at most one write, as its
//! last step, so any error leaves the ledger exactly as it was.
//!
//! `ship_product_to` is a plain read-modify-write. Two ships of the same
//! product simulated concurrently will race; ordering and conflict detection
//! are up to the platform executing the contract.

use crate::codec;
use crate::error::{ProductError, ProductResult};
use crate::ledger::LedgerState;
use crate::location::ProductLocationEntry;
use crate::product::{Product, ProductId, ProductWithHistory};
use crate::validation::require_field;

pub struct ProductContract<L> {
    ledger: L,
}

impl<L: LedgerState> ProductContract<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// True when a non-empty value is stored under `product_id`.
    pub fn product_exists(&self, product_id: &str) -> ProductResult<bool> {
        let data = self.ledger.get_state(product_id)?;
        Ok(data.is_some_and(|bytes| !bytes.is_empty()))
    }

    /// Validate and store a new product from its JSON payload.
    ///
    /// The duplicate check runs before field validation, so re-creating an
    /// existing id is always `AlreadyExists`.
    pub fn create_product(&self, payload: impl AsRef<[u8]>) -> ProductResult<()> {
        let product = codec::decode_payload(payload.as_ref())?;

        if self.product_exists(product.id.as_str())? {
            return Err(ProductError::AlreadyExists(product.id));
        }

        validate_new_product(&product)?;

        let bytes = codec::encode(&product)?;
        self.ledger.put_state(product.id.as_str(), bytes)?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(())
    }

    /// Move a product to `new_location`, pushing its current location onto
    /// the history chain.
    pub fn ship_product_to(
        &self,
        product_id: &str,
        new_location: &str,
        arrival_date: &str,
    ) -> ProductResult<()> {
        if !self.product_exists(product_id)? {
            return Err(ProductError::NotFound(product_id.into()));
        }

        require_field(new_location, "newLocation")?;
        require_field(arrival_date, "arrivalDate")?;

        let id = ProductId::from(product_id);
        let mut product = self.load(&id)?;
        product
            .location_data
            .advance(ProductLocationEntry::new(new_location, arrival_date));

        let bytes = codec::encode(&product)?;
        self.ledger.put_state(product_id, bytes)?;
        tracing::info!(
            product_id,
            location = new_location,
            history_len = product.location_data.history_len(),
            "product shipped"
        );
        Ok(())
    }

    pub fn get_product(&self, product_id: &str) -> ProductResult<Product> {
        self.load(&product_id.into())
    }

    /// The product plus each of its direct components, in declared order.
    ///
    /// Components of components are not expanded. If any component is
    /// missing the whole call fails with `NotFound` for that component.
    pub fn get_product_with_history(&self, product_id: &str) -> ProductResult<ProductWithHistory> {
        let product = self.load(&product_id.into())?;

        let component_products = product
            .component_product_ids
            .iter()
            .map(|component_id| self.load(component_id))
            .collect::<ProductResult<Vec<_>>>()?;

        tracing::debug!(
            product_id,
            components = component_products.len(),
            "resolved product history"
        );
        Ok(ProductWithHistory {
            product,
            component_products,
        })
    }

    fn load(&self, id: &ProductId) -> ProductResult<Product> {
        match self.ledger.get_state(id.as_str())? {
            Some(bytes) if !bytes.is_empty() => codec::decode_record(id, &bytes),
            _ => Err(ProductError::NotFound(id.clone())),
        }
    }
}

/// Required fields, checked in this order; the first failure is reported.
pub(crate) fn validate_new_product(product: &Product) -> ProductResult<()> {
    let current = &product.location_data.current;
    require_field(&product.id, "id")?;
    require_field(&product.name, "name")?;
    require_field(&product.barcode, "barcode")?;
    require_field(&product.place_of_origin, "placeOfOrigin")?;
    require_field(&product.production_date, "productionDate")?;
    require_field(&product.expiration_date, "expirationDate")?;
    require_field(&product.unit_quantity, "unitQuantity")?;
    require_field(&product.unit_quantity_type, "unitQuantityType")?;
    require_field(&product.unit_price, "unitPrice")?;
    require_field(&product.category, "category")?;
    require_field(&current.location, "locationData.current.location")?;
    require_field(&current.arrival_date, "locationData.current.arrivalDate")?;
    Ok(())
}
