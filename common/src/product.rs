use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::nullable;
use crate::location::ProductLocationData;

/// Product identifier. Doubles as the ledger key the record is stored under.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        ProductId(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        ProductId(id)
    }
}

/// A traceable unit of goods.
///
/// Every field decodes leniently: a missing or `null` field becomes the empty
/// value of its type, and the contract's presence checks decide whether that
/// is acceptable. Dates are ISO-8601 strings and are never parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    #[serde(deserialize_with = "nullable")]
    pub id: ProductId,
    /// Products this one is made from, e.g. ingredients. Order is significant.
    #[serde(deserialize_with = "nullable")]
    pub component_product_ids: Vec<ProductId>,
    #[serde(deserialize_with = "nullable")]
    pub barcode: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub place_of_origin: String,
    #[serde(deserialize_with = "nullable")]
    pub production_date: String,
    #[serde(deserialize_with = "nullable")]
    pub expiration_date: String,
    #[serde(deserialize_with = "nullable")]
    pub unit_quantity: f64,
    #[serde(deserialize_with = "nullable")]
    pub unit_quantity_type: String,
    #[serde(deserialize_with = "nullable")]
    pub batch_quantity: f64,
    #[serde(deserialize_with = "nullable")]
    pub unit_price: String,
    #[serde(deserialize_with = "nullable")]
    pub category: String,
    #[serde(deserialize_with = "nullable")]
    pub variety: String,
    /// Free-form auxiliary data, usually serialized JSON.
    #[serde(deserialize_with = "nullable")]
    pub misc: String,
    #[serde(deserialize_with = "nullable")]
    pub location_data: ProductLocationData,
}

/// A product together with its resolved components.
///
/// Read-only view assembled by the contract; never written to the ledger.
/// Serializes flat: the product's own fields plus `componentProducts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithHistory {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default)]
    pub component_products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::ProductLocationEntry;

    #[test]
    fn product_uses_camel_case_field_names() {
        let product = Product {
            id: "1001".into(),
            place_of_origin: "Kent".into(),
            unit_quantity_type: "jar".into(),
            component_product_ids: vec!["2001".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["id"], "1001");
        assert_eq!(json["placeOfOrigin"], "Kent");
        assert_eq!(json["unitQuantityType"], "jar");
        assert_eq!(json["componentProductIds"][0], "2001");
        assert!(json["locationData"]["previous"].is_array());
    }

    #[test]
    fn missing_and_null_fields_decode_as_empty() {
        let product: Product =
            serde_json::from_str(r#"{"id":"7","name":null,"unitQuantity":null}"#).unwrap();
        assert_eq!(product.id, ProductId("7".into()));
        assert!(product.name.is_empty());
        assert_eq!(product.unit_quantity, 0.0);
        assert!(product.component_product_ids.is_empty());
        assert_eq!(product.location_data.current, ProductLocationEntry::default());
    }

    #[test]
    fn history_view_serializes_flat() {
        let view = ProductWithHistory {
            product: Product {
                id: "jam".into(),
                component_product_ids: vec!["apple".into()],
                ..Default::default()
            },
            component_products: vec![Product {
                id: "apple".into(),
                ..Default::default()
            }],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "jam");
        assert_eq!(json["componentProducts"][0]["id"], "apple");
        assert!(json.get("product").is_none());
    }
}
