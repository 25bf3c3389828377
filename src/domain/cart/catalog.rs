use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::errors::CartError;
use super::value_objects::{Modifier, Product, ProductId};

// ============================================================================
// Catalog Ingestion
// ============================================================================
//
// Catalog records arrive loosely typed: the identity may be called `id`,
// `_id` or `productId` and may be a string or a number. Everything past this
// module only ever sees `ProductId`.
//
// ============================================================================

/// Raw catalog record as supplied by the catalog collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    #[serde(default, alias = "_id", alias = "productId")]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<CatalogModifier>,
}

/// Raw modifier record
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogModifier {
    #[serde(default, alias = "_id")]
    pub id: Option<Value>,
    pub price: Decimal,
    #[serde(default = "default_modifier_qty")]
    pub qty: u32,
}

fn default_modifier_qty() -> u32 {
    1
}

fn identity_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl CatalogRecord {
    /// Normalize into a typed product
    pub fn to_product(&self) -> Result<Product, CartError> {
        let id = identity_of(self.id.as_ref())
            .and_then(ProductId::new)
            .ok_or_else(|| CartError::MissingProductIdentity(self.name.clone()))?;

        Ok(Product {
            id,
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
        })
    }
}

impl CatalogModifier {
    pub fn to_modifier(&self) -> Result<Modifier, CartError> {
        let id = identity_of(self.id.as_ref())
            .filter(|id| !id.trim().is_empty())
            .ok_or(CartError::MissingModifierIdentity)?;
        Ok(Modifier::new(id, self.price, self.qty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_under_any_field_name() {
        for record in [
            json!({"id": "p1", "name": "Pizza", "price": 10}),
            json!({"_id": "p1", "name": "Pizza", "price": 10}),
            json!({"productId": "p1", "name": "Pizza", "price": 10}),
        ] {
            let record: CatalogRecord = serde_json::from_value(record).unwrap();
            assert_eq!(record.to_product().unwrap().id.as_str(), "p1");
        }
    }

    #[test]
    fn test_numeric_identity_normalized_to_string() {
        let record: CatalogRecord =
            serde_json::from_value(json!({"id": 42, "name": "Soup", "price": "7.50"})).unwrap();
        let product = record.to_product().unwrap();
        assert_eq!(product.id.as_str(), "42");
        assert_eq!(product.price, Decimal::new(750, 2));
    }

    #[test]
    fn test_missing_identity_rejected() {
        let record: CatalogRecord =
            serde_json::from_value(json!({"name": "Ghost", "price": 1})).unwrap();
        assert!(matches!(
            record.to_product(),
            Err(CartError::MissingProductIdentity(name)) if name == "Ghost"
        ));

        let blank: CatalogRecord =
            serde_json::from_value(json!({"id": "", "name": "Blank", "price": 1})).unwrap();
        assert!(blank.to_product().is_err());
    }

    #[test]
    fn test_modifier_defaults_qty_to_one() {
        let modifier: CatalogModifier =
            serde_json::from_value(json!({"_id": "cheese", "price": 20})).unwrap();
        let modifier = modifier.to_modifier().unwrap();
        assert_eq!(modifier.id, "cheese");
        assert_eq!(modifier.qty, 1);
    }
}
