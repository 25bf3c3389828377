use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Cart Value Objects
// ============================================================================

/// Normalized product identity. Built once at the catalog boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    /// Returns `None` for blank ids.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sellable catalog product after ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
}

/// Priced add-on attached to a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: String,
    pub price: Decimal,
    pub qty: u32,
}

impl Modifier {
    pub fn new(id: impl Into<String>, price: Decimal, qty: u32) -> Self {
        Self { id: id.into(), price, qty }
    }
}

/// Identity of a line: product plus its exact modifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey(String);

impl LineKey {
    /// `modifiers` must already be normalized (sorted, merged, no zero qty)
    fn derive(product_id: &ProductId, modifiers: &[Modifier]) -> Self {
        let config = modifiers
            .iter()
            .map(|m| format!("{}:{}", m.id, m.qty))
            .collect::<Vec<_>>()
            .join(",");
        Self(format!("{}|{}", product_id, config))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A distinct cart entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_key: LineKey,
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub modifiers: Vec<Modifier>,
}

impl LineItem {
    /// New line with quantity 1
    pub fn new(product: &Product, modifiers: Vec<Modifier>) -> Self {
        let modifiers = normalize_modifiers(modifiers);
        Self {
            line_key: LineKey::derive(&product.id, &modifiers),
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
            modifiers,
        }
    }

    /// Key a product/modifier combination would get without building the line
    pub fn key_for(product: &Product, modifiers: &[Modifier]) -> LineKey {
        LineKey::derive(&product.id, &normalize_modifiers(modifiers.to_vec()))
    }

    /// Unit price plus every modifier's price times its qty
    pub fn unit_total(&self) -> Decimal {
        self.modifiers
            .iter()
            .fold(self.unit_price, |acc, m| acc + m.price * Decimal::from(m.qty))
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_total() * Decimal::from(self.quantity)
    }
}

/// Sort by id, merge duplicate ids, drop zero quantities
fn normalize_modifiers(modifiers: Vec<Modifier>) -> Vec<Modifier> {
    let mut merged: BTreeMap<String, Modifier> = BTreeMap::new();
    for modifier in modifiers.into_iter().filter(|m| m.qty > 0) {
        merged
            .entry(modifier.id.clone())
            .and_modify(|existing| existing.qty = existing.qty.saturating_add(modifier.qty))
            .or_insert(modifier);
    }
    merged.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionKind {
    Percent,
    Fixed,
}

/// Cart-wide discount descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub code: String,
    pub kind: PromotionKind,
    pub value: Decimal,
}

impl Promotion {
    pub fn percent(code: impl Into<String>, value: Decimal) -> Self {
        Self { code: code.into(), kind: PromotionKind::Percent, value }
    }

    pub fn fixed(code: impl Into<String>, value: Decimal) -> Self {
        Self { code: code.into(), kind: PromotionKind::Fixed, value }
    }

    /// Never negative, never more than the subtotal
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.kind {
            PromotionKind::Percent => {
                let pct = self.value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
                (subtotal * pct / Decimal::ONE_HUNDRED).round_dp(2)
            }
            PromotionKind::Fixed => self.value,
        };
        raw.max(Decimal::ZERO).min(subtotal.max(Decimal::ZERO))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Delivery,
    Pickup,
}

/// Fee schedule the cart prices against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub base_delivery_fee: Decimal,
    pub free_delivery_threshold: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_delivery_fee: Decimal::from(50),
            free_delivery_threshold: Decimal::from(1000),
        }
    }
}

/// Derived amounts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

impl CartTotals {
    pub fn compute(
        items: &[LineItem],
        promotion: Option<&Promotion>,
        mode: DeliveryMode,
        pricing: &PricingConfig,
    ) -> Self {
        let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();

        let delivery_fee = if items.is_empty()
            || mode == DeliveryMode::Pickup
            || subtotal >= pricing.free_delivery_threshold
        {
            Decimal::ZERO
        } else {
            pricing.base_delivery_fee
        };

        let discount_amount = promotion
            .map(|p| p.discount_for(subtotal))
            .unwrap_or(Decimal::ZERO);

        let total_amount = (subtotal + delivery_fee - discount_amount).max(Decimal::ZERO);

        Self { subtotal, delivery_fee, discount_amount, total_amount }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> Product {
        Product {
            id: ProductId::new(id).unwrap(),
            name: id.to_string(),
            price: Decimal::from(price),
            image: None,
        }
    }

    #[test]
    fn test_product_id_rejects_blank() {
        assert!(ProductId::new("").is_none());
        assert!(ProductId::new("   ").is_none());
        assert_eq!(ProductId::new(" p1 ").unwrap().as_str(), "p1");
    }

    #[test]
    fn test_line_key_ignores_modifier_order() {
        let p = product("burger", 200);
        let a = LineItem::key_for(&p, &[
            Modifier::new("cheese", Decimal::from(20), 1),
            Modifier::new("bacon", Decimal::from(40), 2),
        ]);
        let b = LineItem::key_for(&p, &[
            Modifier::new("bacon", Decimal::from(40), 2),
            Modifier::new("cheese", Decimal::from(20), 1),
        ]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "burger|bacon:2,cheese:1");
    }

    #[test]
    fn test_line_key_distinguishes_modifier_qty() {
        let p = product("burger", 200);
        let one = LineItem::key_for(&p, &[Modifier::new("cheese", Decimal::from(20), 1)]);
        let two = LineItem::key_for(&p, &[Modifier::new("cheese", Decimal::from(20), 2)]);
        assert_ne!(one, two);
    }

    #[test]
    fn test_duplicate_modifiers_merge_and_zero_qty_drops() {
        let line = LineItem::new(&product("burger", 200), vec![
            Modifier::new("cheese", Decimal::from(20), 1),
            Modifier::new("onion", Decimal::from(5), 0),
            Modifier::new("cheese", Decimal::from(20), 1),
        ]);
        assert_eq!(line.modifiers.len(), 1);
        assert_eq!(line.modifiers[0].qty, 2);
        assert_eq!(line.line_total(), Decimal::from(240));
    }

    #[test]
    fn test_merged_modifier_qty_saturates() {
        let line = LineItem::new(&product("burger", 200), vec![
            Modifier::new("cheese", Decimal::ZERO, u32::MAX),
            Modifier::new("cheese", Decimal::ZERO, 5),
        ]);
        assert_eq!(line.modifiers[0].qty, u32::MAX);
    }

    #[test]
    fn test_percent_discount_is_clamped() {
        let promo = Promotion::percent("ALL", Decimal::from(150));
        assert_eq!(promo.discount_for(Decimal::from(80)), Decimal::from(80));

        let negative = Promotion::percent("NEG", Decimal::from(-10));
        assert_eq!(negative.discount_for(Decimal::from(80)), Decimal::ZERO);

        let ten = Promotion::percent("TEN", Decimal::from(10));
        assert_eq!(ten.discount_for(Decimal::new(1999, 2)), Decimal::new(200, 2));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let promo = Promotion::fixed("BIG", Decimal::from(500));
        assert_eq!(promo.discount_for(Decimal::from(120)), Decimal::from(120));
    }

    #[test]
    fn test_delivery_fee_boundary() {
        let pricing = PricingConfig {
            base_delivery_fee: Decimal::from(50),
            free_delivery_threshold: Decimal::from(600),
        };
        let items = vec![LineItem::new(&product("tray", 600), vec![])];
        let totals = CartTotals::compute(&items, None, DeliveryMode::Delivery, &pricing);
        assert_eq!(totals.delivery_fee, Decimal::ZERO);
        assert_eq!(totals.total_amount, Decimal::from(600));
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let totals = CartTotals::compute(&[], None, DeliveryMode::Delivery, &PricingConfig::default());
        assert_eq!(totals, CartTotals::default());
    }

    #[test]
    fn test_promotion_kind_serialization() {
        let json = serde_json::to_string(&PromotionKind::Percent).unwrap();
        assert_eq!(json, "\"percent\"");
        let mode: DeliveryMode = serde_json::from_str("\"pickup\"").unwrap();
        assert_eq!(mode, DeliveryMode::Pickup);
    }
}
