use crate::domain::model::{ActiveProductCatalog, ProductId};
use crate::utils::error::{Result, StregError};
use std::collections::BTreeMap;

/// 購物車: 商品 id 對應數量
///
/// Zero quantities stay in the map but are never serialized, so a product can be
/// removed and added back without checking the catalog again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    contents: BTreeMap<ProductId, u32>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> Result<()> {
        let quantity = u32::try_from(quantity).map_err(|_| StregError::InvalidQuantity {
            product_id,
            quantity,
        })?;
        self.contents.insert(product_id, quantity);
        Ok(())
    }

    pub fn add(&mut self, product_id: ProductId) -> u32 {
        let quantity = self.contents.entry(product_id).or_insert(0);
        *quantity = quantity.saturating_add(1);
        *quantity
    }

    /// 減少一個，最低為 0
    pub fn remove(&mut self, product_id: ProductId) -> u32 {
        match self.contents.get_mut(&product_id) {
            Some(quantity) => {
                *quantity = quantity.saturating_sub(1);
                *quantity
            }
            None => 0,
        }
    }

    pub fn quantity(&self, product_id: ProductId) -> u32 {
        self.contents.get(&product_id).copied().unwrap_or(0)
    }

    /// Entries with a positive quantity, in ascending product id.
    pub fn lines(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.contents
            .iter()
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(id, quantity)| (*id, *quantity))
    }

    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }

    pub fn item_count(&self) -> u64 {
        self.lines().map(|(_, quantity)| u64::from(quantity)).sum()
    }

    pub fn clear(&mut self) {
        self.contents.clear();
    }

    /// 後端的 buy string 格式: `"id:qty id:qty"`
    pub fn buy_string(&self) -> String {
        self.lines()
            .map(|(id, quantity)| format!("{}:{}", id, quantity))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Price of the cart against a catalog. Products missing from the catalog
    /// are skipped.
    pub fn total(&self, catalog: &ActiveProductCatalog) -> f64 {
        self.lines()
            .filter_map(|(id, quantity)| {
                catalog
                    .get(id)
                    .map(|product| product.price * f64::from(quantity))
            })
            .sum()
    }

    /// 解析 `"7 9:2 7"` 這類輸入，重複的 id 會累加
    ///
    /// Each token must carry a quantity of zero or more; a negative token is
    /// rejected even when an earlier token for the same id would cover it.
    pub fn parse_buy_string(input: &str) -> Result<Self> {
        let mut cart = Self::new();

        for token in input.split_whitespace() {
            let (id_part, quantity_part) = match token.split_once(':') {
                Some((id, quantity)) => (id, quantity),
                None => (token, "1"),
            };

            let product_id =
                id_part
                    .parse::<ProductId>()
                    .map_err(|_| StregError::InvalidCartItem {
                        token: token.to_string(),
                        reason: "Product id must be a non-negative integer".to_string(),
                    })?;
            let quantity =
                quantity_part
                    .parse::<i64>()
                    .map_err(|_| StregError::InvalidCartItem {
                        token: token.to_string(),
                        reason: "Quantity must be an integer".to_string(),
                    })?;

            if quantity < 0 {
                return Err(StregError::InvalidQuantity {
                    product_id,
                    quantity,
                });
            }

            let total = i64::from(cart.quantity(product_id))
                .checked_add(quantity)
                .ok_or(StregError::InvalidQuantity {
                    product_id,
                    quantity,
                })?;
            cart.set_quantity(product_id, total)?;
        }

        Ok(cart)
    }
}
