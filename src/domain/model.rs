use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type MemberId = i64;
pub type ProductId = u32;
pub type RoomId = i64;

/// 會員資料快照，不會自動更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub id: MemberId,
    pub active: bool,
    pub name: String,
    pub balance: f64,
}

/// `/member?member_id=` 回應中我們關心的欄位
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemberInfo {
    pub name: String,
    pub active: bool,
    pub balance: f64,
}

impl MemberInfo {
    pub fn into_profile(self, username: impl Into<String>, id: MemberId) -> UserProfile {
        UserProfile {
            username: username.into(),
            id,
            active: self.active,
            name: self.name,
            balance: self.balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
}

/// 某個房間在取得當下可販售的商品
///
/// Wire format is a JSON object keyed by the product id as a string, with
/// `[name, price]` pairs as values. Iteration is in ascending product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActiveProductCatalog {
    products: BTreeMap<ProductId, Product>,
}

impl ActiveProductCatalog {
    pub fn new(products: BTreeMap<ProductId, Product>) -> Self {
        Self { products }
    }

    pub fn get(&self, product_id: ProductId) -> Option<&Product> {
        self.products.get(&product_id)
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains_key(&product_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductId, &Product)> {
        self.products.iter().map(|(id, product)| (*id, product))
    }
}

impl<'de> Deserialize<'de> for ActiveProductCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: HashMap<String, (String, f64)> = HashMap::deserialize(deserializer)?;
        let mut products = BTreeMap::new();

        for (key, (name, price)) in raw {
            let id = key.trim().parse::<ProductId>().map_err(|_| {
                serde::de::Error::custom(format!("product id '{}' is not an integer", key))
            })?;
            products.insert(id, Product { name, price });
        }

        Ok(Self { products })
    }
}

/// 送往 `/sale` 的請求內容
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRequest<'a> {
    pub buy_string: &'a str,
    pub room: RoomId,
    pub member_id: MemberId,
}

/// 後端有時以字串回傳 member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberRef {
    Id(MemberId),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleOrder {
    pub room: RoomId,
    pub member: MemberRef,
    #[serde(alias = "create_on")]
    pub created_on: String,
    pub items: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleResult {
    pub order: SaleOrder,
    #[serde(default)]
    pub promille: f64,
    #[serde(default)]
    pub is_ballmer_peaking: bool,
    #[serde(default)]
    pub bp_minutes: Option<i64>,
    #[serde(default)]
    pub bp_seconds: Option<i64>,
    #[serde(default)]
    pub caffeine: f64,
    #[serde(default)]
    pub cups: f64,
    #[serde(default)]
    pub product_contains_caffeine: bool,
    #[serde(default)]
    pub is_coffee_master: bool,
    pub cost: f64,
    #[serde(default)]
    pub give_multibuy_hint: bool,
    #[serde(default)]
    pub sale_hints: serde_json::Value,
}

/// `/sale` 的完整回應: `{status, msg, values}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleResponse {
    #[serde(default)]
    pub status: serde_json::Value,
    #[serde(default)]
    pub msg: String,
    pub values: SaleResult,
}
