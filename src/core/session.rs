use crate::domain::cart::Cart;
use crate::domain::model::{
    ActiveProductCatalog, MemberId, ProductId, RoomId, SaleResult, UserProfile,
};
use crate::domain::ports::StregsystemApi;
use crate::utils::error::{Result, StregError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    /// 無法連線，此 session 不會再發出任何請求
    Unavailable,
    Ready,
    Selling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    CatalogLoaded {
        products: usize,
    },
    CartChanged {
        product_id: ProductId,
        quantity: u32,
    },
    MemberSelected {
        id: MemberId,
    },
    SaleCompleted {
        cost: f64,
    },
    SaleFailed {
        reason: String,
    },
}

type Listener = Box<dyn FnMut(&SessionEvent) + Send + Sync>;

/// One room's selling session: availability probe, catalog, cart and sale
/// submission. A new room means a new session (and a new cart).
///
/// Network reads go through the session only after `start()` has finished the
/// availability check; before that they return `NotReady { Initializing }`.
/// A front end that wants to look up a member while the check is still running
/// calls [`StregsystemApi::fetch_profile`] on the client directly.
pub struct SaleSession<A: StregsystemApi> {
    api: A,
    room: RoomId,
    state: SessionState,
    catalog: Option<ActiveProductCatalog>,
    cart: Cart,
    member: Option<UserProfile>,
    listeners: Vec<Listener>,
}

impl<A: StregsystemApi> SaleSession<A> {
    pub fn new(api: A, room: RoomId) -> Self {
        Self {
            api,
            room,
            state: SessionState::Initializing,
            catalog: None,
            cart: Cart::new(),
            member: None,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&SessionEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn room(&self) -> RoomId {
        self.room
    }

    pub fn catalog(&self) -> Option<&ActiveProductCatalog> {
        self.catalog.as_ref()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn member(&self) -> Option<&UserProfile> {
        self.member.as_ref()
    }

    /// 先檢查可用性，成功後再取得商品清單
    ///
    /// A failed probe moves the session to `Unavailable` for good and returns
    /// `Ok(Unavailable)`. A failed catalog fetch is returned as an error while
    /// the session stays `Ready`; `reload_catalog` can try again.
    pub async fn start(&mut self) -> Result<SessionState> {
        if self.state != SessionState::Initializing {
            return Ok(self.state);
        }

        tracing::info!("🚀 Initiating stregsystem session for room {}", self.room);
        if !self.api.check_access().await {
            tracing::warn!("❌ Unable to connect to stregsystem");
            self.transition(SessionState::Unavailable);
            return Ok(self.state);
        }

        self.transition(SessionState::Ready);
        self.reload_catalog().await?;
        Ok(self.state)
    }

    pub async fn reload_catalog(&mut self) -> Result<&ActiveProductCatalog> {
        self.ensure_available()?;

        let catalog = self.api.fetch_active_products(self.room).await?;
        tracing::info!(
            "📦 Loaded {} active products for room {}",
            catalog.len(),
            self.room
        );
        let products = catalog.len();
        self.emit(SessionEvent::CatalogLoaded { products });

        Ok(self.catalog.insert(catalog))
    }

    pub async fn check_access(&self) -> bool {
        if self.state == SessionState::Unavailable {
            return false;
        }
        self.api.check_access().await
    }

    /// 需先完成 `start()`；之前呼叫會得到 `NotReady`
    pub async fn fetch_profile(&self, username: &str) -> Result<UserProfile> {
        self.ensure_available()?;
        self.api.fetch_profile(username).await
    }

    /// 取得會員資料並作為之後銷售的對象
    pub async fn select_member(&mut self, username: &str) -> Result<&UserProfile> {
        let profile = self.fetch_profile(username).await?;
        tracing::info!("👤 Selected member {} ({})", profile.username, profile.id);
        self.emit(SessionEvent::MemberSelected { id: profile.id });
        Ok(self.member.insert(profile))
    }

    /// Fetches the current balance of the selected member and stores a new
    /// profile snapshot with it.
    pub async fn refresh_balance(&mut self) -> Result<f64> {
        self.ensure_available()?;
        let member_id = self
            .member
            .as_ref()
            .map(|m| m.id)
            .ok_or(StregError::NoMemberSelected)?;

        let balance = self.api.fetch_balance(member_id).await?;
        if let Some(member) = self.member.as_mut() {
            member.balance = balance;
        }
        Ok(balance)
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> Result<()> {
        self.ensure_known_product(product_id)?;
        self.cart.set_quantity(product_id, quantity)?;
        self.emit_cart_change(product_id);
        Ok(())
    }

    pub fn add(&mut self, product_id: ProductId) -> Result<u32> {
        self.ensure_known_product(product_id)?;
        let quantity = self.cart.add(product_id);
        self.emit_cart_change(product_id);
        Ok(quantity)
    }

    pub fn remove(&mut self, product_id: ProductId) -> u32 {
        let quantity = self.cart.remove(product_id);
        self.emit_cart_change(product_id);
        quantity
    }

    pub fn clear_cart(&mut self) {
        let cleared: Vec<ProductId> = self.cart.lines().map(|(id, _)| id).collect();
        self.cart.clear();
        for product_id in cleared {
            self.emit_cart_change(product_id);
        }
    }

    pub fn cart_total(&self) -> f64 {
        self.catalog
            .as_ref()
            .map(|catalog| self.cart.total(catalog))
            .unwrap_or(0.0)
    }

    pub async fn submit_sale(&mut self) -> Result<SaleResult> {
        let member_id = self
            .member
            .as_ref()
            .map(|m| m.id)
            .ok_or(StregError::NoMemberSelected)?;
        self.submit_sale_for(member_id).await
    }

    /// 送出購物車內容；成功或失敗都不會清空購物車
    pub async fn submit_sale_for(&mut self, member_id: MemberId) -> Result<SaleResult> {
        self.ensure_available()?;
        if self.state != SessionState::Ready || self.catalog.is_none() {
            return Err(StregError::NotReady { state: self.state });
        }
        if self.cart.is_empty() {
            return Err(StregError::EmptyCart);
        }

        let buy_string = self.cart.buy_string();
        tracing::info!(
            "🛒 Submitting sale '{}' for member {} in room {}",
            buy_string,
            member_id,
            self.room
        );

        self.transition(SessionState::Selling);
        let outcome = self.api.post_sale(&buy_string, self.room, member_id).await;
        self.transition(SessionState::Ready);

        match outcome {
            Ok(response) => {
                tracing::info!("✅ Sale completed: {} (cost {})", response.msg, response.values.cost);
                self.emit(SessionEvent::SaleCompleted {
                    cost: response.values.cost,
                });
                Ok(response.values)
            }
            Err(e) => {
                tracing::error!("❌ Sale failed: {}", e);
                let reason = match &e {
                    StregError::Sale(sale) => sale
                        .reason
                        .clone()
                        .unwrap_or_else(|| sale.raw.clone()),
                    other => other.to_string(),
                };
                self.emit(SessionEvent::SaleFailed { reason });
                Err(e)
            }
        }
    }

    fn ensure_available(&self) -> Result<()> {
        match self.state {
            SessionState::Unavailable => Err(StregError::Unavailable),
            SessionState::Initializing => Err(StregError::NotReady { state: self.state }),
            _ => Ok(()),
        }
    }

    fn ensure_known_product(&self, product_id: ProductId) -> Result<()> {
        let catalog = self.catalog.as_ref().ok_or(StregError::NotReady {
            state: self.state,
        })?;
        if !catalog.contains(product_id) {
            return Err(StregError::UnknownProduct {
                product_id,
                room: self.room,
            });
        }
        Ok(())
    }

    fn emit_cart_change(&mut self, product_id: ProductId) {
        let quantity = self.cart.quantity(product_id);
        self.emit(SessionEvent::CartChanged {
            product_id,
            quantity,
        });
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        tracing::debug!("Session state {:?} -> {:?}", from, to);
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn emit(&mut self, event: SessionEvent) {
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MemberInfo, MemberRef, Product, SaleOrder, SaleResponse};
    use crate::utils::error::{LookupOperation, SaleError, TransportError};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// 記錄呼叫紀錄的假後端
    #[derive(Clone, Default)]
    struct FakeApi {
        reachable: bool,
        catalog_fails: bool,
        sale_fails: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeApi {
        fn reachable() -> Self {
            Self {
                reachable: true,
                ..Self::default()
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn not_found(url: &str) -> TransportError {
        TransportError::UnexpectedStatus {
            status: 404,
            url: url.to_string(),
            body: String::new(),
        }
    }

    #[async_trait]
    impl StregsystemApi for FakeApi {
        async fn check_access(&self) -> bool {
            self.record("probe");
            self.reachable
        }

        async fn resolve_member_id(&self, username: &str) -> Result<MemberId> {
            self.record(format!("get_id {}", username));
            match username {
                "alice" => Ok(42),
                _ => Err(StregError::lookup(
                    LookupOperation::ResolveMemberId,
                    not_found("member/get_id"),
                )),
            }
        }

        async fn fetch_member_info(&self, member_id: MemberId) -> Result<MemberInfo> {
            self.record(format!("member {}", member_id));
            Ok(MemberInfo {
                name: "Alice".to_string(),
                active: true,
                balance: 150.0,
            })
        }

        async fn fetch_balance(&self, member_id: MemberId) -> Result<f64> {
            self.record(format!("balance {}", member_id));
            Ok(132.0)
        }

        async fn fetch_active_products(&self, room: RoomId) -> Result<ActiveProductCatalog> {
            self.record(format!("products {}", room));
            if self.catalog_fails {
                return Err(StregError::lookup(
                    LookupOperation::ActiveProducts,
                    not_found("products/active_products"),
                ));
            }
            let mut products = BTreeMap::new();
            products.insert(
                7,
                Product {
                    name: "Øl".to_string(),
                    price: 9.0,
                },
            );
            products.insert(
                9,
                Product {
                    name: "Kaffe".to_string(),
                    price: 3.5,
                },
            );
            Ok(ActiveProductCatalog::new(products))
        }

        async fn post_sale(
            &self,
            buy_string: &str,
            room: RoomId,
            member_id: MemberId,
        ) -> Result<SaleResponse> {
            self.record(format!("sale {} {} {}", buy_string, room, member_id));
            if self.sale_fails {
                return Err(StregError::Sale(SaleError::from_transport(
                    TransportError::UnexpectedStatus {
                        status: 400,
                        url: "sale".to_string(),
                        body: r#"{"msg": "Not enough money"}"#.to_string(),
                    },
                )));
            }
            Ok(SaleResponse {
                status: serde_json::json!(200),
                msg: "OK".to_string(),
                values: SaleResult {
                    order: SaleOrder {
                        room,
                        member: MemberRef::Id(member_id),
                        created_on: "2026-10-15T12:00:00".to_string(),
                        items: buy_string.to_string(),
                    },
                    promille: 0.0,
                    is_ballmer_peaking: false,
                    bp_minutes: None,
                    bp_seconds: None,
                    caffeine: 0.0,
                    cups: 0.0,
                    product_contains_caffeine: false,
                    is_coffee_master: false,
                    cost: 18.0,
                    give_multibuy_hint: false,
                    sale_hints: serde_json::Value::Null,
                },
            })
        }
    }

    async fn ready_session(api: FakeApi) -> SaleSession<FakeApi> {
        let mut session = SaleSession::new(api, 10);
        assert_eq!(session.start().await.unwrap(), SessionState::Ready);
        session
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_terminal() {
        let api = FakeApi::default();
        let mut session = SaleSession::new(api.clone(), 10);

        assert_eq!(session.start().await.unwrap(), SessionState::Unavailable);
        assert!(session.catalog().is_none());
        assert!(session.fetch_profile("alice").await.unwrap_err().is_unavailable());
        assert!(session.reload_catalog().await.unwrap_err().is_unavailable());
        assert!(!session.check_access().await);
        assert!(session.select_member("alice").await.unwrap_err().is_unavailable());
        assert!(session.refresh_balance().await.unwrap_err().is_unavailable());
        assert!(session.submit_sale_for(42).await.unwrap_err().is_unavailable());
        assert!(session.member().is_none());

        // 只有一次 probe，之後沒有任何呼叫
        assert_eq!(api.calls(), vec!["probe".to_string()]);
    }

    #[tokio::test]
    async fn test_start_loads_catalog() {
        let api = FakeApi::reachable();
        let session = ready_session(api.clone()).await;

        assert_eq!(session.catalog().unwrap().len(), 2);
        assert_eq!(api.calls(), vec!["probe", "products 10"]);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_recoverable() {
        let api = FakeApi {
            reachable: true,
            catalog_fails: true,
            ..FakeApi::default()
        };
        let mut session = SaleSession::new(api, 10);

        let err = session.start().await.unwrap_err();
        assert!(err.is_lookup());
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.catalog().is_none());

        let err = session.set_quantity(7, 1).unwrap_err();
        assert!(matches!(err, StregError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_fetch_profile_short_circuits() {
        let api = FakeApi::reachable();
        let session = ready_session(api.clone()).await;

        let err = session.fetch_profile("mallory").await.unwrap_err();
        assert!(err.is_lookup());
        assert!(!api.calls().iter().any(|c| c.starts_with("member ")));

        let profile = session.fetch_profile("alice").await.unwrap();
        assert_eq!(
            profile,
            UserProfile {
                username: "alice".to_string(),
                id: 42,
                active: true,
                name: "Alice".to_string(),
                balance: 150.0,
            }
        );
    }

    #[tokio::test]
    async fn test_cart_rejects_products_outside_catalog() {
        let mut session = ready_session(FakeApi::reachable()).await;

        let err = session.set_quantity(1234, 1).unwrap_err();
        assert!(matches!(
            err,
            StregError::UnknownProduct {
                product_id: 1234,
                room: 10
            }
        ));
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn test_successful_sale_keeps_cart() {
        let api = FakeApi::reachable();
        let mut session = ready_session(api.clone()).await;
        session.select_member("alice").await.unwrap();
        session.set_quantity(7, 2).unwrap();
        assert_eq!(session.cart_total(), 18.0);

        let result = session.submit_sale().await.unwrap();

        assert_eq!(result.cost, 18.0);
        assert_eq!(result.order.items, "7:2");
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.cart().buy_string(), "7:2");
        assert!(api.calls().contains(&"sale 7:2 10 42".to_string()));
    }

    #[tokio::test]
    async fn test_failed_sale_preserves_payload_and_cart() {
        let api = FakeApi {
            reachable: true,
            sale_fails: true,
            ..FakeApi::default()
        };
        let mut session = ready_session(api).await;
        session.set_quantity(7, 3).unwrap();
        session.set_quantity(9, 1).unwrap();

        let err = session.submit_sale_for(42).await.unwrap_err();

        match err {
            StregError::Sale(sale) => {
                assert_eq!(sale.status, Some(400));
                assert_eq!(sale.reason.as_deref(), Some("Not enough money"));
                assert_eq!(sale.raw, r#"{"msg": "Not enough money"}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.cart().buy_string(), "7:3 9:1");
    }

    #[tokio::test]
    async fn test_submit_requires_member_and_items() {
        let mut session = ready_session(FakeApi::reachable()).await;

        assert!(matches!(
            session.submit_sale().await.unwrap_err(),
            StregError::NoMemberSelected
        ));
        assert!(matches!(
            session.submit_sale_for(42).await.unwrap_err(),
            StregError::EmptyCart
        ));
    }

    #[tokio::test]
    async fn test_submit_before_start_is_not_ready() {
        let mut session = SaleSession::new(FakeApi::reachable(), 10);
        let err = session.submit_sale_for(42).await.unwrap_err();
        assert!(matches!(
            err,
            StregError::NotReady {
                state: SessionState::Initializing
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_profile_before_start_is_not_ready() {
        let api = FakeApi::reachable();
        let session = SaleSession::new(api.clone(), 10);

        let err = session.fetch_profile("alice").await.unwrap_err();
        assert!(matches!(
            err,
            StregError::NotReady {
                state: SessionState::Initializing
            }
        ));
        assert!(api.calls().is_empty());

        // 直接透過 client 仍可提早查詢
        let profile = api.fetch_profile("alice").await.unwrap();
        assert_eq!(profile.id, 42);
    }

    #[tokio::test]
    async fn test_refresh_balance_updates_snapshot() {
        let mut session = ready_session(FakeApi::reachable()).await;
        assert!(matches!(
            session.refresh_balance().await.unwrap_err(),
            StregError::NoMemberSelected
        ));

        session.select_member("alice").await.unwrap();
        assert_eq!(session.refresh_balance().await.unwrap(), 132.0);
        assert_eq!(session.member().unwrap().balance, 132.0);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let mut session = SaleSession::new(FakeApi::reachable(), 10);
        session.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        session.start().await.unwrap();
        session.add(9).unwrap();
        session.select_member("alice").await.unwrap();
        session.submit_sale().await.unwrap();
        session.clear_cart();

        let events = events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                SessionEvent::StateChanged {
                    from: SessionState::Initializing,
                    to: SessionState::Ready
                },
                SessionEvent::CatalogLoaded { products: 2 },
                SessionEvent::CartChanged {
                    product_id: 9,
                    quantity: 1
                },
                SessionEvent::MemberSelected { id: 42 },
                SessionEvent::StateChanged {
                    from: SessionState::Ready,
                    to: SessionState::Selling
                },
                SessionEvent::StateChanged {
                    from: SessionState::Selling,
                    to: SessionState::Ready
                },
                SessionEvent::SaleCompleted { cost: 18.0 },
                SessionEvent::CartChanged {
                    product_id: 9,
                    quantity: 0
                },
            ]
        );
    }
}
