use crate::core::transport::{HttpTransport, TransportResult};
use crate::domain::model::{
    ActiveProductCatalog, MemberId, MemberInfo, RoomId, SaleRequest, SaleResponse,
};
use crate::domain::ports::{ConfigProvider, StregsystemApi};
use crate::utils::error::{LookupOperation, Result, SaleError, StregError, TransportError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Deserialize)]
struct MemberIdBody {
    member_id: Option<MemberId>,
}

#[derive(Deserialize)]
struct BalanceBody {
    balance: Option<f64>,
}

/// 將後端 JSON 轉成領域模型
#[derive(Debug, Clone)]
pub struct StregsystemClient {
    transport: HttpTransport,
}

impl StregsystemClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(HttpTransport::new(config.base_url()))
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    async fn lookup<T: DeserializeOwned + Send>(
        &self,
        operation: LookupOperation,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let fetch = async {
            let response = self.transport.get(path, query).await?;
            HttpTransport::read_json::<T>(response).await
        };
        fetch
            .await
            .map_err(|source| StregError::lookup(operation, source))
    }
}

fn missing_field(field: &str, url: String) -> TransportError {
    TransportError::InvalidBody {
        url,
        message: format!("missing field `{}`", field),
    }
}

#[async_trait]
impl StregsystemApi for StregsystemClient {
    async fn check_access(&self) -> bool {
        self.transport.probe().await
    }

    async fn resolve_member_id(&self, username: &str) -> Result<MemberId> {
        let body: MemberIdBody = self
            .lookup(
                LookupOperation::ResolveMemberId,
                "member/get_id",
                &[("username", username.to_string())],
            )
            .await?;

        body.member_id.ok_or_else(|| {
            StregError::lookup(
                LookupOperation::ResolveMemberId,
                missing_field("member_id", format!("member/get_id?username={}", username)),
            )
        })
    }

    async fn fetch_member_info(&self, member_id: MemberId) -> Result<MemberInfo> {
        self.lookup(
            LookupOperation::MemberInfo,
            "member",
            &[("member_id", member_id.to_string())],
        )
        .await
    }

    async fn fetch_balance(&self, member_id: MemberId) -> Result<f64> {
        let body: BalanceBody = self
            .lookup(
                LookupOperation::Balance,
                "member/balance",
                &[("member_id", member_id.to_string())],
            )
            .await?;

        body.balance.ok_or_else(|| {
            StregError::lookup(
                LookupOperation::Balance,
                missing_field("balance", format!("member/balance?member_id={}", member_id)),
            )
        })
    }

    async fn fetch_active_products(&self, room: RoomId) -> Result<ActiveProductCatalog> {
        let catalog: ActiveProductCatalog = self
            .lookup(
                LookupOperation::ActiveProducts,
                "products/active_products",
                &[("room_id", room.to_string())],
            )
            .await?;

        tracing::debug!("Fetched {} active products for room {}", catalog.len(), room);
        Ok(catalog)
    }

    async fn post_sale(
        &self,
        buy_string: &str,
        room: RoomId,
        member_id: MemberId,
    ) -> Result<SaleResponse> {
        let request = SaleRequest {
            buy_string,
            room,
            member_id,
        };

        let submit = async {
            let response = self.transport.post_json("sale", &request).await?;
            HttpTransport::read_json::<SaleResponse>(response).await
        };
        let result: TransportResult<SaleResponse> = submit.await;

        result.map_err(|source| StregError::Sale(SaleError::from_transport(source)))
    }
}
