use crate::domain::model::{
    ActiveProductCatalog, MemberId, MemberInfo, RoomId, SaleResponse, UserProfile,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn default_room(&self) -> RoomId;
}

/// 對 stregsystem 後端的存取介面
#[async_trait]
pub trait StregsystemApi: Send + Sync {
    /// Capability test. Never fails: any transport problem reads as `false`.
    async fn check_access(&self) -> bool;

    async fn resolve_member_id(&self, username: &str) -> Result<MemberId>;

    async fn fetch_member_info(&self, member_id: MemberId) -> Result<MemberInfo>;

    async fn fetch_balance(&self, member_id: MemberId) -> Result<f64>;

    async fn fetch_active_products(&self, room: RoomId) -> Result<ActiveProductCatalog>;

    async fn post_sale(
        &self,
        buy_string: &str,
        room: RoomId,
        member_id: MemberId,
    ) -> Result<SaleResponse>;

    /// 先解析 id 再取會員資料，任一步失敗就停止
    async fn fetch_profile(&self, username: &str) -> Result<UserProfile> {
        let member_id = self.resolve_member_id(username).await?;
        let info = self.fetch_member_info(member_id).await?;
        Ok(info.into_profile(username, member_id))
    }
}
