use crate::utils::error::TransportError;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// 對後端發出單次 HTTP 呼叫；只有 200 算成功，不重試
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a relative operation path onto the base URL. Dot segments are
    /// resolved, so `..` points at the parent of the API root.
    pub fn endpoint(&self, path: &str) -> TransportResult<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Ok(Url::parse(&joined)?)
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> TransportResult<Response> {
        let url = self.endpoint(path)?;
        tracing::debug!("📡 GET {} {:?}", url, query);

        let response = self.client.get(url).query(query).send().await?;
        Self::ensure_ok(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> TransportResult<Response> {
        let url = self.endpoint(path)?;
        tracing::debug!("📡 POST {}", url);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .json(body)
            .send()
            .await?;
        Self::ensure_ok(response).await
    }

    /// 可用性檢查: 任何例外或非 200 都視為 `false`
    pub async fn probe(&self) -> bool {
        let url = match self.endpoint("..") {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("⚠️ Stregsystem access check failed: {}", e);
                return false;
            }
        };

        match self.client.get(url.clone()).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                tracing::debug!("✅ Stregsystem reachable at {}", url);
                true
            }
            Ok(response) => {
                tracing::warn!(
                    "⚠️ Stregsystem access check failed: {} returned {}",
                    url,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::warn!("⚠️ Stregsystem access check failed: {}", e);
                false
            }
        }
    }

    pub async fn read_json<T: DeserializeOwned + Send>(response: Response) -> TransportResult<T> {
        let url = response.url().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| TransportError::InvalidBody {
            url,
            message: e.to_string(),
        })
    }

    async fn ensure_ok(response: Response) -> TransportResult<Response> {
        let status = response.status();
        tracing::debug!("API response status: {} ({})", status, response.url());

        if status == StatusCode::OK {
            return Ok(response);
        }

        let url = response.url().to_string();
        // 讀不到內容時仍保留狀態碼
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("⚠️ Could not read error body from {}: {}", url, e);
                String::new()
            }
        };
        Err(TransportError::UnexpectedStatus {
            status: status.as_u16(),
            url,
            body,
        })
    }
}
