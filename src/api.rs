use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::config::PerfConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::Pagination;

/// Every backend reply is wrapped in `{ data, message?, pagination? }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Backend seam for the performance store.
#[async_trait]
pub trait PerformanceApi: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> ApiResult<Envelope>;
    async fn post(&self, path: &str, body: &Value) -> ApiResult<Envelope>;
}

pub struct HttpApi {
    client: Client,
    base: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(config: &PerfConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read(response: Response) -> ApiResult<Envelope> {
        let status = response.status();
        let body = response.text().await?;
        envelope_from(status, &body)
    }
}

/// Non-2xx replies become `ApiError::Status`, keeping `{ message }` when the body has one.
fn envelope_from(status: StatusCode, body: &str) -> ApiResult<Envelope> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.message);
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl PerformanceApi for HttpApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> ApiResult<Envelope> {
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        tracing::debug!(path, params = query.len(), "GET");
        Self::read(request.send().await?).await
    }

    async fn post(&self, path: &str, body: &Value) -> ApiResult<Envelope> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        tracing::debug!(path, "POST");
        Self::read(request.send().await?).await
    }
}
