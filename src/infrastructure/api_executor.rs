//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 HTTP 连接池，只暴露"发请求拿 JSON"的能力

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppResult, ConfigError};

/// 原始响应：状态码 + JSON 体
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 响应体里的 `message` 字段
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(|v| v.as_str())
    }
}

/// HTTP 执行器
///
/// 职责：
/// - 持有 reqwest::Client 与 API 根地址
/// - 统一附加 Bearer 凭证与超时
/// - 不认识 Exam / Question
pub struct ApiExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl ApiExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| ConfigError::HttpClient { source })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 发送 GET 请求
    pub async fn get_json(&self, path: &str, token: &str) -> Result<ApiResponse, ApiError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::from_transport(path, e))?;

        Self::read_body(path, response).await
    }

    /// 发送 POST 请求（JSON 请求体）
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(path, e))?;

        Self::read_body(path, response).await
    }

    /// 读取响应体，非 JSON 的错误页面按空对象处理
    async fn read_body(path: &str, response: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(path, e))?;

        let body = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) if (200..300).contains(&status) => {
                    return Err(ApiError::bad_response(path, format!("JSON解析失败: {}", e)));
                }
                Err(_) => JsonValue::Null,
            }
        };

        debug!("{} -> {}", path, status);
        Ok(ApiResponse { status, body })
    }
}
