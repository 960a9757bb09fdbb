// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::settings::HttpSettings;
use crate::domain::models::crawl_url::CrawlUrl;
use crate::engines::traits::{EngineError, FetchResponse, PageFetcher};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::text_encoding;

/// 抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎。所有请求共用一个连接池，
/// 服务器支持时通过 ALPN 使用 HTTP/2，不跟随重定向。
pub struct ReqwestEngine {
    client: Client,
    scheme: &'static str,
    retry_policy: RetryPolicy,
}

impl ReqwestEngine {
    /// 创建新的抓取引擎
    ///
    /// # 参数
    ///
    /// * `settings` - HTTP客户端配置
    /// * `user_agent` - 请求使用的 User-Agent
    ///
    /// # 返回值
    ///
    /// * `Ok(ReqwestEngine)` - 抓取引擎
    /// * `Err(EngineError)` - 客户端构建失败
    pub fn new(settings: &HttpSettings, user_agent: &str) -> Result<Self, EngineError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            scheme: "https",
            retry_policy: RetryPolicy::fixed(
                settings.max_retries.max(1),
                Duration::from_millis(settings.retry_delay_ms),
            )
            .with_jitter(0.1),
        })
    }

    /// 改用明文 HTTP 访问，仅用于本地测试服务器
    pub fn with_plain_http(mut self) -> Self {
        self.scheme = "http";
        self
    }

    fn request_url(&self, url: &CrawlUrl) -> String {
        format!("{}://{}{}", self.scheme, url.authority(), url.target())
    }

    async fn fetch_once(&self, url: &CrawlUrl) -> Result<FetchResponse, EngineError> {
        let response = self.client.get(self.request_url(url)).send().await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut headers = HashMap::new();
        for (k, v) in response.headers() {
            if let Ok(v_str) = v.to_str() {
                headers
                    .entry(k.as_str().to_string())
                    .and_modify(|existing: &mut String| {
                        existing.push_str(", ");
                        existing.push_str(v_str);
                    })
                    .or_insert_with(|| v_str.to_string());
            }
        }

        let bytes = response.bytes().await?;
        let body = text_encoding::decode_body(&bytes, &content_type);

        Ok(FetchResponse {
            url: url.clone(),
            status_code,
            headers,
            content_type,
            body,
            location,
        })
    }
}

#[async_trait]
impl PageFetcher for ReqwestEngine {
    /// 执行HTTP抓取，网络错误时按重试策略重试
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 抓取响应（包括非 2xx 响应）
    /// * `Err(EngineError)` - 不可重试的错误，或重试次数用尽
    async fn fetch(&self, url: &CrawlUrl) -> Result<FetchResponse, EngineError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.fetch_once(url).await {
                Ok(response) => {
                    debug!(status = response.status_code, "Fetched {}", url);
                    return Ok(response);
                }
                Err(e) if e.is_retryable() => {
                    if !self.retry_policy.should_retry(attempt) {
                        warn!("Giving up on {} after {} attempts: {}", url, attempt, e);
                        return Err(EngineError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                        });
                    }
                    warn!("Retrying {} (attempt {}): {}", url, attempt, e);
                    sleep(self.retry_policy.calculate_backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
