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
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::models::crawl_url::{CrawlUrl, InvalidUrlError};

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 多次尝试后仍然失败
    #[error("Too many tries for {url} ({attempts} attempts)")]
    RetriesExhausted { url: String, attempts: u32 },
    /// URL 无效
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrlError),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// 网络层错误（连接、超时、请求或响应体传输中断）可以重试；
    /// 解码、重定向和客户端构建错误重试也不会成功。
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                if e.is_decode() || e.is_redirect() || e.is_builder() {
                    return false;
                }
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }
}

/// 抓取响应
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// 请求的URL
    pub url: CrawlUrl,
    /// HTTP状态码
    pub status_code: u16,
    /// 响应头，键为小写
    pub headers: HashMap<String, String>,
    /// 内容类型，缺失时为空字符串
    pub content_type: String,
    /// 解码后的响应内容
    pub body: String,
    /// 重定向目标（`Location` 头）
    pub location: Option<String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// 带有 `Location` 的 3xx 响应
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code) && self.location.is_some()
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// 读取响应头（名称大小写不敏感）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// 页面抓取特质
///
/// 抓取器不跟随重定向，3xx 响应原样返回，由调用方决定如何处理。
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 执行抓取
    async fn fetch(&self, url: &CrawlUrl) -> Result<FetchResponse, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
