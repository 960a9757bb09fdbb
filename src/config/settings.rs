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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、爬虫调度和HTTP客户端等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 爬虫配置
    pub crawler: CrawlerSettings,
    /// HTTP客户端配置
    pub http: HttpSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 爬虫配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 请求使用的 User-Agent，同时用于 robots.txt 匹配
    pub user_agent: String,
    /// 没有保存状态时使用的种子URL
    pub seed_urls: Vec<String>,
    /// 允许入库的语言（ISO 639-1）
    pub languages: Vec<String>,
    /// 同时进行中的页面请求上限
    pub max_concurrency: usize,
    /// 爬虫状态文件路径
    pub state_path: String,
    /// robots.txt 缓存有效期（秒）
    pub robots_ttl_secs: u64,
    /// 获取 robots.txt 时最多跟随的重定向次数
    pub max_robots_redirects: usize,
}

/// HTTP客户端配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// 连接超时时间（秒）
    pub connect_timeout_secs: u64,
    /// 请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 每个请求最多尝试次数
    pub max_retries: u32,
    /// 两次尝试之间的等待时间（毫秒）
    pub retry_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            request_timeout_secs: 20,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次读取代码默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 以及 `CRAWLER__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CRAWLER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("crawler.seed_urls")
                    .with_list_parse_key("crawler.languages")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Default DB settings
            .set_default("database.url", "sqlite://data.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default crawler settings
            .set_default("crawler.user_agent", "crawler")?
            .set_default("crawler.seed_urls", vec!["https://en.wikipedia.org"])?
            .set_default("crawler.languages", vec!["en", "de"])?
            .set_default("crawler.max_concurrency", 15)?
            .set_default("crawler.state_path", "state.json")?
            .set_default("crawler.robots_ttl_secs", 24 * 60 * 60)?
            .set_default("crawler.max_robots_redirects", 5)?
            // Default HTTP settings
            .set_default("http.connect_timeout_secs", 15)?
            .set_default("http.request_timeout_secs", 20)?
            .set_default("http.max_retries", 2)?
            .set_default("http.retry_delay_ms", 500)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
