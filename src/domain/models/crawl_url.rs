// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

static SCHEME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// 无效URL错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的URL: {0}")]
pub struct InvalidUrlError(pub String);

/// 主机与端口
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Netloc {
    pub host: String,
    pub port: Option<u16>,
}

/// 爬虫使用的规范化URL
///
/// 所有URL统一按 https 处理，因此只保存主机、端口、路径和查询串。
/// 端口为 `None` 表示默认端口（包括显式写出的 443）。
/// 路径中的百分号编码会先解码再按段重新编码，保证同一资源只有一种写法。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CrawlUrl {
    /// 小写主机名
    pub host: String,
    /// 非默认端口
    pub port: Option<u16>,
    /// 路径，至少为 `/`
    pub path: String,
    /// 查询串，空查询串记为 `None`
    pub query: Option<String>,
}

impl CrawlUrl {
    /// 解析绝对URL，只接受 http 和 https
    pub fn parse(input: &str) -> Result<Self, InvalidUrlError> {
        let url = Url::parse(input.trim()).map_err(|_| InvalidUrlError(input.to_string()))?;
        Self::from_url(&url)
    }

    /// 从已解析的 [`Url`] 构建
    pub fn from_url(url: &Url) -> Result<Self, InvalidUrlError> {
        let invalid = || InvalidUrlError(url.to_string());

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
            _ => return Err(invalid()),
        };

        // url::Url 已经去掉了协议默认端口，这里再把 443 视为默认端口
        let port = match url.port() {
            None | Some(443) => None,
            Some(port) => Some(port),
        };

        let query = url
            .query()
            .filter(|query| !query.is_empty())
            .map(str::to_string);

        Ok(Self {
            host,
            port,
            path: requote_path(url.path()),
            query,
        })
    }

    /// 同一主机下 robots.txt 的地址
    pub fn robots_url(&self) -> Self {
        Self {
            host: self.host.clone(),
            port: self.port,
            path: "/robots.txt".to_string(),
            query: None,
        }
    }

    /// 更激进的规范化：去掉路径末尾的斜杠并对查询参数排序
    pub fn normalize(&self) -> Self {
        let trimmed = self.path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };

        let query = self.query.as_ref().map(|query| {
            let mut params: Vec<&str> = query.split('&').collect();
            params.sort_unstable();
            params.join("&")
        });

        Self {
            host: self.host.clone(),
            port: self.port,
            path: path.to_string(),
            query,
        }
    }

    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    pub fn netloc(&self) -> Netloc {
        Netloc {
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// 请求目标（路径加查询串）
    pub fn target(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// 以当前URL为基准解析链接
    ///
    /// # 参数
    ///
    /// * `reference` - 页面中的链接，可以是绝对、协议相对、根相对或相对路径
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlUrl)` - 解析后的URL
    /// * `Err(InvalidUrlError)` - 非 http(s) 协议、缺少主机或路径为空
    pub fn join(&self, reference: &str) -> Result<Self, InvalidUrlError> {
        let reference = reference.trim();
        let invalid = || InvalidUrlError(reference.to_string());

        if SCHEME_REGEX.is_match(reference) {
            let url = Url::parse(reference).map_err(|_| invalid())?;
            return Self::from_url(&url).map_err(|_| invalid());
        }

        if let Some(rest) = reference.strip_prefix("//") {
            return Self::parse(&format!("https://{}", rest)).map_err(|_| invalid());
        }

        let without_fragment = reference.split('#').next().unwrap_or_default();
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_fragment, None),
        };

        if path.is_empty() {
            return Err(invalid());
        }

        let joined_path = if path.starts_with('/') {
            path.to_string()
        } else {
            let directory = &self.path[..self.path.rfind('/').unwrap_or(0)];
            format!("{}/{}", directory, path)
        };

        let mut absolute = format!("https://{}{}", self.authority(), joined_path);
        if let Some(query) = query {
            absolute.push('?');
            absolute.push_str(query);
        }

        Self::parse(&absolute).map_err(|_| invalid())
    }
}

impl fmt::Display for CrawlUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}{}", self.authority(), self.target())
    }
}

impl FromStr for CrawlUrl {
    type Err = InvalidUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// 逐段解码再编码路径，`/` 保留为分隔符
fn requote_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    path.split('/')
        .map(|segment| {
            let decoded = urlencoding::decode_binary(segment.as_bytes());
            urlencoding::encode(&String::from_utf8_lossy(&decoded)).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/")
}
