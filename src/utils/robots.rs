// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use robotstxt::DefaultMatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::models::crawl_url::CrawlUrl;
use crate::engines::traits::{EngineError, FetchResponse, PageFetcher};

/// Crawl-delay 和 Request-rate 换算出的等待上限（秒）
const MAX_WAIT_SECS: f64 = 24.0 * 60.0 * 60.0;

/// robots.txt 的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum RobotsPolicy {
    /// 没有 robots.txt（或 4xx），全部允许
    AllowAll,
    /// 无法确认规则（5xx、429、网络错误），全部禁止
    DisallowAll,
    /// 按 robots.txt 内容判断
    Rules(String),
}

/// 缓存的 robots.txt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotsFile {
    /// 处理结果
    pub policy: RobotsPolicy,
    /// 获取时间
    pub fetched_at: DateTime<Utc>,
}

/// 同一组 User-agent 下的限速指令
#[derive(Debug, Default)]
struct AgentGroup {
    agents: Vec<String>,
    crawl_delay: Option<f64>,
    request_rate: Option<(u32, u32)>,
}

impl RobotsFile {
    fn with_policy(policy: RobotsPolicy) -> Self {
        Self {
            policy,
            fetched_at: Utc::now(),
        }
    }

    pub fn allow_all() -> Self {
        Self::with_policy(RobotsPolicy::AllowAll)
    }

    pub fn disallow_all() -> Self {
        Self::with_policy(RobotsPolicy::DisallowAll)
    }

    pub fn from_rules(body: impl Into<String>) -> Self {
        Self::with_policy(RobotsPolicy::Rules(body.into()))
    }

    /// 根据 robots.txt 响应构建
    ///
    /// 2xx 解析内容；除 429 外的 4xx 视为没有限制；其他状态全部禁止
    pub fn from_response(response: &FetchResponse) -> Self {
        if response.is_success() {
            Self::from_rules(response.body.clone())
        } else if response.is_client_error() && response.status_code != 429 {
            Self::allow_all()
        } else {
            Self::disallow_all()
        }
    }

    /// 缓存是否过期
    pub fn expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.fetched_at + ttl < now
    }

    /// 检查是否允许抓取给定URL
    pub fn can_fetch(&self, url: &CrawlUrl, user_agent: &str) -> bool {
        match &self.policy {
            RobotsPolicy::AllowAll => true,
            RobotsPolicy::DisallowAll => false,
            RobotsPolicy::Rules(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, user_agent, &url.to_string())
            }
        }
    }

    /// Crawl-delay 指令（秒）
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.with_group(user_agent, |group| group.crawl_delay)
    }

    /// Request-rate 指令，返回 (请求数, 秒数)
    pub fn request_rate(&self, user_agent: &str) -> Option<(u32, u32)> {
        self.with_group(user_agent, |group| group.request_rate)
    }

    /// 计算同一主机下一次请求的最早时间
    ///
    /// 取 Crawl-delay 与 Request-rate 换算出的间隔中较大者，最多等待一天
    pub fn next_allowed_at(&self, user_agent: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = self.crawl_delay(user_agent).unwrap_or(0.0);
        let interval = self
            .request_rate(user_agent)
            .map(|(requests, seconds)| f64::from(seconds) / f64::from(requests))
            .unwrap_or(0.0);

        let wait_secs = delay.max(interval).min(MAX_WAIT_SECS);
        let wait = Duration::milliseconds((wait_secs * 1000.0).round() as i64);
        now.checked_add_signed(wait).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn with_group<T>(&self, user_agent: &str, f: impl Fn(&AgentGroup) -> Option<T>) -> Option<T> {
        let RobotsPolicy::Rules(body) = &self.policy else {
            return None;
        };

        let groups = parse_groups(body);
        find_group(&groups, user_agent).and_then(f)
    }
}

/// 解析 robots.txt 中的 User-agent 分组
///
/// 连续的 User-agent 行属于同一组，遇到其他指令后再出现 User-agent 则开始新组
fn parse_groups(body: &str) -> Vec<AgentGroup> {
    let mut groups = Vec::new();
    let mut current: Option<AgentGroup> = None;
    let mut reading_agents = false;

    for raw_line in body.lines() {
        let line = raw_line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !reading_agents {
                    if let Some(group) = current.take() {
                        groups.push(group);
                    }
                    reading_agents = true;
                }
                current
                    .get_or_insert_with(AgentGroup::default)
                    .agents
                    .push(value.to_ascii_lowercase());
            }
            "crawl-delay" => {
                reading_agents = false;
                if let (Some(group), Ok(delay)) = (current.as_mut(), value.parse::<f64>()) {
                    if delay.is_finite() && delay >= 0.0 {
                        group.crawl_delay = Some(delay);
                    }
                }
            }
            "request-rate" => {
                reading_agents = false;
                if let (Some(group), Some(rate)) = (current.as_mut(), parse_request_rate(value)) {
                    group.request_rate = Some(rate);
                }
            }
            _ => reading_agents = false,
        }
    }

    groups.extend(current);
    groups
}

fn parse_request_rate(value: &str) -> Option<(u32, u32)> {
    let (requests, seconds) = value.split_once('/')?;
    // "1/10s" 之类的写法只取数字部分
    let seconds = seconds.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let requests = requests.trim().parse::<u32>().ok()?;
    let seconds = seconds.parse::<u32>().ok()?;
    (requests > 0 && seconds > 0).then_some((requests, seconds))
}

/// 先找明确匹配本爬虫的分组，找不到再使用 `*`
fn find_group<'a>(groups: &'a [AgentGroup], user_agent: &str) -> Option<&'a AgentGroup> {
    let product = user_agent
        .split('/')
        .next()
        .unwrap_or(user_agent)
        .to_ascii_lowercase();

    groups
        .iter()
        .find(|group| {
            group
                .agents
                .iter()
                .any(|agent| agent != "*" && !agent.is_empty() && product.contains(agent.as_str()))
        })
        .or_else(|| {
            groups
                .iter()
                .find(|group| group.agents.iter().any(|agent| agent == "*"))
        })
}

type RobotsSlot = Arc<Mutex<Option<Arc<RobotsFile>>>>;

/// 所有主机的 robots.txt 表
///
/// 以 authority（主机加非默认端口）为键，每个条目有独立的异步锁，
/// 同一主机的并发请求只会触发一次下载。
pub struct RobotsTable {
    entries: DashMap<String, RobotsSlot>,
    ttl: Duration,
    max_redirects: usize,
}

impl RobotsTable {
    /// 创建空表
    ///
    /// # 参数
    ///
    /// * `ttl` - 缓存有效期
    /// * `max_redirects` - 获取 robots.txt 时最多跟随的重定向次数
    pub fn new(ttl: Duration, max_redirects: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_redirects,
        }
    }

    /// 获取URL所在主机的 robots.txt，缓存过期时重新下载
    pub async fn get(&self, url: &CrawlUrl, fetcher: &dyn PageFetcher) -> Arc<RobotsFile> {
        let slot = self.entries.entry(url.authority()).or_default().clone();
        let mut cached = slot.lock().await;

        if let Some(file) = cached.as_ref() {
            if !file.expired(self.ttl, Utc::now()) {
                return file.clone();
            }
        }

        let file = Arc::new(self.download(url, fetcher).await);
        *cached = Some(file.clone());
        file
    }

    async fn download(&self, url: &CrawlUrl, fetcher: &dyn PageFetcher) -> RobotsFile {
        let mut target = url.robots_url();

        for _ in 0..=self.max_redirects {
            let response = match fetcher.fetch(&target).await {
                Ok(response) => response,
                Err(EngineError::InvalidUrl(e)) => {
                    debug!("Invalid robots.txt location {}: {}", target, e);
                    return RobotsFile::allow_all();
                }
                Err(e) => {
                    warn!("Failed to fetch robots.txt from {}: {}", target, e);
                    return RobotsFile::disallow_all();
                }
            };

            if !response.is_redirect() {
                return RobotsFile::from_response(&response);
            }

            let location = response.location.as_deref().unwrap_or_default();
            match target.join(location) {
                Ok(next) => {
                    debug!("robots.txt for {} redirects to {}", url.authority(), next);
                    target = next;
                }
                Err(e) => {
                    debug!("Invalid robots.txt redirect from {}: {}", target, e);
                    return RobotsFile::allow_all();
                }
            }
        }

        debug!("Too many robots.txt redirects for {}", url.authority());
        RobotsFile::allow_all()
    }

    /// 当前缓存的所有 robots.txt，用于保存状态
    pub async fn snapshot(&self) -> HashMap<String, RobotsFile> {
        let slots: Vec<(String, RobotsSlot)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut snapshot = HashMap::with_capacity(slots.len());
        for (authority, slot) in slots {
            if let Some(file) = slot.lock().await.as_ref() {
                snapshot.insert(authority, file.as_ref().clone());
            }
        }
        snapshot
    }

    /// 从保存的状态恢复缓存
    pub fn restore(&self, files: HashMap<String, RobotsFile>) {
        for (authority, file) in files {
            self.entries
                .insert(authority, Arc::new(Mutex::new(Some(Arc::new(file)))));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "robots_test.rs"]
mod tests;
