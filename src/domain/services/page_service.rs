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

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::domain::models::crawl_url::CrawlUrl;
use crate::domain::models::document::Document;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::domain::services::language_service::{detect_language, LanguageDetector};
use crate::engines::traits::{FetchResponse, PageFetcher};
use crate::utils::errors::CrawlerError;
use crate::utils::html_cleaner::clean_document;
use crate::utils::links::extract_links;
use crate::utils::robots::RobotsTable;

static NOINDEX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:noindex|none)\b").unwrap());
static NOFOLLOW_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:nofollow|none)\b").unwrap());

/// 单个页面的处理结果
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageOutcome {
    /// 需要继续抓取的链接
    pub links: HashSet<CrawlUrl>,
    /// 同一主机下次请求的最早时间，没有发出请求时为 `None`
    pub next_allowed_at: Option<DateTime<Utc>>,
}

/// 清理后的页面
struct ParsedPage {
    content: String,
    lang: Option<String>,
    links: HashSet<CrawlUrl>,
}

/// 页面处理服务
///
/// 负责 robots 检查、抓取、过滤、入库和链接提取
pub struct PageService {
    fetcher: Arc<dyn PageFetcher>,
    robots: Arc<RobotsTable>,
    repository: Arc<dyn DocumentRepository>,
    detector: Arc<dyn LanguageDetector>,
    languages: Vec<String>,
    user_agent: String,
    content_language: Regex,
}

impl PageService {
    /// 创建页面处理服务
    ///
    /// # 参数
    ///
    /// * `fetcher` - 页面抓取器
    /// * `robots` - robots.txt 缓存
    /// * `repository` - 文档仓库
    /// * `detector` - 语言检测器
    /// * `languages` - 接受的语言代码
    /// * `user_agent` - 用于匹配 robots.txt 规则的 User-Agent
    ///
    /// # 返回值
    ///
    /// * `Ok(PageService)` - 页面处理服务
    /// * `Err(CrawlerError)` - 语言列表为空
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        robots: Arc<RobotsTable>,
        repository: Arc<dyn DocumentRepository>,
        detector: Arc<dyn LanguageDetector>,
        languages: Vec<String>,
        user_agent: impl Into<String>,
    ) -> Result<Self, CrawlerError> {
        let languages: Vec<String> = languages
            .into_iter()
            .map(|lang| lang.trim().to_ascii_lowercase())
            .filter(|lang| !lang.is_empty())
            .collect();

        if languages.is_empty() {
            return Err(CrawlerError::Config(
                "at least one language must be accepted".to_string(),
            ));
        }

        let alternatives = languages
            .iter()
            .map(|lang| regex::escape(lang))
            .collect::<Vec<_>>()
            .join("|");
        let content_language = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives))
            .map_err(|e| CrawlerError::Config(e.to_string()))?;

        Ok(Self {
            fetcher,
            robots,
            repository,
            detector,
            languages,
            user_agent: user_agent.into(),
            content_language,
        })
    }

    /// robots.txt 缓存
    pub fn robots(&self) -> &Arc<RobotsTable> {
        &self.robots
    }

    /// 处理单个页面
    ///
    /// 通过检查的页面写入文档仓库，允许跟随时返回页面中的链接。
    /// 抓取或入库失败只记录日志，不会中断抓取。
    #[instrument(skip_all, fields(url = %url))]
    pub async fn load_page(&self, url: &CrawlUrl) -> PageOutcome {
        let robots = self.robots.get(url, self.fetcher.as_ref()).await;
        if !robots.can_fetch(url, &self.user_agent) {
            debug!("Disallowed by robots.txt");
            return PageOutcome::default();
        }

        let fetched = self.fetcher.fetch(url).await;
        let next_allowed_at = Some(robots.next_allowed_at(&self.user_agent, Utc::now()));

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                info!("Fetch failed: {}", e);
                return PageOutcome {
                    links: HashSet::new(),
                    next_allowed_at,
                };
            }
        };

        let links = self.process_response(url, &response).await;
        PageOutcome {
            links,
            next_allowed_at,
        }
    }

    async fn process_response(
        &self,
        url: &CrawlUrl,
        response: &FetchResponse,
    ) -> HashSet<CrawlUrl> {
        if response.is_redirect() {
            let location = response.location.as_deref().unwrap_or_default();
            return match url.join(location) {
                Ok(target) => {
                    debug!("Redirected to {}", target);
                    HashSet::from([target])
                }
                Err(e) => {
                    debug!("Invalid redirect location: {}", e);
                    HashSet::new()
                }
            };
        }

        if !response.is_success() {
            debug!(status = response.status_code, "Skipping non-success response");
            return HashSet::new();
        }

        if !response
            .content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("text/html")
        {
            debug!(content_type = %response.content_type, "Skipping non-HTML response");
            return HashSet::new();
        }

        let robots_tag = response.header("x-robots-tag").unwrap_or_default();
        let page = self.parse_page(url, &response.body);

        if self.should_index(response, robots_tag, page.lang.as_deref()) {
            let document = Document::new(url.to_string(), page.content, page.lang);
            match self.repository.upsert(document).await {
                Ok(()) => info!("Indexed"),
                Err(e) => error!("Failed to store document: {}", e),
            }
        }

        if NOFOLLOW_REGEX.is_match(robots_tag) {
            debug!("Links not followed (X-Robots-Tag)");
            return HashSet::new();
        }

        page.links
    }

    /// 清理页面并提取语言和链接
    ///
    /// `Html` 不是 `Send`，解析结果不能跨越 await
    fn parse_page(&self, url: &CrawlUrl, body: &str) -> ParsedPage {
        let content = clean_document(&Html::parse_document(body));
        let cleaned = Html::parse_document(&content);
        let lang = detect_language(&cleaned, self.detector.as_ref());
        let links = extract_links(url, &cleaned);

        ParsedPage {
            content,
            lang,
            links,
        }
    }

    fn should_index(&self, response: &FetchResponse, robots_tag: &str, lang: Option<&str>) -> bool {
        if NOINDEX_REGEX.is_match(robots_tag) {
            debug!("Not indexed (X-Robots-Tag)");
            return false;
        }

        let content_language = response.header("content-language").unwrap_or("en");
        if !self.content_language.is_match(content_language) {
            debug!(content_language, "Not indexed (Content-Language)");
            return false;
        }

        match lang {
            Some(lang) if self.languages.iter().any(|accepted| accepted == lang) => true,
            other => {
                debug!(lang = ?other, "Not indexed (detected language)");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "page_service_test.rs"]
mod tests;
