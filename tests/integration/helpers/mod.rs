// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Duration;
use crawler::config::settings::{DatabaseSettings, HttpSettings};
use crawler::domain::models::crawl_url::CrawlUrl;
use crawler::domain::services::language_service::WhatlangDetector;
use crawler::domain::services::page_service::PageService;
use crawler::engines::reqwest_engine::ReqwestEngine;
use crawler::infrastructure::database::connection;
use crawler::infrastructure::repositories::document_repo_impl::DocumentRepositoryImpl;
use crawler::queue::frontier::Frontier;
use crawler::utils::robots::RobotsTable;
use crawler::workers::Crawler;
use std::sync::Arc;
use wiremock::MockServer;

pub const USER_AGENT: &str = "crawler-test";

/// 内存数据库，已执行迁移
pub async fn setup_repository() -> Arc<DocumentRepositoryImpl> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        min_connections: Some(1),
        connect_timeout: Some(5),
        idle_timeout: None,
    };

    let db = connection::connect_and_migrate(&settings)
        .await
        .expect("Failed to set up test database");
    Arc::new(DocumentRepositoryImpl::new(Arc::new(db)))
}

/// 指向 mock 服务器的URL
pub fn server_url(server: &MockServer, path: &str) -> CrawlUrl {
    CrawlUrl::parse(&format!("{}{}", server.uri(), path)).unwrap()
}

pub struct TestCrawler {
    pub crawler: Crawler,
    pub repository: Arc<DocumentRepositoryImpl>,
}

/// 以 `seed` 为起点、通过明文 HTTP 访问 mock 服务器的爬虫
pub async fn build_crawler(seed: &CrawlUrl) -> TestCrawler {
    let repository = setup_repository().await;

    let http = HttpSettings {
        connect_timeout_secs: 2,
        request_timeout_secs: 10,
        max_retries: 1,
        retry_delay_ms: 10,
    };
    let engine = ReqwestEngine::new(&http, USER_AGENT)
        .expect("Failed to build engine")
        .with_plain_http();

    let pages = PageService::new(
        Arc::new(engine),
        Arc::new(RobotsTable::new(Duration::hours(24), 5)),
        repository.clone(),
        Arc::new(WhatlangDetector),
        vec!["en".to_string(), "de".to_string()],
        USER_AGENT,
    )
    .expect("Failed to build page service");

    let mut frontier = Frontier::new();
    frontier.add_url(seed);

    TestCrawler {
        crawler: Crawler::new(Arc::new(pages), frontier, 15),
        repository,
    }
}
