// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{build_crawler, server_url, setup_repository, USER_AGENT};
use async_trait::async_trait;
use crawler::domain::models::crawl_url::CrawlUrl;
use crawler::domain::repositories::document_repository::DocumentRepository;
use crawler::domain::services::language_service::WhatlangDetector;
use crawler::domain::services::page_service::PageService;
use crawler::engines::traits::{EngineError, FetchResponse, PageFetcher};
use crawler::queue::frontier::Frontier;
use crawler::utils::robots::RobotsTable;
use crawler::workers::Crawler;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME: &str = r#"<html lang="en"><head><title>Home</title></head><body>
<p>Welcome home.</p>
<a href="/about">About</a>
<a href="/private/secret">Secret</a>
<a href="/fr">French</a>
<a href="/missing">Missing</a>
<a href="/old">Old</a>
<a href="https://elsewhere.invalid/" rel="nofollow">Elsewhere</a>
</body></html>"#;

const ABOUT: &str = r#"<html lang="en"><head><title>About</title></head><body>
<p>About us.</p><a href="/">Home</a>
</body></html>"#;

const FRENCH: &str = r#"<html lang="fr"><head><title>Accueil</title></head><body>
<p>Bienvenue.</p><a href="/">Accueil</a>
</body></html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_robots(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("User-agent: *\nDisallow: /private\n", "text/plain"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_site_end_to_end() {
    let server = MockServer::start().await;
    mount_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(ABOUT))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fr"))
        .respond_with(html(FRENCH))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/about"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/private"))
        .respond_with(html(ABOUT))
        .expect(0)
        .mount(&server)
        .await;

    let seed = server_url(&server, "/");
    let mut test = build_crawler(&seed).await;

    timeout(Duration::from_secs(30), test.crawler.run())
        .await
        .expect("crawl should finish on its own");

    let frontier = test.crawler.frontier();
    assert!(frontier.is_idle());
    // /, /about, /private/secret, /fr, /missing, /old
    assert_eq!(frontier.finished_len(), 6);
    assert!(frontier.is_finished(&server_url(&server, "/private/secret")));

    let repo = &test.repository;
    assert_eq!(repo.count().await.unwrap(), 2);

    let home = repo
        .find_by_url(&seed.to_string())
        .await
        .unwrap()
        .expect("home page indexed");
    assert_eq!(home.lang.as_deref(), Some("en"));
    assert!(home.content.contains("<title>Home</title>"));

    let about = server_url(&server, "/about").to_string();
    assert!(repo.find_by_url(&about).await.unwrap().is_some());

    let french = server_url(&server, "/fr").to_string();
    assert!(repo.find_by_url(&french).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stop_requeues_in_flight_pages() {
    let server = MockServer::start().await;
    mount_robots(&server).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let seed = server_url(&server, "/");
    let mut test = build_crawler(&seed).await;

    let stop = test.crawler.stop_handle();
    tokio::spawn(async move {
        sleep(Duration::from_millis(300)).await;
        stop.stop();
    });

    timeout(Duration::from_secs(5), test.crawler.run())
        .await
        .expect("stop should cancel the slow request");

    let frontier = test.crawler.frontier();
    assert_eq!(frontier.pending_len(), 1);
    assert_eq!(frontier.in_flight_len(), 0);
    assert_eq!(frontier.finished_len(), 0);
    assert_eq!(test.repository.count().await.unwrap(), 0);

    // 停止标志已经复位，再次停止后仍能正常返回
    let stop = test.crawler.stop_handle();
    tokio::spawn(async move {
        sleep(Duration::from_millis(300)).await;
        stop.stop();
    });
    timeout(Duration::from_secs(5), test.crawler.run())
        .await
        .expect("second run should also stop");
    assert_eq!(test.crawler.frontier().pending_len(), 1);
}

/// robots.txt 返回 404，其他页面直接 panic
struct PanickingFetcher;

#[async_trait]
impl PageFetcher for PanickingFetcher {
    async fn fetch(&self, url: &CrawlUrl) -> Result<FetchResponse, EngineError> {
        if url.to_string().ends_with("/robots.txt") {
            return Ok(FetchResponse {
                url: url.clone(),
                status_code: 404,
                headers: HashMap::new(),
                content_type: "text/plain".to_string(),
                body: String::new(),
                location: None,
            });
        }
        panic!("fetcher blew up on {}", url);
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

#[tokio::test]
async fn test_panicking_page_is_marked_finished() {
    let repository = setup_repository().await;
    let pages = PageService::new(
        Arc::new(PanickingFetcher),
        Arc::new(RobotsTable::new(chrono::Duration::hours(24), 5)),
        repository.clone(),
        Arc::new(WhatlangDetector),
        vec!["en".to_string()],
        USER_AGENT,
    )
    .expect("Failed to build page service");

    let first = CrawlUrl::parse("https://example.com/boom").unwrap();
    let second = CrawlUrl::parse("https://example.org/boom").unwrap();
    let mut frontier = Frontier::new();
    frontier.add_url(&first);
    frontier.add_url(&second);

    let mut crawler = Crawler::new(Arc::new(pages), frontier, 15);
    timeout(Duration::from_secs(5), crawler.run())
        .await
        .expect("crawl should finish after the panics");

    let frontier = crawler.frontier();
    assert!(frontier.is_idle());
    assert_eq!(frontier.pending_len(), 0);
    assert_eq!(frontier.in_flight_len(), 0);
    assert_eq!(frontier.finished_len(), 2);
    assert!(frontier.is_finished(&first));
    assert!(frontier.is_finished(&second));
    assert_eq!(repository.count().await.unwrap(), 0);
}
