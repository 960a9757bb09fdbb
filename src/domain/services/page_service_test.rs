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

use super::*;
use crate::engines::traits::EngineError;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const PAGE: &str = "https://example.com/start";
const ROBOTS: &str = "https://example.com/robots.txt";

const ENGLISH_PAGE: &str = r#"<html><head><title>Start</title><script>track()</script></head>
<body><p>The quick brown fox jumps over the lazy dog while the children are playing
in the garden and their parents are reading books.</p>
<a href="/next">next</a> <a href="https://other.org/x" rel="nofollow">skip</a></body></html>"#;

#[derive(Default)]
struct FakeFetcher {
    responses: HashMap<String, FetchResponse>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    fn with(mut self, url: &str, status_code: u16, headers: &[(&str, &str)], body: &str) -> Self {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        let response = FetchResponse {
            url: CrawlUrl::parse(url).unwrap(),
            status_code,
            content_type: headers.get("content-type").cloned().unwrap_or_default(),
            location: headers.get("location").cloned(),
            headers,
            body: body.to_string(),
        };
        self.responses.insert(url.to_string(), response);
        self
    }

    fn html(self, url: &str, extra_headers: &[(&str, &str)], body: &str) -> Self {
        let mut headers = vec![("Content-Type", "text/html; charset=utf-8")];
        headers.extend_from_slice(extra_headers);
        self.with(url, 200, &headers, body)
    }

    fn no_robots(self) -> Self {
        self.with(ROBOTS, 404, &[], "")
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &CrawlUrl) -> Result<FetchResponse, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(&url.to_string())
            .cloned()
            .ok_or_else(|| EngineError::RetriesExhausted {
                url: url.to_string(),
                attempts: 2,
            })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
struct MemoryRepository {
    documents: Mutex<HashMap<String, Document>>,
}

impl MemoryRepository {
    fn get(&self, url: &str) -> Option<Document> {
        self.documents.lock().unwrap().get(url).cloned()
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    async fn upsert(&self, document: Document) -> Result<()> {
        self.documents
            .lock()
            .unwrap()
            .insert(document.url.clone(), document);
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Document>> {
        Ok(self.get(url))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.documents.lock().unwrap().len() as u64)
    }
}

struct FixedDetector(&'static str);

impl LanguageDetector for FixedDetector {
    fn detect(&self, _text: &str) -> Option<String> {
        Some(self.0.to_string())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct Harness {
    service: PageService,
    fetcher: Arc<FakeFetcher>,
    repository: Arc<MemoryRepository>,
}

fn harness_with(fetcher: FakeFetcher, detected: &'static str) -> Harness {
    let fetcher = Arc::new(fetcher);
    let repository = Arc::new(MemoryRepository::default());
    let service = PageService::new(
        fetcher.clone(),
        Arc::new(RobotsTable::new(chrono::Duration::hours(24), 5)),
        repository.clone(),
        Arc::new(FixedDetector(detected)),
        vec!["en".to_string(), "de".to_string()],
        "crawler",
    )
    .unwrap();

    Harness {
        service,
        fetcher,
        repository,
    }
}

fn harness(fetcher: FakeFetcher) -> Harness {
    harness_with(fetcher, "en")
}

fn url(s: &str) -> CrawlUrl {
    CrawlUrl::parse(s).unwrap()
}

#[tokio::test]
async fn test_indexes_page_and_returns_links() {
    let h = harness(FakeFetcher::default().no_robots().html(PAGE, &[], ENGLISH_PAGE));

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert_eq!(outcome.links, HashSet::from([url("https://example.com/next")]));
    assert!(outcome.next_allowed_at.is_some());

    let stored = h.repository.get(PAGE).expect("document stored");
    assert_eq!(stored.lang.as_deref(), Some("en"));
    assert!(stored.content.contains("<title>Start</title>"));
    assert!(!stored.content.contains("track()"));
}

#[tokio::test]
async fn test_robots_disallow_skips_fetch() {
    let fetcher = FakeFetcher::default()
        .with(ROBOTS, 200, &[], "User-agent: *\nDisallow: /")
        .html(PAGE, &[], ENGLISH_PAGE);
    let h = harness(fetcher);

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert_eq!(outcome, PageOutcome::default());
    // 只请求了 robots.txt
    assert_eq!(h.fetcher.calls(), 1);
    assert!(h.repository.get(PAGE).is_none());
}

#[tokio::test]
async fn test_fetch_error_still_sets_next_allowed() {
    let h = harness(FakeFetcher::default().no_robots());

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert!(outcome.links.is_empty());
    assert!(outcome.next_allowed_at.is_some());
}

#[tokio::test]
async fn test_redirect_yields_location() {
    let fetcher = FakeFetcher::default()
        .no_robots()
        .with(PAGE, 301, &[("Location", "/moved?x=1")], "");
    let h = harness(fetcher);

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert_eq!(
        outcome.links,
        HashSet::from([url("https://example.com/moved?x=1")])
    );
    assert!(h.repository.get(PAGE).is_none());
}

#[tokio::test]
async fn test_skips_error_status_and_non_html() {
    let fetcher = FakeFetcher::default()
        .no_robots()
        .with(PAGE, 500, &[("Content-Type", "text/html")], ENGLISH_PAGE)
        .with(
            "https://example.com/data.json",
            200,
            &[("Content-Type", "application/json")],
            "{}",
        );
    let h = harness(fetcher);

    assert!(h.service.load_page(&url(PAGE)).await.links.is_empty());
    assert!(h
        .service
        .load_page(&url("https://example.com/data.json"))
        .await
        .links
        .is_empty());
    assert_eq!(h.repository.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_noindex_keeps_links() {
    let fetcher = FakeFetcher::default()
        .no_robots()
        .html(PAGE, &[("X-Robots-Tag", "NoIndex")], ENGLISH_PAGE);
    let h = harness(fetcher);

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert_eq!(outcome.links.len(), 1);
    assert!(h.repository.get(PAGE).is_none());
}

#[tokio::test]
async fn test_nofollow_indexes_without_links() {
    let fetcher = FakeFetcher::default()
        .no_robots()
        .html(PAGE, &[("X-Robots-Tag", "nofollow")], ENGLISH_PAGE);
    let h = harness(fetcher);

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert!(outcome.links.is_empty());
    assert!(h.repository.get(PAGE).is_some());
}

#[tokio::test]
async fn test_robots_tag_none_blocks_both() {
    let fetcher = FakeFetcher::default()
        .no_robots()
        .html(PAGE, &[("X-Robots-Tag", "none")], ENGLISH_PAGE);
    let h = harness(fetcher);

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert!(outcome.links.is_empty());
    assert!(h.repository.get(PAGE).is_none());
}

#[tokio::test]
async fn test_content_language_must_be_accepted() {
    let fetcher = FakeFetcher::default()
        .no_robots()
        .html(PAGE, &[("Content-Language", "fr-FR")], ENGLISH_PAGE)
        .html(
            "https://example.com/de",
            &[("Content-Language", "de-DE, en")],
            ENGLISH_PAGE,
        );
    let h = harness(fetcher);

    h.service.load_page(&url(PAGE)).await;
    h.service.load_page(&url("https://example.com/de")).await;

    assert!(h.repository.get(PAGE).is_none());
    assert!(h.repository.get("https://example.com/de").is_some());
}

#[tokio::test]
async fn test_detected_language_must_be_accepted() {
    let h = harness_with(
        FakeFetcher::default().no_robots().html(PAGE, &[], ENGLISH_PAGE),
        "fr",
    );

    let outcome = h.service.load_page(&url(PAGE)).await;

    assert_eq!(outcome.links.len(), 1);
    assert!(h.repository.get(PAGE).is_none());
}

#[tokio::test]
async fn test_declared_lang_overrides_detector() {
    let page = r#"<html lang="de"><body><p>Hallo Welt</p></body></html>"#;
    let h = harness_with(FakeFetcher::default().no_robots().html(PAGE, &[], page), "fr");

    h.service.load_page(&url(PAGE)).await;

    let stored = h.repository.get(PAGE).expect("document stored");
    assert_eq!(stored.lang.as_deref(), Some("de"));
}

#[test]
fn test_rejects_empty_language_list() {
    let result = PageService::new(
        Arc::new(FakeFetcher::default()),
        Arc::new(RobotsTable::new(chrono::Duration::hours(24), 5)),
        Arc::new(MemoryRepository::default()),
        Arc::new(FixedDetector("en")),
        vec![" ".to_string()],
        "crawler",
    );

    assert!(matches!(result, Err(CrawlerError::Config(_))));
}
