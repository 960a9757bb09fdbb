// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::setup_repository;
use crawler::domain::models::document::Document;
use crawler::domain::repositories::document_repository::DocumentRepository;

#[tokio::test]
async fn test_upsert_and_find() {
    let repo = setup_repository().await;

    let document = Document::new(
        "https://example.com/".to_string(),
        "<html><head></head><body>hi</body></html>".to_string(),
        Some("en".to_string()),
    );
    repo.upsert(document.clone()).await.unwrap();

    let found = repo
        .find_by_url("https://example.com/")
        .await
        .unwrap()
        .expect("document should exist");
    assert_eq!(found.content, document.content);
    assert_eq!(found.lang.as_deref(), Some("en"));
    assert!((found.crawled_at - document.crawled_at).num_milliseconds().abs() < 1000);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_upsert_replaces_existing_row() {
    let repo = setup_repository().await;
    let url = "https://example.com/page";

    repo.upsert(Document::new(url.to_string(), "old".to_string(), Some("en".to_string())))
        .await
        .unwrap();
    repo.upsert(Document::new(url.to_string(), "new".to_string(), Some("de".to_string())))
        .await
        .unwrap();

    let found = repo.find_by_url(url).await.unwrap().unwrap();
    assert_eq!(found.content, "new");
    assert_eq!(found.lang.as_deref(), Some("de"));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_find_missing_returns_none() {
    let repo = setup_repository().await;
    assert!(repo.find_by_url("https://nowhere.example/").await.unwrap().is_none());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_url_is_rejected() {
    let repo = setup_repository().await;
    let result = repo
        .upsert(Document::new(String::new(), "x".to_string(), None))
        .await;

    assert!(result.is_err());
    assert_eq!(repo.count().await.unwrap(), 0);
}
