// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{build_crawler, server_url};
use crawler::infrastructure::state_store::LocalStateStore;
use crawler::queue::frontier::Frontier;
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_state_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html lang="de"><body><p>Hallo</p><a href="/weiter">weiter</a></body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    let seed = server_url(&server, "/");
    let mut test = build_crawler(&seed).await;
    timeout(Duration::from_secs(30), test.crawler.run())
        .await
        .expect("crawl should finish");

    let dir = tempfile::tempdir().unwrap();
    let store = LocalStateStore::new(dir.path().join("state.json"));
    store.save(&test.crawler.state().await).await.unwrap();

    let state = store.load().await.unwrap().expect("state file written");
    // robots.txt 为 404，按主机缓存
    assert_eq!(state.robots.len(), 1);
    assert!(state.pending.is_empty());
    assert_eq!(state.finished.len(), 2);

    let frontier = Frontier::from_state(state);
    assert!(frontier.is_idle());
    assert!(frontier.is_finished(&seed));
    assert!(frontier.is_finished(&server_url(&server, "/weiter")));
}
