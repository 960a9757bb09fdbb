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

use crawler::config::settings::Settings;
use crawler::domain::models::crawl_url::CrawlUrl;
use crawler::domain::repositories::document_repository::DocumentRepository;
use crawler::domain::services::language_service::WhatlangDetector;
use crawler::domain::services::page_service::PageService;
use crawler::engines::reqwest_engine::ReqwestEngine;
use crawler::infrastructure::database::connection;
use crawler::infrastructure::repositories::document_repo_impl::DocumentRepositoryImpl;
use crawler::infrastructure::state_store::LocalStateStore;
use crawler::queue::frontier::Frontier;
use crawler::utils::errors::CrawlerError;
use crawler::utils::robots::RobotsTable;
use crawler::utils::telemetry;
use crawler::workers::Crawler;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 主函数
///
/// 初始化数据库、抓取引擎和爬虫状态，运行爬虫直到完成或收到 Ctrl-C，然后保存状态
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting crawler...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. Connect to database and apply migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    let repository = Arc::new(DocumentRepositoryImpl::new(db));

    // 4. Restore state or start from the seeds
    let robots = Arc::new(RobotsTable::new(
        chrono::Duration::seconds(settings.crawler.robots_ttl_secs as i64),
        settings.crawler.max_robots_redirects,
    ));
    let store = LocalStateStore::new(&settings.crawler.state_path);
    let frontier = restore_frontier(&store, &robots, &settings.crawler.seed_urls).await?;

    // 5. Initialize components
    let pages = Arc::new(build_page_service(&settings, robots, repository.clone())?);
    let mut crawler = Crawler::new(pages, frontier, settings.crawler.max_concurrency);

    // 6. Stop on Ctrl-C
    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => stop.stop(),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    crawler.run().await;

    // 7. Save state
    store.save(&crawler.state().await).await?;

    match repository.count().await {
        Ok(count) => info!("{} documents in the database", count),
        Err(e) => warn!("Failed to count documents: {}", e),
    }

    Ok(())
}

/// 读取保存的状态；没有状态文件时从种子URL开始
async fn restore_frontier(
    store: &LocalStateStore,
    robots: &RobotsTable,
    seeds: &[String],
) -> Result<Frontier, CrawlerError> {
    if let Some(mut state) = store.load().await? {
        robots.restore(std::mem::take(&mut state.robots));
        return Ok(Frontier::from_state(state));
    }

    let mut frontier = Frontier::new();
    for seed in seeds {
        match CrawlUrl::parse(seed) {
            Ok(url) => {
                frontier.add_url(&url);
            }
            Err(e) => warn!("Ignoring seed URL: {}", e),
        }
    }
    info!(seeds = frontier.pending_len(), "No saved state, starting from seeds");
    Ok(frontier)
}

fn build_page_service(
    settings: &Settings,
    robots: Arc<RobotsTable>,
    repository: Arc<DocumentRepositoryImpl>,
) -> Result<PageService, CrawlerError> {
    let engine = ReqwestEngine::new(&settings.http, &settings.crawler.user_agent)?;

    PageService::new(
        Arc::new(engine),
        robots,
        repository,
        Arc::new(WhatlangDetector),
        settings.crawler.languages.clone(),
        settings.crawler.user_agent.clone(),
    )
}
