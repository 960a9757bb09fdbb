// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::domain::models::crawl_url::CrawlUrl;
use crate::domain::services::page_service::{PageOutcome, PageService};
use crate::infrastructure::state_store::CrawlState;
use crate::queue::frontier::Frontier;

/// 没有主机在等待时的轮询间隔
const IDLE_POLL: Duration = Duration::from_millis(100);

type PageResult = (CrawlUrl, PageOutcome);

/// 停止句柄
///
/// 可以在信号处理任务中调用
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// 请求停止抓取
    pub fn stop(&self) {
        info!("Stop requested");
        self.tx.send_replace(true);
    }
}

/// 爬虫
///
/// 按主机礼貌地并发抓取：每个主机同时只有一个请求，总并发不超过 `max_concurrency`。
pub struct Crawler {
    frontier: Frontier,
    pages: Arc<PageService>,
    max_concurrency: usize,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl Crawler {
    /// 创建爬虫
    ///
    /// # 参数
    ///
    /// * `pages` - 页面处理服务
    /// * `frontier` - 初始抓取边界
    /// * `max_concurrency` - 最大并发请求数
    pub fn new(pages: Arc<PageService>, frontier: Frontier, max_concurrency: usize) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            frontier,
            pages,
            max_concurrency: max_concurrency.max(1),
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// 请求停止，`run` 运行期间请通过 [`StopHandle`] 调用
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn add_url(&mut self, url: &CrawlUrl) -> bool {
        self.frontier.add_url(url)
    }

    /// 导出可恢复的状态
    pub async fn state(&self) -> CrawlState {
        let robots = self.pages.robots().snapshot().await;
        self.frontier.to_state(robots)
    }

    /// 运行直到没有可抓取的URL或收到停止请求
    ///
    /// 停止时中止所有进行中的请求并把URL放回待抓取，之后可以再次调用 `run`。
    pub async fn run(&mut self) {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut tasks: JoinSet<PageResult> = JoinSet::new();
        let mut running: HashMap<Id, CrawlUrl> = HashMap::new();

        info!(
            pending = self.frontier.pending_len(),
            finished = self.frontier.finished_len(),
            "Crawler started"
        );

        loop {
            if *stop_rx.borrow_and_update() {
                break;
            }

            let now = Utc::now();
            let capacity = self.max_concurrency.saturating_sub(tasks.len());
            for url in self.frontier.next_batch(now, capacity) {
                let pages = self.pages.clone();
                let page_url = url.clone();
                let handle = tasks.spawn(async move {
                    let outcome = pages.load_page(&page_url).await;
                    (page_url, outcome)
                });
                running.insert(handle.id(), url);
            }

            if tasks.is_empty() && self.frontier.is_idle() {
                info!("Nothing left to crawl");
                break;
            }

            let wait = self
                .frontier
                .earliest_wakeup()
                .map_or(IDLE_POLL, |at| (at - now).to_std().unwrap_or(Duration::ZERO));

            tokio::select! {
                Some(joined) = tasks.join_next_with_id() => {
                    self.handle_joined(joined, &mut running);
                }
                _ = sleep(wait) => {}
                _ = stop_rx.changed() => {}
            }
        }

        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Cancelling in-flight requests");
            tasks.abort_all();
            while let Some(joined) = tasks.join_next_with_id().await {
                self.handle_joined(joined, &mut running);
            }
        }

        self.stop_tx.send_replace(false);
        info!(
            pending = self.frontier.pending_len(),
            finished = self.frontier.finished_len(),
            "Crawler stopped"
        );
    }

    fn handle_joined(
        &mut self,
        joined: Result<(Id, PageResult), JoinError>,
        running: &mut HashMap<Id, CrawlUrl>,
    ) {
        match joined {
            Ok((id, (url, outcome))) => {
                running.remove(&id);
                self.frontier
                    .complete(&url, outcome.links, outcome.next_allowed_at);
            }
            Err(e) => {
                let Some(url) = running.remove(&e.id()) else {
                    warn!("Unknown task finished: {}", e);
                    return;
                };

                if e.is_cancelled() {
                    self.frontier.requeue(url);
                } else {
                    error!("Task for {} failed: {}", url, e);
                    self.frontier.complete(&url, Vec::new(), None);
                }
            }
        }
    }
}
