// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::domain::models::crawl_url::CrawlUrl;
use crate::infrastructure::state_store::CrawlState;
use crate::utils::bucket_set::BucketSet;
use crate::utils::robots::RobotsFile;

fn host_of(url: &CrawlUrl) -> String {
    url.host.clone()
}

/// 抓取边界
///
/// 记录待抓取、抓取中和已完成的URL，以及每个主机下次请求的最早时间。
/// 同一主机同时最多只有一个URL在抓取中。
pub struct Frontier {
    pending: BucketSet<CrawlUrl, String>,
    finished: HashSet<CrawlUrl>,
    in_flight: HashMap<String, CrawlUrl>,
    next_allowed: HashMap<String, DateTime<Utc>>,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            pending: BucketSet::new(host_of),
            finished: HashSet::new(),
            in_flight: HashMap::new(),
            next_allowed: HashMap::new(),
        }
    }

    /// 从保存的状态恢复
    pub fn from_state(state: CrawlState) -> Self {
        let mut frontier = Self::new();
        frontier.finished = state.finished;
        frontier.next_allowed = state.next_allowed;
        for url in state.pending {
            frontier.add_url(&url);
        }
        frontier
    }

    /// 导出当前状态，抓取中的URL记为待抓取
    pub fn to_state(&self, robots: HashMap<String, RobotsFile>) -> CrawlState {
        CrawlState {
            pending: self
                .pending
                .iter()
                .chain(self.in_flight.values())
                .cloned()
                .collect(),
            finished: self.finished.clone(),
            next_allowed: self.next_allowed.clone(),
            robots,
        }
    }

    /// 加入新URL，已知的URL返回 false
    pub fn add_url(&mut self, url: &CrawlUrl) -> bool {
        let url = url.normalize();
        if self.finished.contains(&url) || self.is_in_flight(&url) {
            return false;
        }
        self.pending.insert(url)
    }

    fn is_in_flight(&self, url: &CrawlUrl) -> bool {
        self.in_flight
            .get(&url.host)
            .is_some_and(|current| current == url)
    }

    /// 取出一批可以立即抓取的URL
    ///
    /// 跳过有请求在途或仍在等待间隔的主机，每个主机最多一个，总数不超过 `capacity`。
    /// 取出的URL从待抓取移到抓取中。
    pub fn next_batch(&mut self, now: DateTime<Utc>, capacity: usize) -> Vec<CrawlUrl> {
        if capacity == 0 {
            return Vec::new();
        }

        self.next_allowed.retain(|_, at| *at > now);

        let busy: HashSet<String> = self
            .in_flight
            .keys()
            .chain(self.next_allowed.keys())
            .cloned()
            .collect();

        let batch: Vec<CrawlUrl> = self
            .pending
            .one_per_bucket_except(&busy)
            .into_iter()
            .take(capacity)
            .map(|(_, url)| url.clone())
            .collect();

        for url in &batch {
            self.pending.remove(url);
            self.in_flight.insert(url.host.clone(), url.clone());
        }

        batch
    }

    /// 标记URL处理完成，并加入发现的链接
    pub fn complete(
        &mut self,
        url: &CrawlUrl,
        links: impl IntoIterator<Item = CrawlUrl>,
        next_allowed_at: Option<DateTime<Utc>>,
    ) {
        if self.is_in_flight(url) {
            self.in_flight.remove(&url.host);
        }
        self.finished.insert(url.clone());

        if let Some(at) = next_allowed_at {
            self.next_allowed.insert(url.host.clone(), at);
        }

        let added = links
            .into_iter()
            .filter(|link| self.add_url(link))
            .count();
        debug!(
            added,
            pending = self.pending.len(),
            finished = self.finished.len(),
            "Finished {}",
            url
        );
    }

    /// 把被中止的URL放回待抓取
    pub fn requeue(&mut self, url: CrawlUrl) {
        if self.is_in_flight(&url) {
            self.in_flight.remove(&url.host);
        }
        self.pending.insert(url);
    }

    /// 最近一个等待中的主机可以再次请求的时间
    pub fn earliest_wakeup(&self) -> Option<DateTime<Utc>> {
        self.pending
            .keys()
            .filter(|host| !self.in_flight.contains_key(*host))
            .filter_map(|host| self.next_allowed.get(host))
            .min()
            .copied()
    }

    /// 没有待抓取也没有抓取中的URL
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn finished_len(&self) -> usize {
        self.finished.len()
    }

    pub fn is_finished(&self, url: &CrawlUrl) -> bool {
        self.finished.contains(&url.normalize())
    }
}
