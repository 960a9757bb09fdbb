// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::models::crawl_url::CrawlUrl;
use crate::utils::errors::StateError;
use crate::utils::robots::RobotsFile;

/// 爬虫的可恢复状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlState {
    /// 待抓取URL
    pub pending: HashSet<CrawlUrl>,
    /// 已处理URL
    pub finished: HashSet<CrawlUrl>,
    /// 每个主机下次请求的最早时间
    pub next_allowed: HashMap<String, DateTime<Utc>>,
    /// robots.txt 缓存，键为 authority
    #[serde(default)]
    pub robots: HashMap<String, RobotsFile>,
}

/// 本地 JSON 状态文件
pub struct LocalStateStore {
    path: PathBuf,
}

impl LocalStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取状态，文件不存在时返回 `None`
    pub async fn load(&self) -> Result<Option<CrawlState>, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let state: CrawlState = serde_json::from_slice(&bytes)?;
        info!(
            pending = state.pending.len(),
            finished = state.finished.len(),
            "Loaded state from {}",
            self.path.display()
        );
        Ok(Some(state))
    }

    /// 保存状态
    ///
    /// 先写入临时文件再重命名，中途失败不会破坏已有的状态文件
    pub async fn save(&self, state: &CrawlState) -> Result<(), StateError> {
        let bytes = serde_json::to_vec(state)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(
            pending = state.pending.len(),
            finished = state.finished.len(),
            "Saved state to {}",
            self.path.display()
        );
        Ok(())
    }
}
