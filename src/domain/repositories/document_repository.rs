// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::Document;
use anyhow::Result;
use async_trait::async_trait;

/// 文档仓库特质
///
/// 定义已入库网页的数据访问接口
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// 保存文档，URL已存在时覆盖内容
    async fn upsert(&self, document: Document) -> Result<()>;
    /// 根据URL查找文档
    async fn find_by_url(&self, url: &str) -> Result<Option<Document>>;
    /// 文档总数
    async fn count(&self) -> Result<u64>;
}
