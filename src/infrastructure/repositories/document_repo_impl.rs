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

use crate::domain::models::document::Document;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::infrastructure::database::entities::document as document_entity;
use crate::utils::errors::RepositoryError;
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use std::sync::Arc;

/// 文档仓库实现
pub struct DocumentRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl DocumentRepositoryImpl {
    /// 创建新的文档仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn database_error(e: DbErr) -> RepositoryError {
    RepositoryError::DatabaseError(e.to_string())
}

#[async_trait]
impl DocumentRepository for DocumentRepositoryImpl {
    async fn upsert(&self, document: Document) -> Result<()> {
        if document.url.is_empty() {
            return Err(
                RepositoryError::InvalidParameter("document url is empty".to_string()).into(),
            );
        }

        let model = document_entity::ActiveModel {
            url: Set(document.url),
            content: Set(document.content),
            lang: Set(document.lang),
            crawled_at: Set(Some(document.crawled_at)),
        };

        document_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(document_entity::Column::Url)
                    .update_columns([
                        document_entity::Column::Content,
                        document_entity::Column::Lang,
                        document_entity::Column::CrawledAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Document>> {
        let model = document_entity::Entity::find_by_id(url.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(database_error)?;

        Ok(model.map(|m| Document {
            url: m.url,
            content: m.content,
            lang: m.lang,
            crawled_at: m.crawled_at.unwrap_or_default(),
        }))
    }

    async fn count(&self) -> Result<u64> {
        let count = document_entity::Entity::find()
            .count(self.db.as_ref())
            .await
            .map_err(database_error)?;
        Ok(count)
    }
}
