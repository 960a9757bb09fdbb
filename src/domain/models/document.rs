// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已入库的网页文档
///
/// 以URL为主键，内容为清理后的HTML。同一URL再次抓取时覆盖旧记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 文档URL（规范化后的字符串形式）
    pub url: String,
    /// 清理后的HTML
    pub content: String,
    /// 检测出的语言（ISO 639-1）
    pub lang: Option<String>,
    /// 抓取时间
    pub crawled_at: DateTime<Utc>,
}

impl Document {
    /// 创建一个抓取时间为当前时间的文档
    pub fn new(url: String, content: String, lang: Option<String>) -> Self {
        Self {
            url,
            content,
            lang,
            crawled_at: Utc::now(),
        }
    }
}
