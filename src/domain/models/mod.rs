// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 包含爬虫的核心数据结构：
/// - 规范化URL（crawl_url）：去重和调度的基本单位
/// - 文档（document）：写入数据库的网页
pub mod crawl_url;
pub mod document;
