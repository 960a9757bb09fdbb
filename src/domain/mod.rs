// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含爬虫的核心业务逻辑，包括：
/// - 领域模型（models）：URL 和文档
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：语言检测和页面处理
///
/// 领域层不依赖于任何具体的存储实现。
pub mod models;
pub mod repositories;
pub mod services;
