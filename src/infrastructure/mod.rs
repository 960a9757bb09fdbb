// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 包含系统的技术实现细节：
/// - 数据库（database）：连接池、迁移和实体映射
/// - 仓库实现（repositories）：领域仓库接口的具体实现
/// - 状态存储（state_store）：爬虫状态的保存与恢复
pub mod database;
pub mod repositories;
pub mod state_store;
