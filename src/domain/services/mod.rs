// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 语言服务（language_service）：判断页面语言
/// - 页面服务（page_service）：单个页面的抓取、过滤、入库和链接提取
pub mod language_service;
pub mod page_service;
