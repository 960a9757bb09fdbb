// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 维护待抓取URL和主机级别的访问间隔
pub mod frontier;
