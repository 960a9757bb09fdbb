// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 并发调度页面抓取任务，处理停止请求
pub mod crawler;

pub use crawler::{Crawler, StopHandle};
