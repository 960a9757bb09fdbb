// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
/// 包括 robots.txt 处理、HTML 清理、链接提取、文本解码和遥测等功能
pub mod bucket_set;
pub mod errors;
pub mod html_cleaner;
pub mod links;
pub mod retry_policy;
pub mod robots;
pub mod telemetry;
pub mod text_encoding;
