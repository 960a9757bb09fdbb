// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::engines::traits::EngineError;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("无效参数: {0}")]
    InvalidParameter(String),
}

/// 状态持久化错误类型
#[derive(Error, Debug)]
pub enum StateError {
    #[error("读写状态文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("状态序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 爬虫错误类型
#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("引擎错误: {0}")]
    Engine(#[from] EngineError),

    #[error("状态错误: {0}")]
    State(#[from] StateError),
}
