// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 主函数
///
/// 初始化 data.db 的迁移工具入口点，
/// 通过 DATABASE_URL 指定数据库，例如 `sqlite://data.db?mode=rwc`
#[async_std::main]
async fn main() {
    cli::run_cli(migration::Migrator).await;
}
