// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 重试策略
///
/// 两次尝试之间等待固定间隔，可以加上随机抖动，避免同时失败的请求在同一时刻重试
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（包含第一次请求）
    pub max_attempts: u32,
    /// 重试间隔
    pub delay: Duration,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
}

impl RetryPolicy {
    /// 创建固定间隔、无抖动的重试策略
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            jitter_factor: 0.0,
        }
    }

    /// 设置抖动因子，超出范围的值会被截断到 0.0-1.0
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// 计算下次重试前的等待时间
    pub fn calculate_backoff(&self, _attempt: u32) -> Duration {
        let base = self.delay.as_secs_f64();
        if self.jitter_factor <= 0.0 || base <= 0.0 {
            return self.delay;
        }

        let jitter_range = base * self.jitter_factor;
        let jitter = rand::random_range(-jitter_range..jitter_range);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// 第 `attempt` 次尝试失败后是否还能重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
