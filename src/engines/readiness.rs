// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::EngineError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// 就绪等待策略
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    /// 最长等待时间
    pub timeout: Duration,
    /// 两次探测之间的间隔
    pub poll_interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// 轮询探测直到条件成立或超时
///
/// 探测返回 `Ok(true)` 表示就绪；返回错误时立即结束等待并传递该错误。
///
/// # 参数
///
/// * `policy` - 超时与轮询间隔
/// * `probe` - 每次调用产生一个新的探测 future
///
/// # 返回值
///
/// * `Ok(())` - 条件在超时前成立
/// * `Err(EngineError::NotReady)` - 超时
pub async fn wait_until<F, Fut>(policy: ReadinessPolicy, mut probe: F) -> Result<(), EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, EngineError>>,
{
    let deadline = Instant::now() + policy.timeout;

    loop {
        if probe().await? {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(EngineError::NotReady(policy.timeout));
        }
        sleep(policy.poll_interval.min(deadline - now)).await;
    }
}
