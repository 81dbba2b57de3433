// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::batch::{BatchError, BatchReport, BatchTracker};
use crate::domain::models::task::{Task, TaskError};
use crate::domain::services::credential_rotator::CredentialRotator;
use crate::domain::services::task_processor::TaskProcessor;
use crate::queue::task_queue::{InMemoryTaskQueue, QueueError, TaskQueue};
use crate::utils::errors::ConfigurationError;
use crate::workers::pool::WorkerPool;
use secrecy::SecretString;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BatchRunError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid task: {0}")]
    Task(#[from] TaskError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

/// 提取批次用例
///
/// 构造时校验前置条件（凭证池非空、并发数为正），
/// 运行时把URL列表转为任务、填充并封闭队列，再交给工作器池。
pub struct ExtractionBatch {
    pool: WorkerPool,
    rotator: Arc<CredentialRotator>,
    max_concurrency: NonZeroUsize,
}

impl ExtractionBatch {
    pub fn new(
        processor: Arc<TaskProcessor>,
        credentials: Vec<SecretString>,
        max_concurrency: usize,
    ) -> Result<Self, ConfigurationError> {
        let max_concurrency = NonZeroUsize::new(max_concurrency)
            .ok_or(ConfigurationError::InvalidConcurrency(max_concurrency))?;
        let rotator = Arc::new(CredentialRotator::new(credentials)?);

        Ok(Self {
            pool: WorkerPool::new(processor),
            rotator,
            max_concurrency,
        })
    }

    /// 运行批次
    ///
    /// # 参数
    ///
    /// * `urls` - 目标URL，允许重复
    /// * `knowledge` - 知识库文本
    ///
    /// # 返回值
    ///
    /// * `Ok(BatchReport)` - 每个URL恰好对应一条结果记录
    /// * `Err(BatchRunError)` - 在任何工作器启动之前发现的致命错误
    pub async fn run<I, S>(&self, urls: I, knowledge: &str) -> Result<BatchReport, BatchRunError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tasks = urls
            .into_iter()
            .enumerate()
            .map(|(sequence, url)| Task::new(url, sequence))
            .collect::<Result<Vec<_>, _>>()?;

        let queue = Arc::new(InMemoryTaskQueue::new());
        for task in tasks {
            queue.enqueue(task).await?;
        }
        queue.seal();

        let tracker = Arc::new(BatchTracker::new());
        info!(batch_id = %tracker.id(), tasks = queue.len(), "Batch created");

        let report = self
            .pool
            .run(
                queue,
                Arc::from(knowledge),
                self.rotator.clone(),
                self.max_concurrency,
                tracker,
            )
            .await?;
        Ok(report)
    }
}
