// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::batch::{BatchError, BatchReport, BatchStatus, BatchTracker};
use crate::domain::services::credential_rotator::CredentialRotator;
use crate::domain::services::task_processor::TaskProcessor;
use crate::queue::task_queue::TaskQueue;
use crate::workers::aggregator::ResultAggregator;
use crate::workers::extraction_worker::ExtractionWorker;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作器池
///
/// 启动 `min(并发上限, 任务数)` 个工作器，等待队列排空后汇合全部工作器。
/// 单个工作器的失败不会让其他工作器提前结束。
pub struct WorkerPool {
    processor: Arc<TaskProcessor>,
}

impl WorkerPool {
    pub fn new(processor: Arc<TaskProcessor>) -> Self {
        Self { processor }
    }

    /// 运行批次
    ///
    /// # 参数
    ///
    /// * `queue` - 已填充的任务队列
    /// * `knowledge` - 知识库文本
    /// * `rotator` - 凭证轮换器
    /// * `concurrency` - 并发上限
    /// * `tracker` - 批次状态跟踪器，必须处于 Created 状态
    ///
    /// # 返回值
    ///
    /// * `Ok(BatchReport)` - 所有工作器结束后的结果
    /// * `Err(BatchError)` - 跟踪器状态不允许启动，或工作器异常终止导致结果少于任务数
    pub async fn run(
        &self,
        queue: Arc<dyn TaskQueue>,
        knowledge: Arc<str>,
        rotator: Arc<CredentialRotator>,
        concurrency: NonZeroUsize,
        tracker: Arc<BatchTracker>,
    ) -> Result<BatchReport, BatchError> {
        let pending = queue.len();
        let worker_count = concurrency.get().min(pending);
        let aggregator = Arc::new(ResultAggregator::with_capacity(pending));

        tracker.advance(BatchStatus::Running)?;
        info!(
            batch_id = %tracker.id(),
            tasks = pending,
            workers = worker_count,
            credentials = rotator.pool_size(),
            "Starting extraction workers"
        );

        let mut handles: Vec<JoinHandle<usize>> = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker = ExtractionWorker::new(
                id,
                self.processor.clone(),
                rotator.clone(),
                aggregator.clone(),
                tracker.clone(),
                knowledge.clone(),
            );
            let queue = queue.clone();
            handles.push(tokio::spawn(async move { worker.run(queue.as_ref()).await }));
        }

        let mut aborted_workers = 0usize;
        for handle in handles {
            if let Err(e) = handle.await {
                aborted_workers += 1;
                error!(batch_id = %tracker.id(), error = %e, "Extraction worker terminated abnormally");
            }
        }

        // With zero workers nobody observed the empty queue
        tracker.mark_drained();
        tracker.advance(BatchStatus::Joined)?;

        let recorded = aggregator.recorded();
        if recorded < pending {
            error!(
                batch_id = %tracker.id(),
                expected = pending,
                recorded,
                aborted_workers,
                "Tasks were lost by aborted workers"
            );
            return Err(BatchError::Incomplete {
                expected: pending,
                recorded,
                aborted_workers,
            });
        }

        let report = BatchReport {
            batch_id: tracker.id(),
            records: aggregator.snapshot(),
            workers_spawned: worker_count,
            status: tracker.status(),
        };
        let summary = report.summary();
        info!(
            batch_id = %report.batch_id,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Extraction workers joined"
        );
        Ok(report)
    }
}
