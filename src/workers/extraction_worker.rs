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

use crate::domain::models::batch::BatchTracker;
use crate::domain::models::outcome::OutcomeRecord;
use crate::domain::models::task::Task;
use crate::domain::services::credential_rotator::CredentialRotator;
use crate::domain::services::task_processor::TaskProcessor;
use crate::queue::task_queue::TaskQueue;
use crate::workers::aggregator::ResultAggregator;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error};

/// 队列未封闭且暂时为空时的等待间隔
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 提取工作器
///
/// 循环执行 出队 → 获取凭证 → 处理 → 追加结果，直到队列排空
pub struct ExtractionWorker {
    id: usize,
    processor: Arc<TaskProcessor>,
    rotator: Arc<CredentialRotator>,
    aggregator: Arc<ResultAggregator>,
    tracker: Arc<BatchTracker>,
    knowledge: Arc<str>,
}

impl ExtractionWorker {
    pub fn new(
        id: usize,
        processor: Arc<TaskProcessor>,
        rotator: Arc<CredentialRotator>,
        aggregator: Arc<ResultAggregator>,
        tracker: Arc<BatchTracker>,
        knowledge: Arc<str>,
    ) -> Self {
        Self {
            id,
            processor,
            rotator,
            aggregator,
            tracker,
            knowledge,
        }
    }

    /// 运行工作器，返回处理的任务数
    pub async fn run<Q>(&self, queue: &Q) -> usize
    where
        Q: TaskQueue + ?Sized,
    {
        debug!(worker = self.id, "Extraction worker started");
        metrics::gauge!("extractrs_workers_active").increment(1.0);

        let mut processed = 0usize;
        loop {
            match queue.try_dequeue().await {
                Some(task) => {
                    let record = self.handle(&task).await;
                    self.aggregator.append(record);
                    processed += 1;
                }
                None if queue.is_drained() => {
                    self.tracker.mark_drained();
                    break;
                }
                None => sleep(IDLE_POLL_INTERVAL).await,
            }
        }

        metrics::gauge!("extractrs_workers_active").decrement(1.0);
        debug!(worker = self.id, processed, "Extraction worker stopped");
        processed
    }

    async fn handle(&self, task: &Task) -> OutcomeRecord {
        let start = Instant::now();
        let credential = self.rotator.acquire();

        let record = match AssertUnwindSafe(self.processor.process(task, &self.knowledge, &credential))
            .catch_unwind()
            .await
        {
            Ok(record) => record,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(worker = self.id, url = %task.url, panic = %message, "Task processing panicked");
                OutcomeRecord::failure(task, format!("Processing panicked: {}", message), None)
            }
        };

        let elapsed = start.elapsed();
        let outcome = if record.is_success() { "success" } else { "failure" };
        metrics::counter!("extractrs_tasks_total", "outcome" => outcome).increment(1);
        metrics::histogram!("extractrs_task_duration_seconds").record(elapsed.as_secs_f64());

        record.handled_with(credential.label(), elapsed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
