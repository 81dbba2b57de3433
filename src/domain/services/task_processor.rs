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

use crate::domain::models::credential::Credential;
use crate::domain::models::outcome::OutcomeRecord;
use crate::domain::models::task::Task;
use crate::domain::services::llm_service::{GenerativeClient, LlmError};
use crate::domain::services::strategy::{ExtractionStrategy, PromptContext, StrategyError};
use crate::engines::traits::{EngineError, FetchRequest, PageFetcher};
use crate::utils::text::truncate_at_char_boundary;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// 处理阶段错误
///
/// 每个变体标明失败发生在哪个阶段，描述文本直接写入失败记录
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] EngineError),

    #[error("AI call failed: {0}")]
    Generation(#[from] LlmError),

    #[error("AI call timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("Extraction failed: {0}")]
    Strategy(#[from] StrategyError),
}

/// 处理器配置
#[derive(Debug, Clone, Copy)]
pub struct ProcessorOptions {
    /// 抓取超时
    pub fetch_timeout: Duration,
    /// 单次AI调用超时，None 表示不限制
    pub call_timeout: Option<Duration>,
    /// 提示中页面内容的最大字节数
    pub max_page_chars: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            call_timeout: Some(Duration::from_secs(120)),
            max_page_chars: 500_000,
        }
    }
}

/// 任务处理器
///
/// 对单个任务执行 抓取 → 构造提示 → AI调用 → 解释产物。
/// 任何阶段的错误都会被转换为失败记录，不会传播给调用方。
pub struct TaskProcessor {
    fetcher: Arc<dyn PageFetcher>,
    llm: Arc<dyn GenerativeClient>,
    strategy: Arc<dyn ExtractionStrategy>,
    options: ProcessorOptions,
}

impl TaskProcessor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        llm: Arc<dyn GenerativeClient>,
        strategy: Arc<dyn ExtractionStrategy>,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            fetcher,
            llm,
            strategy,
            options,
        }
    }

    /// 处理任务
    ///
    /// # 参数
    ///
    /// * `task` - 待处理的任务
    /// * `knowledge` - 知识库文本，原样放入提示
    /// * `credential` - 本次AI调用使用的凭证
    ///
    /// # 返回值
    ///
    /// 成功或失败的结果记录。失败记录在产物已生成时携带原始产物。
    #[instrument(
        skip(self, task, knowledge, credential),
        fields(task_id = %task.url, sequence = task.sequence, credential = credential.label())
    )]
    pub async fn process(&self, task: &Task, knowledge: &str, credential: &Credential) -> OutcomeRecord {
        let mut artifact = None;
        match self.run(task, knowledge, credential, &mut artifact).await {
            Ok(data) => {
                debug!("Task extracted");
                let diagnostic = if self.strategy.records_artifact() {
                    artifact
                } else {
                    None
                };
                OutcomeRecord::success(task, data, diagnostic)
            }
            Err(e) => {
                if matches!(e, ProcessingError::Fetch(_)) {
                    metrics::counter!("extractrs_fetch_failures_total", "engine" => self.fetcher.name())
                        .increment(1);
                }
                warn!(error = %e, "Task failed");
                OutcomeRecord::failure(task, e.to_string(), artifact)
            }
        }
    }

    async fn run(
        &self,
        task: &Task,
        knowledge: &str,
        credential: &Credential,
        artifact: &mut Option<String>,
    ) -> Result<Value, ProcessingError> {
        let request = FetchRequest::new(task.url.clone(), self.options.fetch_timeout);
        let page = self.fetcher.fetch(&request).await?;
        debug!(
            engine = self.fetcher.name(),
            status = page.status_code,
            bytes = page.content.len(),
            response_time_ms = page.response_time_ms,
            "Page fetched"
        );

        let prompt = self.strategy.build_prompt(PromptContext {
            knowledge,
            url: &page.final_url,
            page: truncate_at_char_boundary(&page.content, self.options.max_page_chars),
        });

        let generation = self.llm.generate(&prompt, credential);
        let output = match self.options.call_timeout {
            Some(limit) => tokio::time::timeout(limit, generation)
                .await
                .map_err(|_| ProcessingError::GenerationTimeout(limit))??,
            None => generation.await?,
        };

        // The artifact is kept verbatim for diagnostics
        let output = artifact.insert(output).as_str();
        Ok(self.strategy.interpret(output, &page.content)?)
    }
}
