// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Task;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// 结果负载
///
/// 成功时携带提取出的数据，失败时携带可读的错误描述
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum OutcomePayload {
    /// 提取成功
    Success(Value),
    /// 处理失败
    Failure(String),
}

/// 结果记录
///
/// 每个出队的任务恰好产生一条记录，由处理它的工作器创建，
/// 创建之后不可修改。
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    task_id: String,
    sequence: usize,
    payload: OutcomePayload,
    diagnostic: Option<String>,
    credential: Option<String>,
    elapsed_ms: u64,
    completed_at: DateTime<Utc>,
}

impl OutcomeRecord {
    /// 创建成功记录
    ///
    /// # 参数
    ///
    /// * `task` - 已处理的任务
    /// * `data` - 提取出的数据
    /// * `diagnostic` - 生成的原始产物（合成模式下为提取程序）
    pub fn success(task: &Task, data: Value, diagnostic: Option<String>) -> Self {
        Self::build(task, OutcomePayload::Success(data), diagnostic)
    }

    /// 创建失败记录
    ///
    /// # 参数
    ///
    /// * `task` - 已处理的任务
    /// * `description` - 失败来源及原因
    /// * `diagnostic` - 已生成的原始产物（如有）
    pub fn failure(task: &Task, description: impl Into<String>, diagnostic: Option<String>) -> Self {
        Self::build(task, OutcomePayload::Failure(description.into()), diagnostic)
    }

    fn build(task: &Task, payload: OutcomePayload, diagnostic: Option<String>) -> Self {
        Self {
            task_id: task.url.clone(),
            sequence: task.sequence,
            payload,
            diagnostic,
            credential: None,
            elapsed_ms: 0,
            completed_at: Utc::now(),
        }
    }

    /// 附加处理上下文（使用的凭证标签与耗时），在记录交给聚合器之前调用
    pub fn handled_with(mut self, credential_label: &str, elapsed: Duration) -> Self {
        self.credential = Some(credential_label.to_string());
        self.elapsed_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn payload(&self) -> &OutcomePayload {
        &self.payload
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload, OutcomePayload::Success(_))
    }

    /// 错误描述，成功记录返回None
    pub fn error(&self) -> Option<&str> {
        match &self.payload {
            OutcomePayload::Failure(description) => Some(description),
            OutcomePayload::Success(_) => None,
        }
    }
}
