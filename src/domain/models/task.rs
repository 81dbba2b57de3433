// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// 任务实体
///
/// 表示一个待处理的工作单元：抓取一个URL并从中提取监管信息。
/// 重复的URL是允许的，每个任务都会被独立处理。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 目标URL
    pub url: String,
    /// 提交顺序，用于在完成顺序之外对结果进行对账
    pub sequence: usize,
    /// 入队时间
    pub enqueued_at: DateTime<Utc>,
}

/// 任务错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    /// URL为空
    #[error("Task url must not be empty (position {0})")]
    EmptyUrl(usize),
}

impl Task {
    /// 创建新任务
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL，去除首尾空白后不能为空
    /// * `sequence` - 任务在提交列表中的位置
    ///
    /// # 返回值
    ///
    /// * `Ok(Task)` - 新任务
    /// * `Err(TaskError)` - URL为空
    pub fn new(url: impl Into<String>, sequence: usize) -> Result<Self, TaskError> {
        let url = url.into();
        let url = url.trim();
        if url.is_empty() {
            return Err(TaskError::EmptyUrl(sequence));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            sequence,
            enqueued_at: Utc::now(),
        })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} {}", self.sequence, self.url)
    }
}
