// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::outcome::OutcomeRecord;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// 批次状态枚举
///
/// 状态转换遵循以下流程：
/// Created → Running → Drained → Joined → Exported
///
/// Joined 是终止状态，Exported 表示对终止快照的一次（可重复的）读取。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// 任务已入队
    #[default]
    Created,
    /// 工作器运行中，结果持续增长
    Running,
    /// 队列已排空
    Drained,
    /// 所有工作器均已结束
    Joined,
    /// 快照已导出
    Exported,
}

impl BatchStatus {
    /// 判断是否可以转换到目标状态
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Created, BatchStatus::Running)
                | (BatchStatus::Running, BatchStatus::Drained)
                | (BatchStatus::Drained, BatchStatus::Joined)
                | (BatchStatus::Joined, BatchStatus::Exported)
                | (BatchStatus::Exported, BatchStatus::Exported)
        )
    }

    /// 是否已到达终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Joined | BatchStatus::Exported)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatchStatus::Created => write!(f, "created"),
            BatchStatus::Running => write!(f, "running"),
            BatchStatus::Drained => write!(f, "drained"),
            BatchStatus::Joined => write!(f, "joined"),
            BatchStatus::Exported => write!(f, "exported"),
        }
    }
}

/// 批次错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    /// 非法状态转换
    #[error("Invalid batch transition: {from} -> {to}")]
    InvalidTransition { from: BatchStatus, to: BatchStatus },

    /// 工作器异常终止，部分已出队任务没有结果
    #[error("Batch incomplete: {recorded} of {expected} tasks recorded, {aborted_workers} worker(s) aborted")]
    Incomplete {
        expected: usize,
        recorded: usize,
        aborted_workers: usize,
    },
}

/// 批次状态跟踪器
///
/// 在工作器之间共享，第一个观察到空队列的工作器将批次标记为 Drained。
#[derive(Debug)]
pub struct BatchTracker {
    id: Uuid,
    status: Mutex<BatchStatus>,
}

impl Default for BatchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchTracker {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: Mutex::new(BatchStatus::Created),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> BatchStatus {
        *self.status.lock()
    }

    /// 推进批次状态
    ///
    /// # 参数
    ///
    /// * `next` - 目标状态
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 转换成功
    /// * `Err(BatchError)` - 当前状态不允许转换到目标状态
    pub fn advance(&self, next: BatchStatus) -> Result<(), BatchError> {
        let mut status = self.status.lock();
        if !status.can_transition_to(next) {
            return Err(BatchError::InvalidTransition {
                from: *status,
                to: next,
            });
        }
        let previous = *status;
        *status = next;
        drop(status);

        if previous != next {
            info!(batch_id = %self.id, from = %previous, to = %next, "Batch state changed");
        }
        Ok(())
    }

    /// 标记队列已排空，可被多个工作器重复调用
    pub fn mark_drained(&self) {
        let mut status = self.status.lock();
        if *status == BatchStatus::Running {
            *status = BatchStatus::Drained;
            drop(status);
            info!(batch_id = %self.id, "Batch queue drained");
        }
    }
}

/// 批次统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// 批次报告
///
/// 工作器全部结束后生成。`records` 按完成顺序排列，
/// 与提交顺序不一定一致。
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// 批次ID
    pub batch_id: Uuid,
    /// 按完成顺序排列的结果记录
    pub records: Vec<OutcomeRecord>,
    /// 启动的工作器数量
    pub workers_spawned: usize,
    /// 报告生成时的批次状态
    pub status: BatchStatus,
}

impl BatchReport {
    /// 按提交顺序排列的结果视图，便于与输入列表对账
    pub fn in_submission_order(&self) -> Vec<&OutcomeRecord> {
        let mut ordered: Vec<&OutcomeRecord> = self.records.iter().collect();
        ordered.sort_by_key(|record| record.sequence());
        ordered
    }

    /// 检查报告是否可以导出（已汇合或已导出过）
    pub fn ensure_exportable(&self) -> Result<(), BatchError> {
        if !self.status.can_transition_to(BatchStatus::Exported) {
            return Err(BatchError::InvalidTransition {
                from: self.status,
                to: BatchStatus::Exported,
            });
        }
        Ok(())
    }

    /// 标记报告已导出，只允许在汇合之后进行，可重复调用
    pub fn mark_exported(&mut self) -> Result<(), BatchError> {
        self.ensure_exportable()?;
        self.status = BatchStatus::Exported;
        Ok(())
    }

    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.records.iter().filter(|r| r.is_success()).count();
        BatchSummary {
            total: self.records.len(),
            succeeded,
            failed: self.records.len() - succeeded,
        }
    }
}
