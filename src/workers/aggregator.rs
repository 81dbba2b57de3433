// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::outcome::OutcomeRecord;
use parking_lot::Mutex;

/// 结果聚合器
///
/// 只追加的结果集合，记录按完成顺序排列
#[derive(Debug, Default)]
pub struct ResultAggregator {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn append(&self, record: OutcomeRecord) {
        self.records.lock().push(record);
    }

    /// 当前结果的快照
    pub fn snapshot(&self) -> Vec<OutcomeRecord> {
        self.records.lock().clone()
    }

    /// 已追加的记录数
    pub fn recorded(&self) -> usize {
        self.records.lock().len()
    }
}
