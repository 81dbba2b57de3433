// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Task;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// 队列错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// 队列已封闭，不再接受新任务
    #[error("Queue is sealed, task {0} rejected")]
    Sealed(String),
}

/// 任务队列特质
///
/// 出队是非阻塞的：队列为空时立即返回 `None`。
/// 队列封闭且为空即为排空（drained），之后任何出队都不会再成功。
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 入队任务
    async fn enqueue(&self, task: Task) -> Result<(), QueueError>;

    /// 尝试出队任务
    ///
    /// # 返回值
    ///
    /// * `Some(Task)` - 出队的任务，每个任务只会被交付一次
    /// * `None` - 当前没有可出队的任务
    async fn try_dequeue(&self) -> Option<Task>;

    /// 封闭队列，之后的入队将被拒绝
    fn seal(&self);

    /// 队列是否已排空
    fn is_drained(&self) -> bool;

    /// 当前排队的任务数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    sealed: bool,
}

/// 内存任务队列实现
#[derive(Debug, Default)]
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一组任务创建已封闭的队列
    pub fn sealed_with(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: tasks.into_iter().collect(),
                sealed: true,
            }),
        }
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.sealed {
            return Err(QueueError::Sealed(task.url));
        }
        state.tasks.push_back(task);
        Ok(())
    }

    async fn try_dequeue(&self) -> Option<Task> {
        self.state.lock().tasks.pop_front()
    }

    fn seal(&self) {
        self.state.lock().sealed = true;
    }

    fn is_drained(&self) -> bool {
        let state = self.state.lock();
        state.sealed && state.tasks.is_empty()
    }

    fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

#[async_trait]
impl<T: TaskQueue + ?Sized> TaskQueue for Arc<T> {
    async fn enqueue(&self, task: Task) -> Result<(), QueueError> {
        (**self).enqueue(task).await
    }

    async fn try_dequeue(&self) -> Option<Task> {
        (**self).try_dequeue().await
    }

    fn seal(&self) {
        (**self).seal()
    }

    fn is_drained(&self) -> bool {
        (**self).is_drained()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
