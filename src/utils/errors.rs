// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 配置前置条件错误
///
/// 这类错误对整个批次是致命的，必须在任何工作器启动之前报告给调用方
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("凭证池为空：至少需要配置一个API密钥")]
    EmptyCredentialPool,

    #[error("并发数必须为正整数，当前为 {0}")]
    InvalidConcurrency(usize),

    #[error("无效配置: {0}")]
    Invalid(String),
}
