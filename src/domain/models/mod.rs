// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 任务（task）：一个待抓取并提取数据的URL
/// - 凭证（credential）：调用生成式AI服务的API密钥
/// - 结果记录（outcome）：单个任务的成功数据或失败描述
/// - 批次（batch）：一次提交的全部任务及其生命周期
pub mod batch;
pub mod credential;
pub mod outcome;
pub mod task;
