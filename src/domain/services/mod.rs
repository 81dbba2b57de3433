// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 凭证轮换器（credential_rotator）：在并发工作器之间公平地分发API密钥
/// - 提取服务（extraction_service）：按选择器规则从页面中提取数据
/// - LLM服务（llm_service / llm_stream）：流式调用生成式AI
/// - 提取策略（strategy）：决定提示内容以及如何解释AI的产物
/// - 任务处理器（task_processor）：抓取 → AI调用 → 提取，失败转为结果记录
pub mod credential_rotator;
pub mod extraction_service;
pub mod llm_service;
pub mod llm_stream;
pub mod strategy;
pub mod task_processor;
