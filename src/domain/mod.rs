// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：任务、凭证、结果记录与批次
/// - 服务（services）：凭证轮换、AI调用、提取策略与任务处理
///
/// 领域层不依赖具体的抓取引擎或队列实现，只依赖它们的特质。
pub mod models;
pub mod services;
