// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// - 结果聚合器（aggregator）：并发安全、只追加的结果集合
/// - 提取工作器（extraction_worker）：单个工作器的出队处理循环
/// - 工作器池（pool）：有界并发的启动与汇合
pub mod aggregator;
pub mod extraction_worker;
pub mod pool;
