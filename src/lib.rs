// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 批次用例以及输入、导出的外围逻辑
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体和服务
pub mod domain;

/// 引擎模块
///
/// 实现页面抓取引擎：HTTP 与无头浏览器
pub mod engines;

/// 基础设施模块
///
/// 指标导出
pub mod infrastructure;

/// 队列模块
///
/// 工作器之间共享的任务队列
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 有界并发的工作器池
pub mod workers;
