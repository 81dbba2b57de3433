// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 引擎模块
///
/// 页面抓取引擎：纯HTTP抓取与无头浏览器渲染，以及就绪等待和URL校验
pub mod browser_engine;
pub mod readiness;
pub mod reqwest_engine;
pub mod traits;
pub mod validators;
