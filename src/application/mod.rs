// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 负责把外部输入（URL列表、知识库）交给领域层，并把批次结果导出
pub mod export;
pub mod input;
pub mod use_cases;
