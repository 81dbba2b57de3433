// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::extraction_service::{
    ExtractionError, ExtractionLimits, ExtractionRule, ExtractionService,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// 合成程序必须提供的入口名
pub const ENTRY_POINT: &str = "scrape_page";

/// 提取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMode {
    /// 先让AI合成提取程序，再在沙箱中执行
    #[default]
    SynthesizeThenExecute,
    /// 让AI直接从页面中提取数据
    DirectExtract,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExtractionMode::SynthesizeThenExecute => write!(f, "synthesize-then-execute"),
            ExtractionMode::DirectExtract => write!(f, "direct-extract"),
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synthesize-then-execute" | "synthesize" => Ok(ExtractionMode::SynthesizeThenExecute),
            "direct-extract" | "direct" => Ok(ExtractionMode::DirectExtract),
            other => Err(format!("unknown extraction mode: {}", other)),
        }
    }
}

/// 策略错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StrategyError {
    /// 生成的程序缺少入口
    #[error("AI did not generate a '{ENTRY_POINT}' entry point")]
    MissingEntryPoint,
    /// 生成的程序无法解析
    #[error("generated routine is not valid: {0}")]
    InvalidRoutine(String),
    /// 程序执行失败
    #[error("routine execution failed: {0}")]
    Execution(#[from] ExtractionError),
    /// 直接提取的响应不可用
    #[error("malformed AI response: {0}")]
    Malformed(String),
}

/// 构造提示所需的上下文
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// 知识库原文，原样放入提示
    pub knowledge: &'a str,
    /// 页面URL
    pub url: &'a str,
    /// 页面源码（可能已截断）
    pub page: &'a str,
}

/// 提取策略特质
///
/// 决定发送给AI的提示，以及如何把AI返回的产物变成提取结果
pub trait ExtractionStrategy: Send + Sync {
    /// 构造提示
    fn build_prompt(&self, ctx: PromptContext<'_>) -> String;

    /// 解释AI返回的产物
    ///
    /// # 参数
    ///
    /// * `artifact` - AI返回的原始文本
    /// * `page` - 完整的页面源码
    fn interpret(&self, artifact: &str, page: &str) -> Result<Value, StrategyError>;

    /// 成功时是否在结果中保留原始产物
    fn records_artifact(&self) -> bool;

    fn mode(&self) -> ExtractionMode;
}

/// 根据模式创建策略
pub fn strategy_for(mode: ExtractionMode, limits: ExtractionLimits) -> Arc<dyn ExtractionStrategy> {
    match mode {
        ExtractionMode::SynthesizeThenExecute => Arc::new(SynthesizedRoutineStrategy::new(limits)),
        ExtractionMode::DirectExtract => Arc::new(DirectExtractStrategy),
    }
}

/// 去掉Markdown代码块包裹
///
/// 信息串（如 `json`）仅在其后紧跟空白或文本结束时被去除，
/// 单行代码块 "```json {...}```" 同样适用。
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    let info_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(rest.len());
    let has_info = rest.starts_with(|c: char| c.is_ascii_alphabetic())
        && rest[info_len..].chars().next().map_or(true, char::is_whitespace);

    if has_info {
        rest[info_len..].trim()
    } else {
        rest.trim()
    }
}

/// 直接提取策略
pub struct DirectExtractStrategy;

impl ExtractionStrategy for DirectExtractStrategy {
    fn build_prompt(&self, ctx: PromptContext<'_>) -> String {
        format!(
            "Using the following knowledge base, extract the relevant regulatory enforcement or actions data from the webpage content below.\n\
             Return a JSON object with the extracted fields. If the page holds several actions, return a JSON array of objects. \
             If nothing relevant is present, return {{}}.\n\n\
             Knowledge Base:\n{}\n\n\
             Page URL: {}\n\n\
             Page HTML Content:\n{}\n\n\
             Provide only the JSON without explanations.\n\
             Example expected output: {{\"enforcement_title\": \"...\", \"date\": \"...\", \"details\": \"...\"}}\n",
            ctx.knowledge, ctx.url, ctx.page
        )
    }

    fn interpret(&self, artifact: &str, _page: &str) -> Result<Value, StrategyError> {
        let body = strip_code_fences(artifact);
        if body.is_empty() {
            return Err(StrategyError::Malformed("response contained no content".to_string()));
        }
        // Unstructured answers are kept as text
        Ok(serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_string())))
    }

    fn records_artifact(&self) -> bool {
        false
    }

    fn mode(&self) -> ExtractionMode {
        ExtractionMode::DirectExtract
    }
}

/// 合成程序策略
///
/// AI 返回一个声明式的选择器程序：`{"scrape_page": {"字段": {"selector": ...}}}`。
/// 程序由 [`ExtractionService`] 解释执行，只能读取页面内容，并受规则数与匹配数限制。
pub struct SynthesizedRoutineStrategy {
    limits: ExtractionLimits,
}

impl SynthesizedRoutineStrategy {
    pub fn new(limits: ExtractionLimits) -> Self {
        Self { limits }
    }

    /// 解析合成程序，返回入口处的规则集
    pub fn parse_routine(artifact: &str) -> Result<BTreeMap<String, ExtractionRule>, StrategyError> {
        let body = strip_code_fences(artifact);
        let program: Value =
            serde_json::from_str(body).map_err(|e| StrategyError::InvalidRoutine(e.to_string()))?;

        let Value::Object(mut program) = program else {
            return Err(StrategyError::InvalidRoutine(
                "routine must be a JSON object".to_string(),
            ));
        };

        let entry = program
            .remove(ENTRY_POINT)
            .ok_or(StrategyError::MissingEntryPoint)?;

        serde_json::from_value(entry).map_err(|e| StrategyError::InvalidRoutine(e.to_string()))
    }
}

impl ExtractionStrategy for SynthesizedRoutineStrategy {
    fn build_prompt(&self, ctx: PromptContext<'_>) -> String {
        format!(
            "Based on the following knowledge base and webpage HTML content, generate an extraction routine called '{entry}' \
             that extracts relevant regulatory enforcement or actions data in structured form.\n\
             The routine is a JSON object whose '{entry}' entry maps each output field to a CSS selector rule:\n\
             {{\"{entry}\": {{\"<field>\": {{\"selector\": \"<css selector>\", \"attr\": \"<attribute name or null for text>\", \"is_array\": false}}}}}}\n\
             Use at most {max_rules} fields.\n\n\
             Knowledge Base:\n{knowledge}\n\n\
             Page URL: {url}\n\n\
             Page HTML Content:\n{page}\n\n\
             Provide only the JSON routine without explanations.\n\
             Example expected fields: enforcement_title, date, details\n",
            entry = ENTRY_POINT,
            max_rules = self.limits.max_rules,
            knowledge = ctx.knowledge,
            url = ctx.url,
            page = ctx.page,
        )
    }

    fn interpret(&self, artifact: &str, page: &str) -> Result<Value, StrategyError> {
        let rules = Self::parse_routine(artifact)?;
        Ok(ExtractionService::extract(page, &rules, self.limits)?)
    }

    fn records_artifact(&self) -> bool {
        true
    }

    fn mode(&self) -> ExtractionMode {
        ExtractionMode::SynthesizeThenExecute
    }
}
