// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// 提取规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionRule {
    /// CSS选择器
    pub selector: String,
    /// 要读取的属性，为空时读取文本
    #[serde(default)]
    pub attr: Option<String>,
    /// 是否收集全部匹配元素
    #[serde(default)]
    pub is_array: bool,
}

/// 提取资源限制
#[derive(Debug, Clone, Copy)]
pub struct ExtractionLimits {
    /// 单个程序允许的最大规则数
    pub max_rules: usize,
    /// 单条规则允许的最大匹配元素数
    pub max_matches_per_rule: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_rules: 64,
            max_matches_per_rule: 500,
        }
    }
}

/// 提取错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("routine declares {count} rules, limit is {limit}")]
    TooManyRules { count: usize, limit: usize },

    #[error("invalid selector for field '{field}': {selector}")]
    InvalidSelector { field: String, selector: String },

    #[error("selector for field '{field}' matched more than {limit} elements")]
    TooManyMatches { field: String, limit: usize },
}

/// 提取服务
///
/// 负责按选择器规则从 HTML 内容中提取结构化数据。规则只能读取传入的页面，
/// 无法访问文件系统、网络或进程环境。
pub struct ExtractionService;

impl ExtractionService {
    /// 提取数据
    ///
    /// # 参数
    ///
    /// * `html_content` - 页面源码
    /// * `rules` - 字段名到提取规则的映射
    /// * `limits` - 资源限制
    ///
    /// # 返回值
    ///
    /// * `Ok(Value)` - 以字段名为键的JSON对象，未匹配的字段为 null（数组字段为空数组）
    /// * `Err(ExtractionError)` - 选择器无效或超出资源限制
    pub fn extract(
        html_content: &str,
        rules: &BTreeMap<String, ExtractionRule>,
        limits: ExtractionLimits,
    ) -> Result<Value, ExtractionError> {
        if rules.len() > limits.max_rules {
            return Err(ExtractionError::TooManyRules {
                count: rules.len(),
                limit: limits.max_rules,
            });
        }

        // Compile every selector before touching the document
        let mut compiled = Vec::with_capacity(rules.len());
        for (field, rule) in rules {
            let selector =
                Selector::parse(&rule.selector).map_err(|_| ExtractionError::InvalidSelector {
                    field: field.clone(),
                    selector: rule.selector.clone(),
                })?;
            compiled.push((field, rule, selector));
        }

        let document = Html::parse_document(html_content);
        let mut result = Map::new();

        for (field, rule, selector) in compiled {
            if rule.is_array {
                let mut values = Vec::new();
                for (count, element) in document.select(&selector).enumerate() {
                    if count >= limits.max_matches_per_rule {
                        return Err(ExtractionError::TooManyMatches {
                            field: field.clone(),
                            limit: limits.max_matches_per_rule,
                        });
                    }
                    if let Some(v) = read_value(&element, rule.attr.as_deref()) {
                        if !v.is_empty() {
                            values.push(Value::String(v));
                        }
                    }
                }
                result.insert(field.clone(), Value::Array(values));
            } else {
                let value = document
                    .select(&selector)
                    .next()
                    .and_then(|element| read_value(&element, rule.attr.as_deref()))
                    .map(Value::String)
                    .unwrap_or(Value::Null);
                result.insert(field.clone(), value);
            }
        }

        Ok(Value::Object(result))
    }
}

fn read_value(element: &ElementRef<'_>, attr: Option<&str>) -> Option<String> {
    match attr {
        Some(attr) => element.value().attr(attr).map(|s| s.trim().to_string()),
        None => Some(
            element
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        ),
    }
}
