// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::credential::Credential;
use crate::domain::services::llm_stream::GenerateContentStream;
use crate::utils::text::truncate_at_char_boundary;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// 安全设置覆盖的危害类别
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// 生成式AI调用错误
#[derive(Error, Debug)]
pub enum LlmError {
    /// 请求发送失败
    #[error("Request to generative API failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 服务端返回错误
    #[error("Generative API returned error {status}: {message}")]
    Api { status: u16, message: String },
    /// 流读取或解析失败
    #[error("Stream error: {0}")]
    Stream(String),
    /// 提示或输出被安全策略拦截
    #[error("Blocked by provider: {0}")]
    Blocked(String),
    /// 响应为空
    #[error("Generative API returned an empty response")]
    EmptyResponse,
}

/// 生成式AI客户端特质
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// 发送一次生成请求并返回完整的文本输出（已去除首尾空白）
    async fn generate(&self, prompt: &str, credential: &Credential) -> Result<String, LlmError>;
}

/// 生成配置
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// API基础URL
    pub api_base_url: String,
    /// 模型名称
    pub model: String,
    /// 安全阈值，作用于全部危害类别
    pub safety_threshold: String,
    /// 思考预算，0 表示直接作答
    pub thinking_budget: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            safety_threshold: "BLOCK_LOW_AND_ABOVE".to_string(),
            thinking_budget: 0,
        }
    }
}

/// Gemini 流式客户端
///
/// # 功能
///
/// 通过 `streamGenerateContent`（SSE）发送单轮用户提示，拼接全部分块文本。
/// 每次调用使用传入的凭证，客户端本身不持有密钥。
pub struct GeminiClient {
    http: reqwest::Client,
    config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// 构造请求体
    pub fn request_body(&self, prompt: &str) -> Value {
        let safety_settings: Vec<Value> = HARM_CATEGORIES
            .iter()
            .map(|category| {
                json!({
                    "category": category,
                    "threshold": self.config.safety_threshold,
                })
            })
            .collect();

        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": {
                "thinkingConfig": { "thinkingBudget": self.config.thinking_budget }
            },
            "safetySettings": safety_settings,
        })
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str, credential: &Credential) -> Result<String, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, credential = credential.label(), "Generative API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: truncate_at_char_boundary(error_text.trim(), 500).to_string(),
            });
        }

        let mut stream = GenerateContentStream::new(response.bytes_stream());
        let mut output = String::new();
        let mut finish_reason = None;
        let mut chunks = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            chunks += 1;
            if let Some(reason) = chunk.block_reason {
                return Err(LlmError::Blocked(reason));
            }
            output.push_str(&chunk.text);
            if chunk.finish_reason.is_some() {
                finish_reason = chunk.finish_reason;
            }
        }

        debug!(chunks, chars = output.len(), finish_reason = ?finish_reason, "Generation stream finished");

        let output = output.trim();
        if output.is_empty() {
            let blocked = matches!(
                finish_reason.as_deref(),
                Some("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST")
            );
            if blocked {
                return Err(LlmError::Blocked(finish_reason.unwrap_or_default()));
            }
            return Err(LlmError::EmptyResponse);
        }

        Ok(output.to_string())
    }
}
