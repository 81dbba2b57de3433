// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 生成式AI流式响应（SSE）解析。
//!
//! 把 `reqwest` 的字节流转换为逐块的文本增量。字节按行缓冲后再解码，
//! 因此跨网络分片的多字节字符不会被截断。

use crate::domain::services::llm_service::LlmError;
use crate::utils::text::truncate_at_char_boundary;
use bytes::Bytes;
use futures::stream::Stream;
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};

/// 单个流式分块
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    /// 本分块的文本增量
    pub text: String,
    /// 结束原因（最后一个分块通常携带）
    pub finish_reason: Option<String>,
    /// 提示被安全策略拦截的原因
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkRaw {
    #[serde(default)]
    candidates: Vec<CandidateRaw>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedbackRaw>,
    #[serde(default)]
    error: Option<ErrorRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateRaw {
    #[serde(default)]
    content: Option<ContentRaw>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentRaw {
    #[serde(default)]
    parts: Vec<PartRaw>,
}

#[derive(Debug, Deserialize)]
struct PartRaw {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedbackRaw {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorRaw {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

/// 将原始SSE字节流转换为 `StreamChunk` 的流适配器
pub struct GenerateContentStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl GenerateContentStream {
    pub fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            finished: false,
        }
    }
}

impl Stream for GenerateContentStream {
    type Item = Result<StreamChunk, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = next_event(&mut this.buffer, this.finished) {
                return Poll::Ready(Some(chunk));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    this.buffer.clear();
                    return Poll::Ready(Some(Err(LlmError::Stream(e.to_string()))));
                }
                // Flush whatever is left on the next loop iteration
                Poll::Ready(None) => this.finished = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// 从缓冲区取出下一个 `data:` 事件
///
/// `flush` 为真时，缓冲区中没有换行结尾的剩余内容也会被当作一行处理。
fn next_event(buffer: &mut Vec<u8>, flush: bool) -> Option<Result<StreamChunk, LlmError>> {
    loop {
        let line: Vec<u8> = match buffer.iter().position(|b| *b == b'\n') {
            Some(pos) => buffer.drain(..=pos).collect(),
            None if flush && !buffer.is_empty() => std::mem::take(buffer),
            None => return None,
        };

        let line = match std::str::from_utf8(&line) {
            Ok(line) => line.trim(),
            Err(e) => return Some(Err(LlmError::Stream(format!("Invalid UTF-8 in stream: {}", e)))),
        };

        // Blank lines separate events; event:/id:/retry: lines carry nothing we use
        if let Some(data) = line.strip_prefix("data:") {
            return Some(parse_chunk(data.trim()));
        }
    }
}

fn parse_chunk(data: &str) -> Result<StreamChunk, LlmError> {
    let raw: ChunkRaw = serde_json::from_str(data).map_err(|e| {
        LlmError::Stream(format!(
            "Failed to parse stream chunk: {} (data: {})",
            e,
            truncate_at_char_boundary(data, 200)
        ))
    })?;

    if let Some(error) = raw.error {
        return Err(LlmError::Api {
            status: error.code.unwrap_or(0),
            message: error.message,
        });
    }

    let mut chunk = StreamChunk {
        block_reason: raw.prompt_feedback.and_then(|f| f.block_reason),
        ..StreamChunk::default()
    };

    if let Some(candidate) = raw.candidates.into_iter().next() {
        chunk.finish_reason = candidate.finish_reason;
        if let Some(content) = candidate.content {
            chunk.text = content.parts.into_iter().filter_map(|p| p.text).collect();
        }
    }

    Ok(chunk)
}
