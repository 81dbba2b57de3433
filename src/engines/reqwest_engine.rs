// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engines::traits::{EngineError, FetchRequest, FetchedPage, PageFetcher};
use crate::engines::validators;
use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; extractrs/0.1; +https://github.com/Kirky-X)";

/// HTTP抓取引擎
///
/// 基于reqwest实现的基本HTTP抓取引擎，每个任务发起一次GET请求
pub struct ReqwestEngine {
    client: reqwest::Client,
    ssrf_protection: bool,
}

impl ReqwestEngine {
    /// 创建新的HTTP抓取引擎
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求使用的 User-Agent
    /// * `ssrf_protection` - 是否拒绝私有网络地址
    ///
    /// # 返回值
    ///
    /// * `Ok(ReqwestEngine)` - 引擎实例
    /// * `Err(EngineError)` - HTTP客户端构建失败
    pub fn new(user_agent: &str, ssrf_protection: bool) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            ssrf_protection,
        })
    }
}

#[async_trait]
impl PageFetcher for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// 非2xx状态码视为抓取失败
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, EngineError> {
        if self.ssrf_protection {
            validators::validate_url(&request.url).await?;
        } else {
            validators::parse_target(&request.url)?;
        }

        let start = Instant::now();
        let response = self
            .client
            .get(&request.url)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(request.timeout)
                } else {
                    EngineError::RequestFailed(e)
                }
            })?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(EngineError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("text/html")
            .to_string();

        let content = response.text().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout(request.timeout)
            } else {
                EngineError::RequestFailed(e)
            }
        })?;

        let response_time_ms = start.elapsed().as_millis() as u64;
        debug!(url = %final_url, status = status.as_u16(), bytes = content.len(), response_time_ms, "Page fetched");

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content,
            content_type,
            response_time_ms,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
