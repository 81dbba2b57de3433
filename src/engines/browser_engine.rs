// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::readiness::{wait_until, ReadinessPolicy};
use crate::engines::traits::{EngineError, FetchRequest, FetchedPage, PageFetcher};
use crate::engines::validators;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

// Global browser instance to avoid re-launching Chrome on every task.
static BROWSER_INSTANCE: OnceCell<Browser> = OnceCell::const_new();

fn browser_error(e: impl std::fmt::Display) -> EngineError {
    EngineError::Browser(e.to_string())
}

/// 获取或初始化共享的浏览器实例
///
/// 配置了远程调试地址时连接已有的 Chrome，否则在本地启动一个无头实例
pub async fn get_browser(remote_debugging_url: Option<&str>) -> Result<&'static Browser, EngineError> {
    BROWSER_INSTANCE
        .get_or_try_init(|| async {
            let (browser, mut handler) = if let Some(url) = remote_debugging_url {
                tracing::info!("Connecting to remote Chrome instance at: {}", url);
                Browser::connect(url)
                    .await
                    .map_err(|e| EngineError::Browser(format!("Failed to connect to remote Chrome: {}", e)))?
            } else {
                let config = BrowserConfig::builder()
                    .no_sandbox()
                    .request_timeout(Duration::from_secs(30))
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage")
                    .build()
                    .map_err(browser_error)?;

                Browser::launch(config).await.map_err(browser_error)?
            };

            // Drive browser events until the connection closes
            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        })
        .await
}

/// 浏览器页面会话
///
/// 抓取流程只通过该特质操作页面，关闭逻辑因此可以脱离真实浏览器验证。
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), EngineError>;
    async fn ready_state(&self) -> Result<String, EngineError>;
    async fn has_element(&self, selector: &str) -> bool;
    async fn content(&self) -> Result<String, EngineError>;
    async fn current_url(&self) -> Result<Option<String>, EngineError>;
    async fn close(&self) -> Result<(), EngineError>;
}

#[async_trait]
impl PageSession for Page {
    async fn navigate(&self, url: &str) -> Result<(), EngineError> {
        self.goto(url).await.map_err(browser_error)?;
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, EngineError> {
        self.evaluate("document.readyState")
            .await
            .map_err(browser_error)?
            .into_value()
            .map_err(browser_error)
    }

    async fn has_element(&self, selector: &str) -> bool {
        self.find_element(selector).await.is_ok()
    }

    async fn content(&self) -> Result<String, EngineError> {
        Page::content(self).await.map_err(browser_error)
    }

    async fn current_url(&self) -> Result<Option<String>, EngineError> {
        self.url().await.map_err(browser_error)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.clone().close().await.map_err(browser_error)
    }
}

/// 浏览器抓取引擎
///
/// 基于chromiumoxide，为每个任务打开一个新页面，导航后按就绪条件轮询，
/// 读取渲染后的源码，并在任何退出路径上关闭页面。
pub struct BrowserEngine {
    remote_debugging_url: Option<String>,
    readiness: ReadinessPolicy,
    ready_selector: Option<String>,
    ssrf_protection: bool,
}

impl BrowserEngine {
    pub fn new(
        remote_debugging_url: Option<String>,
        readiness: ReadinessPolicy,
        ready_selector: Option<String>,
        ssrf_protection: bool,
    ) -> Self {
        Self {
            remote_debugging_url,
            readiness,
            ready_selector,
            ssrf_protection,
        }
    }

    /// 在剩余时间内加载页面，随后无论结果如何都关闭页面
    ///
    /// # 参数
    ///
    /// * `page` - 已打开的页面
    /// * `url` - 目标URL
    /// * `budget` - 剩余的抓取时间
    /// * `timeout` - 报告超时时使用的总抓取超时
    ///
    /// # 返回值
    ///
    /// (最终URL, 页面源码)
    async fn render<P: PageSession>(
        &self,
        page: &P,
        url: &str,
        budget: Duration,
        timeout: Duration,
    ) -> Result<(String, String), EngineError> {
        let loaded = match tokio::time::timeout(budget, self.load(page, url)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(timeout)),
        };

        if let Err(e) = page.close().await {
            warn!(url = %url, error = %e, "Failed to close browser page");
        }
        loaded
    }

    async fn load<P: PageSession>(&self, page: &P, url: &str) -> Result<(String, String), EngineError> {
        page.navigate(url).await?;
        wait_until(self.readiness, || self.is_ready(page)).await?;

        let content = page.content().await?;
        let final_url = page.current_url().await?.unwrap_or_else(|| url.to_string());
        Ok((final_url, content))
    }

    /// 就绪条件：文档加载完成，且（如配置）就绪选择器已出现
    async fn is_ready<P: PageSession>(&self, page: &P) -> Result<bool, EngineError> {
        if page.ready_state().await? != "complete" {
            return Ok(false);
        }

        match &self.ready_selector {
            Some(selector) => Ok(page.has_element(selector).await),
            None => Ok(true),
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserEngine {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, EngineError> {
        if self.ssrf_protection {
            validators::validate_url(&request.url).await?;
        } else {
            validators::parse_target(&request.url)?;
        }

        let start = Instant::now();
        let browser = tokio::time::timeout(
            request.timeout,
            get_browser(self.remote_debugging_url.as_deref()),
        )
        .await
        .map_err(|_| EngineError::Timeout(request.timeout))??;

        // Not cancelled by the fetch timeout: a created target must reach close.
        // The browser's request timeout bounds this call.
        let page = browser.new_page("about:blank").await.map_err(browser_error)?;

        let remaining = request.timeout.saturating_sub(start.elapsed());
        let (final_url, content) = self
            .render(&page, &request.url, remaining, request.timeout)
            .await?;
        let response_time_ms = start.elapsed().as_millis() as u64;
        debug!(url = %final_url, bytes = content.len(), response_time_ms, "Page rendered");

        Ok(FetchedPage {
            final_url,
            // chromiumoxide navigation does not expose the document response status
            status_code: 200,
            content,
            content_type: "text/html".to_string(),
            response_time_ms,
        })
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
