// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use extractrs::application::use_cases::run_batch::ExtractionBatch;
use extractrs::domain::models::credential::Credential;
use extractrs::domain::services::extraction_service::ExtractionLimits;
use extractrs::domain::services::llm_service::{GenerativeClient, LlmError};
use extractrs::domain::services::strategy::{strategy_for, ExtractionMode};
use extractrs::domain::services::task_processor::{ProcessorOptions, TaskProcessor};
use extractrs::engines::traits::{EngineError, FetchRequest, FetchedPage, PageFetcher};
use parking_lot::Mutex;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const NOTICE_PAGE: &str = r#"<html><body>
<h1 class="title">Consent Order: Example Credit Union</h1>
<span class="date">2024-02-14</span>
</body></html>"#;

pub const ROUTINE: &str = r#"{"scrape_page": {"enforcement_title": {"selector": "h1.title"}, "date": {"selector": "span.date"}}}"#;

/// 按URL返回固定页面的抓取器，未知URL返回404
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    panic_on: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn panicking_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic_on.as_deref() == Some(request.url.as_str()) {
            panic!("simulated engine crash");
        }

        match self.pages.get(&request.url) {
            Some(html) => Ok(FetchedPage {
                final_url: request.url.clone(),
                status_code: 200,
                content: html.clone(),
                content_type: "text/html".to_string(),
                response_time_ms: 1,
            }),
            None => Err(EngineError::HttpStatus {
                status: 404,
                url: request.url.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// 返回固定回复并记录每次调用的凭证与提示
pub struct RecordingClient {
    reply: String,
    calls: AtomicUsize,
    credentials: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            credentials: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl GenerativeClient for RecordingClient {
    async fn generate(&self, prompt: &str, credential: &Credential) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().push(credential.label().to_string());
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub fn secrets(count: usize) -> Vec<SecretString> {
    (0..count)
        .map(|i| SecretString::from(format!("test-secret-{}", i)))
        .collect()
}

pub fn processor(
    fetcher: Arc<MockFetcher>,
    client: Arc<RecordingClient>,
    mode: ExtractionMode,
) -> Arc<TaskProcessor> {
    Arc::new(TaskProcessor::new(
        fetcher,
        client,
        strategy_for(mode, ExtractionLimits::default()),
        ProcessorOptions::default(),
    ))
}

pub fn batch(
    fetcher: Arc<MockFetcher>,
    client: Arc<RecordingClient>,
    mode: ExtractionMode,
    credentials: usize,
    concurrency: usize,
) -> ExtractionBatch {
    ExtractionBatch::new(processor(fetcher, client, mode), secrets(credentials), concurrency)
        .expect("valid batch configuration")
}
