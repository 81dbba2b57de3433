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

use anyhow::Context;
use clap::Parser;
use extractrs::application::export;
use extractrs::application::input;
use extractrs::application::use_cases::run_batch::ExtractionBatch;
use extractrs::config::settings::{FetchEngineKind, FetchSettings, Settings};
use extractrs::domain::services::llm_service::GeminiClient;
use extractrs::domain::services::strategy::{strategy_for, ExtractionMode};
use extractrs::domain::services::task_processor::TaskProcessor;
use extractrs::engines::browser_engine::BrowserEngine;
use extractrs::engines::reqwest_engine::ReqwestEngine;
use extractrs::engines::traits::PageFetcher;
use extractrs::infrastructure::metrics;
use extractrs::utils::telemetry;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Fetch regulatory pages and extract structured data with a generative model.
#[derive(Parser, Debug)]
#[command(name = "extractrs")]
#[command(version)]
#[command(
    long_about = "extractrs fetches every URL from a CSV file, asks a generative model to extract regulatory actions using a knowledge base, and writes one result row per URL.\n\nExample usage:\n  EXTRACTRS__EXTRACTION__CREDENTIALS=key1,key2 extractrs --urls urls.csv --knowledge kb.txt --output results.csv"
)]
struct Cli {
    /// CSV file with a `url` column.
    #[arg(long)]
    urls: PathBuf,

    /// Plain-text knowledge base passed to every model call.
    #[arg(long)]
    knowledge: PathBuf,

    /// Output file; a `.json` extension selects JSON, anything else CSV.
    #[arg(short, long, default_value = "extraction_results.csv")]
    output: PathBuf,

    /// Extraction mode: synthesize-then-execute or direct-extract.
    #[arg(long)]
    mode: Option<ExtractionMode>,

    /// Maximum number of concurrent workers.
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Additional API key; may be repeated.
    #[arg(long = "api-key", env = "EXTRACTRS_API_KEY", hide_env_values = true)]
    api_keys: Vec<String>,

    /// Render pages in a headless browser instead of plain HTTP.
    #[arg(long)]
    browser: bool,
}

fn build_fetcher(fetch: &FetchSettings) -> anyhow::Result<Arc<dyn PageFetcher>> {
    let fetcher: Arc<dyn PageFetcher> = match fetch.engine {
        FetchEngineKind::Http => Arc::new(ReqwestEngine::new(&fetch.user_agent, fetch.ssrf_protection)?),
        FetchEngineKind::Browser => Arc::new(BrowserEngine::new(
            fetch.remote_debugging_url.clone(),
            fetch.readiness_policy(),
            fetch.ready_selector.clone(),
            fetch.ssrf_protection,
        )),
    };
    Ok(fetcher)
}

/// 主函数
///
/// 加载配置和输入，运行一个批次并导出结果
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let mut settings = Settings::new().context("Failed to load configuration")?;
    telemetry::init_telemetry(settings.telemetry.json);
    info!("Starting extractrs...");

    if let Some(mode) = cli.mode {
        settings.extraction.mode = mode;
    }
    if let Some(concurrency) = cli.concurrency {
        settings.extraction.max_concurrency = concurrency;
    }
    if cli.browser {
        settings.fetch.engine = FetchEngineKind::Browser;
    }
    settings.extraction.credentials.extend(
        cli.api_keys
            .into_iter()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from),
    );
    settings.validate()?;
    info!(
        mode = %settings.extraction.mode,
        engine = ?settings.fetch.engine,
        max_concurrency = settings.extraction.max_concurrency,
        credentials = settings.extraction.credentials.len(),
        "Configuration loaded"
    );

    // 2. Metrics exporter
    if settings.metrics.enabled {
        if let Err(e) = metrics::init_metrics(&settings.metrics.listen_address) {
            warn!("Metrics exporter not started: {}", e);
        }
    }

    // 3. Inputs
    let urls = input::load_urls_from_path(&cli.urls)
        .with_context(|| format!("Failed to read urls from {}", cli.urls.display()))?;
    let knowledge = input::load_knowledge(&cli.knowledge)
        .with_context(|| format!("Failed to read knowledge base {}", cli.knowledge.display()))?;
    info!(urls = urls.len(), knowledge_chars = knowledge.len(), "Inputs loaded");

    // 4. Pipeline
    let mode = settings.extraction.mode;
    let fetcher = build_fetcher(&settings.fetch)?;
    let llm = Arc::new(GeminiClient::new(settings.llm.generation_config())?);
    let strategy = strategy_for(mode, settings.routine.limits());
    let processor = Arc::new(TaskProcessor::new(
        fetcher,
        llm,
        strategy,
        settings.processor_options(),
    ));

    let credentials = std::mem::take(&mut settings.extraction.credentials);
    let batch = ExtractionBatch::new(processor, credentials, settings.extraction.max_concurrency)?;

    // 5. Run and export
    let mut report = batch.run(urls, &knowledge).await?;
    export::export_to_path(&mut report, mode, &cli.output)
        .with_context(|| format!("Failed to export results to {}", cli.output.display()))?;

    let summary = report.summary();
    println!(
        "Processed {} urls with {} workers: {} succeeded, {} failed. Results written to {}",
        summary.total,
        report.workers_spawned,
        summary.succeeded,
        summary.failed,
        cli.output.display()
    );
    Ok(())
}
