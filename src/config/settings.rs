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

use crate::domain::services::extraction_service::ExtractionLimits;
use crate::domain::services::llm_service::GenerationConfig;
use crate::domain::services::strategy::ExtractionMode;
use crate::domain::services::task_processor::ProcessorOptions;
use crate::engines::readiness::ReadinessPolicy;
use crate::engines::reqwest_engine::DEFAULT_USER_AGENT;
use crate::utils::errors::ConfigurationError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, Map};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// 应用程序配置设置
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 批次与提取配置
    pub extraction: ExtractionSettings,
    /// 页面抓取配置
    pub fetch: FetchSettings,
    /// 生成式AI配置
    pub llm: LlmSettings,
    /// 合成程序的资源限制
    pub routine: RoutineSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub telemetry: TelemetrySettings,
}

/// 批次与提取配置
#[derive(Debug, Deserialize)]
pub struct ExtractionSettings {
    /// 最大并发工作器数
    pub max_concurrency: usize,
    /// 提取模式
    pub mode: ExtractionMode,
    /// API密钥，按配置顺序轮换
    #[serde(deserialize_with = "deserialize_secrets")]
    pub credentials: Vec<SecretString>,
}

/// 抓取引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchEngineKind {
    /// 普通HTTP请求
    Http,
    /// 无头浏览器渲染
    Browser,
}

/// 页面抓取配置
#[derive(Debug, Deserialize)]
pub struct FetchSettings {
    pub engine: FetchEngineKind,
    /// 抓取超时（秒）
    pub timeout_secs: u64,
    pub user_agent: String,
    /// 是否拒绝私有地址
    pub ssrf_protection: bool,
    /// 浏览器就绪等待时间（秒）
    pub readiness_timeout_secs: u64,
    /// 就绪轮询间隔（毫秒）
    pub readiness_poll_ms: u64,
    /// 就绪时必须存在的选择器
    pub ready_selector: Option<String>,
    /// 远程Chrome调试地址
    pub remote_debugging_url: Option<String>,
}

/// 生成式AI配置
#[derive(Debug, Deserialize)]
pub struct LlmSettings {
    pub api_base_url: String,
    pub model: String,
    pub safety_threshold: String,
    pub thinking_budget: u32,
    /// 单次AI调用超时（秒），0 表示不限制
    pub call_timeout_secs: u64,
    /// 提示中页面内容的最大字节数
    pub max_page_chars: usize,
}

/// 合成程序的资源限制
#[derive(Debug, Deserialize)]
pub struct RoutineSettings {
    pub max_rules: usize,
    pub max_matches_per_rule: usize,
}

/// 指标导出配置
#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen_address: String,
}

/// 日志配置
#[derive(Debug, Deserialize)]
pub struct TelemetrySettings {
    /// 是否输出JSON格式日志
    pub json: bool,
}

fn deserialize_secrets<'de, D>(deserializer: D) -> Result<Vec<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
        .collect())
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default.toml`、`config/{APP_ENVIRONMENT}.toml`
    /// 和以 `EXTRACTRS__` 为前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::load(&env, None)
    }

    /// 从指定环境加载配置
    ///
    /// `env_source` 不为空时用它代替进程环境变量
    pub fn load(environment: &str, env_source: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(
                Environment::with_prefix("EXTRACTRS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("extraction.credentials")
                    .try_parsing(true)
                    .source(env_source),
            )
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("extraction.max_concurrency", 15)?
            .set_default("extraction.mode", "synthesize-then-execute")?
            .set_default("extraction.credentials", Vec::<String>::new())?
            .set_default("fetch.engine", "http")?
            .set_default("fetch.timeout_secs", 15)?
            .set_default("fetch.user_agent", DEFAULT_USER_AGENT)?
            .set_default("fetch.ssrf_protection", true)?
            .set_default("fetch.readiness_timeout_secs", 10)?
            .set_default("fetch.readiness_poll_ms", 250)?
            .set_default("llm.api_base_url", "https://generativelanguage.googleapis.com/v1beta")?
            .set_default("llm.model", "gemini-2.5-flash-lite")?
            .set_default("llm.safety_threshold", "BLOCK_LOW_AND_ABOVE")?
            .set_default("llm.thinking_budget", 0)?
            .set_default("llm.call_timeout_secs", 120)?
            .set_default("llm.max_page_chars", 500_000)?
            .set_default("routine.max_rules", 64)?
            .set_default("routine.max_matches_per_rule", 500)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_address", "0.0.0.0:9000")?
            .set_default("telemetry.json", false)
    }

    /// 校验数值类前置条件
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.extraction.max_concurrency == 0 {
            return Err(ConfigurationError::InvalidConcurrency(0));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "fetch.timeout_secs must be positive".to_string(),
            ));
        }
        if self.fetch.readiness_timeout_secs >= self.fetch.timeout_secs {
            return Err(ConfigurationError::Invalid(format!(
                "fetch.readiness_timeout_secs ({}) must be below fetch.timeout_secs ({})",
                self.fetch.readiness_timeout_secs, self.fetch.timeout_secs
            )));
        }
        if self.fetch.readiness_poll_ms == 0 {
            return Err(ConfigurationError::Invalid(
                "fetch.readiness_poll_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            fetch_timeout: Duration::from_secs(self.fetch.timeout_secs),
            call_timeout: (self.llm.call_timeout_secs > 0)
                .then(|| Duration::from_secs(self.llm.call_timeout_secs)),
            max_page_chars: self.llm.max_page_chars,
        }
    }
}

impl FetchSettings {
    pub fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            timeout: Duration::from_secs(self.readiness_timeout_secs),
            poll_interval: Duration::from_millis(self.readiness_poll_ms),
        }
    }
}

impl LlmSettings {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            api_base_url: self.api_base_url.clone(),
            model: self.model.clone(),
            safety_threshold: self.safety_threshold.clone(),
            thinking_budget: self.thinking_budget,
        }
    }
}

impl RoutineSettings {
    pub fn limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            max_rules: self.max_rules,
            max_matches_per_rule: self.max_matches_per_rule,
        }
    }
}
