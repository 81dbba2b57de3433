// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

/// API凭证
///
/// 包装一个密钥及其可公开的标签。标签用于日志和指标，
/// 密钥本身只在发起请求时暴露。
#[derive(Clone)]
pub struct Credential {
    label: String,
    secret: Arc<SecretString>,
}

impl Credential {
    /// 创建新的凭证
    pub fn new(label: impl Into<String>, secret: SecretString) -> Self {
        Self {
            label: label.into(),
            secret: Arc::new(secret),
        }
    }

    /// 凭证标签
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 暴露密钥原文，仅在构造请求头时使用
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("label", &self.label)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
