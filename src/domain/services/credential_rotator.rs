// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::credential::Credential;
use crate::utils::errors::ConfigurationError;
use metrics::counter;
use parking_lot::Mutex;
use secrecy::SecretString;

/// 凭证轮换器
///
/// 持有一个有序的凭证环。每次 `acquire` 在同一个临界区内读取环首并把
/// 环首移动到下一个位置（等价于把凭证放回队尾），因此并发调用者按轮询顺序
/// 公平地分享凭证，且凭证集合本身从不改变。
pub struct CredentialRotator {
    /// 凭证列表，构造后只读
    credentials: Vec<Credential>,
    /// 当前环首索引
    cursor: Mutex<usize>,
}

impl CredentialRotator {
    /// 根据密钥列表创建轮换器
    ///
    /// # 参数
    ///
    /// * `secrets` - 按顺序排列的API密钥
    ///
    /// # 返回值
    ///
    /// * `Ok(CredentialRotator)` - 新的轮换器，凭证标签依次为 `key-1`、`key-2`……
    /// * `Err(ConfigurationError::EmptyCredentialPool)` - 密钥列表为空
    pub fn new(secrets: Vec<SecretString>) -> Result<Self, ConfigurationError> {
        let credentials = secrets
            .into_iter()
            .enumerate()
            .map(|(i, secret)| Credential::new(format!("key-{}", i + 1), secret))
            .collect();
        Self::from_credentials(credentials)
    }

    /// 使用已构造好的凭证创建轮换器
    pub fn from_credentials(credentials: Vec<Credential>) -> Result<Self, ConfigurationError> {
        if credentials.is_empty() {
            return Err(ConfigurationError::EmptyCredentialPool);
        }

        Ok(Self {
            credentials,
            cursor: Mutex::new(0),
        })
    }

    /// 取出下一个凭证
    pub fn acquire(&self) -> Credential {
        let credential = {
            let mut cursor = self.cursor.lock();
            let credential = self.credentials[*cursor].clone();
            *cursor = (*cursor + 1) % self.credentials.len();
            credential
        };

        counter!("extractrs_credential_acquisitions_total", "credential" => credential.label().to_string())
            .increment(1);
        credential
    }

    /// 凭证池大小，构造后不再变化
    pub fn pool_size(&self) -> usize {
        self.credentials.len()
    }

    /// 当前环中凭证标签的顺序快照，从下一个将被取出的凭证开始
    pub fn labels(&self) -> Vec<String> {
        let cursor = *self.cursor.lock();
        self.credentials[cursor..]
            .iter()
            .chain(self.credentials[..cursor].iter())
            .map(|c| c.label().to_string())
            .collect()
    }
}
