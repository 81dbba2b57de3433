// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// 输入列名
pub const URL_COLUMN: &str = "url";

/// 输入错误类型
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV file must contain a column named '{0}'")]
    MissingColumn(String),
}

/// 从CSV中读取URL列表
///
/// 必须包含 `url` 列，空白单元格被丢弃，重复的URL被保留
pub fn load_urls<R: Read>(reader: R) -> Result<Vec<String>, InputError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let column = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == URL_COLUMN)
        .ok_or_else(|| InputError::MissingColumn(URL_COLUMN.to_string()))?;

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(url) = record.get(column).map(str::trim).filter(|url| !url.is_empty()) {
            urls.push(url.to_string());
        }
    }

    debug!(count = urls.len(), "Loaded urls");
    Ok(urls)
}

pub fn load_urls_from_path(path: impl AsRef<Path>) -> Result<Vec<String>, InputError> {
    load_urls(File::open(path)?)
}

/// 读取知识库文本（UTF-8），内容原样保留
pub fn load_knowledge(path: impl AsRef<Path>) -> Result<String, InputError> {
    Ok(std::fs::read_to_string(path)?)
}
