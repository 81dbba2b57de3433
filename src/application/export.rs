// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::batch::{BatchError, BatchReport};
use crate::domain::models::outcome::{OutcomePayload, OutcomeRecord};
use crate::domain::services::strategy::ExtractionMode;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// 缺失产物的占位符
pub const NOT_AVAILABLE: &str = "N/A";

/// 导出错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

/// 渲染提取结果单元格，失败记录渲染为 `ERROR: <描述>`
pub fn render_extracted(record: &OutcomeRecord) -> String {
    match record.payload() {
        OutcomePayload::Success(Value::String(text)) => text.clone(),
        OutcomePayload::Success(data) => data.to_string(),
        OutcomePayload::Failure(description) => format!("ERROR: {}", description),
    }
}

/// 以CSV格式写出批次结果（完成顺序），每条记录一行
///
/// 合成模式下额外输出 `ai_generated_code` 列。只有全部写出并刷新成功后
/// 报告才会被标记为已导出。
pub fn write_csv<W: Write>(
    report: &mut BatchReport,
    mode: ExtractionMode,
    writer: W,
) -> Result<(), ExportError> {
    report.ensure_exportable()?;
    let with_artifact = mode == ExtractionMode::SynthesizeThenExecute;
    let mut writer = csv::Writer::from_writer(writer);

    if with_artifact {
        writer.write_record(["url", "ai_generated_code", "extracted_data"])?;
    } else {
        writer.write_record(["url", "extracted_data"])?;
    }

    for record in &report.records {
        let extracted = render_extracted(record);
        if with_artifact {
            let artifact = record.diagnostic().unwrap_or(NOT_AVAILABLE);
            writer.write_record([record.task_id(), artifact, extracted.as_str()])?;
        } else {
            writer.write_record([record.task_id(), extracted.as_str()])?;
        }
    }
    writer.flush()?;
    report.mark_exported()?;
    Ok(())
}

/// 以JSON格式写出完整的结果记录
pub fn write_json<W: Write>(report: &mut BatchReport, writer: W) -> Result<(), ExportError> {
    report.ensure_exportable()?;
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &report.records)?;
    writer.flush()?;
    report.mark_exported()?;
    Ok(())
}

/// 按文件扩展名选择格式导出（`.json` 为JSON，其余为CSV）
pub fn export_to_path(
    report: &mut BatchReport,
    mode: ExtractionMode,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    // Reject before File::create truncates an earlier export
    report.ensure_exportable()?;
    let file = File::create(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        write_json(report, file)?;
    } else {
        write_csv(report, mode, file)?;
    }

    info!(path = %path.display(), rows = report.records.len(), "Batch exported");
    Ok(())
}
