// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 输入与导出测试
///
/// 从CSV读取URL，运行批次，再把结果写回CSV/JSON文件

#[cfg(test)]
mod tests {
    use crate::integration::helpers::{batch, MockFetcher, RecordingClient, NOTICE_PAGE, ROUTINE};
    use extractrs::application::export::{export_to_path, ExportError};
    use extractrs::application::input::{load_knowledge, load_urls_from_path, InputError};
    use extractrs::domain::models::batch::BatchStatus;
    use extractrs::domain::services::strategy::ExtractionMode;
    use serde_json::Value;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::{tempdir, NamedTempFile};

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_csv_in_csv_out_has_one_row_per_url() {
        let urls_file = write_temp(
            "url,notes\nhttps://ok.example/1,first\n,blank\nhttps://missing.example/2,second\nhttps://ok.example/1,dup\n",
        );
        let knowledge_file = write_temp("Consent orders and civil money penalties.\n");

        let urls = load_urls_from_path(urls_file.path()).unwrap();
        let knowledge = load_knowledge(knowledge_file.path()).unwrap();
        assert_eq!(urls.len(), 3);
        assert_eq!(knowledge, "Consent orders and civil money penalties.\n");

        let fetcher = Arc::new(MockFetcher::new().with_page("https://ok.example/1", NOTICE_PAGE));
        let client = Arc::new(RecordingClient::replying(ROUTINE));
        let batch = batch(fetcher, client, ExtractionMode::SynthesizeThenExecute, 2, 2);
        let mut report = batch.run(urls, &knowledge).await.unwrap();

        let dir = tempdir().unwrap();
        let out = dir.path().join("results.csv");
        export_to_path(&mut report, ExtractionMode::SynthesizeThenExecute, &out).unwrap();
        assert_eq!(report.status, BatchStatus::Exported);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            vec!["url", "ai_generated_code", "extracted_data"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);

        let failed: Vec<&csv::StringRecord> = rows
            .iter()
            .filter(|row| &row[0] == "https://missing.example/2")
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(&failed[0][1], "N/A");
        assert!(failed[0][2].starts_with("ERROR: "));

        let succeeded: Vec<&csv::StringRecord> = rows
            .iter()
            .filter(|row| &row[0] == "https://ok.example/1")
            .collect();
        assert_eq!(succeeded.len(), 2);
        for row in succeeded {
            assert_eq!(&row[1], ROUTINE);
            let data: Value = serde_json::from_str(&row[2]).unwrap();
            assert_eq!(data["date"], "2024-02-14");
        }

        // Exporting again is a repeatable read of the same snapshot
        let json_out = dir.path().join("results.json");
        export_to_path(&mut report, ExtractionMode::SynthesizeThenExecute, &json_out).unwrap();
        let records: Value = serde_json::from_str(&std::fs::read_to_string(&json_out).unwrap()).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 3);
        assert!(records[0]["task_id"].is_string());
        assert!(records[0]["payload"]["status"].is_string());
    }

    #[test]
    fn test_missing_url_column_is_reported() {
        let urls_file = write_temp("address\nhttps://ok.example/1\n");
        let err = load_urls_from_path(urls_file.path()).unwrap_err();
        assert!(matches!(err, InputError::MissingColumn(_)));
        assert_eq!(err.to_string(), "CSV file must contain a column named 'url'");
    }

    #[test]
    fn test_missing_knowledge_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_knowledge(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, InputError::Io(_)));
    }

    #[tokio::test]
    async fn test_export_to_unwritable_path_fails() {
        let fetcher = Arc::new(MockFetcher::new());
        let client = Arc::new(RecordingClient::replying(ROUTINE));
        let batch = batch(fetcher, client, ExtractionMode::DirectExtract, 1, 1);
        let mut report = batch.run(Vec::<String>::new(), "kb").await.unwrap();

        let dir = tempdir().unwrap();
        let err = export_to_path(
            &mut report,
            ExtractionMode::DirectExtract,
            dir.path().join("no-such-dir").join("out.csv"),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
