// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 批次集成测试
///
/// 使用模拟抓取器与模拟AI客户端验证完整的批次流程

#[cfg(test)]
mod tests {
    use crate::integration::helpers::{
        batch, processor, secrets, MockFetcher, RecordingClient, NOTICE_PAGE, ROUTINE,
    };
    use extractrs::application::use_cases::run_batch::{BatchRunError, ExtractionBatch};
    use extractrs::domain::models::batch::BatchStatus;
    use extractrs::domain::models::outcome::OutcomePayload;
    use extractrs::domain::services::strategy::ExtractionMode;
    use extractrs::utils::errors::ConfigurationError;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    const URLS: [&str; 3] = [
        "https://regulator.example/actions/1",
        "https://regulator.example/actions/2",
        "https://regulator.example/actions/3",
    ];

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_three_urls_two_workers_two_credentials() {
        let fetcher = Arc::new(
            URLS.iter()
                .fold(MockFetcher::new(), |f, url| f.with_page(url, NOTICE_PAGE)),
        );
        let client = Arc::new(RecordingClient::replying(ROUTINE));
        let batch = batch(
            fetcher.clone(),
            client.clone(),
            ExtractionMode::SynthesizeThenExecute,
            2,
            2,
        );

        let report = batch.run(URLS, "Focus on consent orders.").await.unwrap();

        assert_eq!(report.workers_spawned, 2);
        assert_eq!(report.status, BatchStatus::Joined);
        assert_eq!(report.records.len(), 3);
        for record in &report.records {
            assert_eq!(
                record.payload(),
                &OutcomePayload::Success(json!({
                    "enforcement_title": "Consent Order: Example Credit Union",
                    "date": "2024-02-14"
                }))
            );
            assert_eq!(record.diagnostic(), Some(ROUTINE));
        }

        let used: HashSet<&str> = report.records.iter().filter_map(|r| r.credential()).collect();
        assert_eq!(used, HashSet::from(["key-1", "key-2"]));

        let mut seen: Vec<&str> = report.records.iter().map(|r| r.task_id()).collect();
        seen.sort_unstable();
        assert_eq!(seen, URLS.to_vec());
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_single_failing_url_spawns_one_worker() {
        let fetcher = Arc::new(MockFetcher::new());
        let client = Arc::new(RecordingClient::replying(ROUTINE));
        let batch = batch(
            fetcher.clone(),
            client.clone(),
            ExtractionMode::SynthesizeThenExecute,
            3,
            15,
        );

        let report = batch.run(["https://down.example/"], "kb").await.unwrap();

        assert_eq!(report.workers_spawned, 1);
        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.task_id(), "https://down.example/");
        assert!(!record.error().unwrap().is_empty());
        assert!(record.error().unwrap().contains("404"));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_spawns_no_workers() {
        let fetcher = Arc::new(MockFetcher::new());
        let client = Arc::new(RecordingClient::replying(ROUTINE));
        let batch = batch(fetcher.clone(), client, ExtractionMode::DirectExtract, 1, 4);

        let report = batch.run(Vec::<String>::new(), "kb").await.unwrap();

        assert_eq!(report.workers_spawned, 0);
        assert!(report.records.is_empty());
        assert_eq!(report.status, BatchStatus::Joined);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_point_keeps_artifact_verbatim() {
        let artifact = "def extract(html):\n    return {}\n";
        let fetcher = Arc::new(MockFetcher::new().with_page(URLS[0], NOTICE_PAGE));
        let client = Arc::new(RecordingClient::replying(artifact));
        let batch = batch(fetcher, client, ExtractionMode::SynthesizeThenExecute, 1, 1);

        let report = batch.run([URLS[0]], "kb").await.unwrap();

        let record = &report.records[0];
        assert!(!record.is_success());
        assert_eq!(record.diagnostic(), Some(artifact));
    }

    #[tokio::test]
    async fn test_routine_without_entry_point_object() {
        let artifact = r#"{"parse": {"title": {"selector": "h1"}}}"#;
        let fetcher = Arc::new(MockFetcher::new().with_page(URLS[0], NOTICE_PAGE));
        let client = Arc::new(RecordingClient::replying(artifact));
        let batch = batch(fetcher, client, ExtractionMode::SynthesizeThenExecute, 1, 1);

        let report = batch.run([URLS[0]], "kb").await.unwrap();

        let record = &report.records[0];
        assert!(record.error().unwrap().contains("scrape_page"));
        assert_eq!(record.diagnostic(), Some(artifact));
    }

    #[tokio::test]
    async fn test_knowledge_is_passed_verbatim_to_every_call() {
        let knowledge = "  Enforcement actions only.\n\n  Skip press releases.\t";
        let fetcher = Arc::new(
            URLS.iter()
                .fold(MockFetcher::new(), |f, url| f.with_page(url, NOTICE_PAGE)),
        );
        let client = Arc::new(RecordingClient::replying("{\"date\": \"2024-02-14\"}"));
        let batch = batch(fetcher, client.clone(), ExtractionMode::DirectExtract, 2, 3);

        let report = batch.run(URLS, knowledge).await.unwrap();

        assert_eq!(report.summary().succeeded, 3);
        let prompts = client.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p.contains(knowledge)));
    }

    #[tokio::test]
    async fn test_duplicate_urls_are_processed_independently() {
        let url = URLS[0];
        let fetcher = Arc::new(MockFetcher::new().with_page(url, NOTICE_PAGE));
        let client = Arc::new(RecordingClient::replying(ROUTINE));
        let batch = batch(fetcher.clone(), client, ExtractionMode::SynthesizeThenExecute, 1, 2);

        let report = batch.run([url, url, url], "kb").await.unwrap();

        assert_eq!(report.records.len(), 3);
        assert_eq!(fetcher.calls(), 3);
        let sequences: Vec<usize> = report.in_submission_order().iter().map(|r| r.sequence()).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_preconditions_fail_before_any_worker_starts() {
        let fetcher = Arc::new(MockFetcher::new());
        let client = Arc::new(RecordingClient::replying(ROUTINE));

        let empty_pool = ExtractionBatch::new(
            processor(fetcher.clone(), client.clone(), ExtractionMode::DirectExtract),
            Vec::new(),
            4,
        );
        assert!(matches!(empty_pool, Err(ConfigurationError::EmptyCredentialPool)));

        let zero_concurrency = ExtractionBatch::new(
            processor(fetcher.clone(), client.clone(), ExtractionMode::DirectExtract),
            secrets(2),
            0,
        );
        assert!(matches!(
            zero_concurrency,
            Err(ConfigurationError::InvalidConcurrency(0))
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_url_is_rejected_before_processing() {
        let fetcher = Arc::new(MockFetcher::new());
        let client = Arc::new(RecordingClient::replying(ROUTINE));
        let batch = batch(fetcher.clone(), client, ExtractionMode::DirectExtract, 1, 2);

        let err = batch.run(["https://a.example", "   "], "kb").await.unwrap_err();
        assert!(matches!(err, BatchRunError::Task(_)));
        assert_eq!(fetcher.calls(), 0);
    }
}
