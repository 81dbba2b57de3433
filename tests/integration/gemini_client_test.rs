// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Gemini 流式客户端测试
///
/// 在本地启动一个模拟 `streamGenerateContent` 的SSE服务

#[cfg(test)]
mod tests {
    use axum::{
        extract::State,
        http::{header, HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use extractrs::domain::models::credential::Credential;
    use extractrs::domain::services::llm_service::{
        GeminiClient, GenerationConfig, GenerativeClient, LlmError,
    };
    use parking_lot::Mutex;
    use secrecy::SecretString;
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Captured {
        keys: Arc<Mutex<Vec<String>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    fn sse(events: &[&str]) -> Response {
        let body: String = events.iter().map(|e| format!("data: {}\r\n\r\n", e)).collect();
        ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
    }

    async fn generate(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        let key = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        captured.keys.lock().push(key.clone());
        captured.bodies.lock().push(body);

        match key.as_str() {
            "quota-key" => (
                StatusCode::TOO_MANY_REQUESTS,
                r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#,
            )
                .into_response(),
            "empty-key" => sse(&[
                r#"{"candidates":[{"content":{"parts":[{"text":"  "}]},"finishReason":"STOP"}]}"#,
            ]),
            "blocked-key" => sse(&[r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#]),
            _ => sse(&[
                r#"{"candidates":[{"content":{"parts":[{"text":"```json\n{\"scrape_page\": "}]}}]}"#,
                r#"{"candidates":[{"content":{"parts":[{"text":"{}}\n```\n"}]},"finishReason":"STOP"}]}"#,
            ]),
        }
    }

    async fn start_provider() -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/v1beta/models/{*rest}", post(generate))
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1beta", addr), captured)
    }

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(GenerationConfig {
            api_base_url: base_url,
            ..GenerationConfig::default()
        })
        .unwrap()
    }

    fn credential(secret: &str) -> Credential {
        Credential::new("key-1", SecretString::from(secret.to_string()))
    }

    #[tokio::test]
    async fn test_stream_is_concatenated_and_trimmed() {
        let (base_url, captured) = start_provider().await;

        let output = client(base_url)
            .generate("extract the actions", &credential("good-key"))
            .await
            .unwrap();

        assert_eq!(output, "```json\n{\"scrape_page\": {}}\n```");
        assert_eq!(captured.keys.lock().as_slice(), ["good-key"]);

        let body = captured.bodies.lock()[0].clone();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "extract the actions");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_provider_error_status() {
        let (base_url, _) = start_provider().await;
        let err = client(base_url)
            .generate("prompt", &credential("quota-key"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, ref message } if message.contains("exhausted")));
    }

    #[tokio::test]
    async fn test_whitespace_only_stream_is_empty_response() {
        let (base_url, _) = start_provider().await;
        let err = client(base_url)
            .generate("prompt", &credential("empty-key"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let (base_url, _) = start_provider().await;
        let err = client(base_url)
            .generate("prompt", &credential("blocked-key"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Blocked(reason) if reason == "SAFETY"));
    }
}
