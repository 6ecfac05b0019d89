// tests/ai_providers.rs
use feed_sentiment_relay::ai_adapter::{
    ChatCompletionsClassifier, GeminiClassifier, SentimentClassifier,
};
use feed_sentiment_relay::error::ClassificationError;
use feed_sentiment_relay::Signal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_ANSWER: &str = r#"{"tickers": ["$NVDA", "amd"], "sentiment": "SELL", "bull_case": "AI capex", "bear_case": "multiple compression", "summary": "Trimming semis"}"#;

#[tokio::test]
async fn gemini_generate_content_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", "g-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": MODEL_ANSWER }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let c = GeminiClassifier::new(
        reqwest::Client::new(),
        &server.uri(),
        "g-key",
        "gemini-2.5-flash",
    );
    let out = c.classify("@alea", "$NVDA looks toppy").await.unwrap();
    assert_eq!(out.symbols, vec!["NVDA".to_string(), "AMD".to_string()]);
    assert_eq!(out.signal, Signal::Sell);
    assert_eq!(out.bear_case, "multiple compression");
    assert_eq!(c.provider_name(), "gemini");
}

#[tokio::test]
async fn gemini_without_candidates_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let c = GeminiClassifier::new(reqwest::Client::new(), &server.uri(), "k", "m");
    let err = c.classify("a", "b").await.unwrap_err();
    assert!(matches!(err, ClassificationError::Malformed { provider: "gemini", .. }));
}

#[tokio::test]
async fn openai_chat_completions_uses_bearer_and_json_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer o-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": format!("```json\n{MODEL_ANSWER}\n```") } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let c = ChatCompletionsClassifier::openai(
        reqwest::Client::new(),
        &server.uri(),
        "o-key",
        "gpt-4o-mini",
    );
    let out = c.classify("@alea", "semis").await.unwrap();
    assert_eq!(out.signal, Signal::Sell);
    assert_eq!(out.summary, "Trimming semis");
    assert_eq!(c.provider_name(), "openai");
}

#[tokio::test]
async fn glm_shares_the_chat_completions_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "glm-5" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "{\"tickers\": [], \"sentiment\": \"NEUTRAL\"}" } }]
        })))
        .mount(&server)
        .await;

    let c = ChatCompletionsClassifier::glm(reqwest::Client::new(), &server.uri(), "z-key", "glm-5");
    let out = c.classify("a", "gm").await.unwrap();
    assert!(out.symbols.is_empty());
    assert_eq!(out.signal, Signal::Neutral);
    assert_eq!(c.provider_name(), "glm");
}

#[tokio::test]
async fn provider_http_errors_surface_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let c = ChatCompletionsClassifier::openai(reqwest::Client::new(), &server.uri(), "k", "m");
    let err = c.classify("a", "b").await.unwrap_err();
    assert!(matches!(
        err,
        ClassificationError::Status {
            provider: "openai",
            status: 429
        }
    ));
}
