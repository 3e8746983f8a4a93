//! # Synthesis Pipeline Tests
//!
//! Drives `SqlSynthesizer` end to end with mock providers: prompt in, SQL and
//! validation report out, and the error paths that must stop before dispatch.

mod common;

use crate::common::{setup_tracing, shop_schema, MockAiProvider, MockSchemaProvider};
use askdb::providers::dispatcher::ProviderDispatcher;
use askdb::{
    ConfigStore, IssueKind, PromptError, ProviderConfig, ProviderConfigUpdate, ProviderId,
    SqlSynthesizer,
};
use httpmock::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn store_with_keys() -> Arc<ConfigStore> {
    let mut configs = HashMap::new();
    configs.insert(
        ProviderId::OpenAi,
        ProviderConfig::new(ProviderId::OpenAi, Some("sk-test".to_string())),
    );
    configs.insert(
        ProviderId::Claude,
        ProviderConfig::new(ProviderId::Claude, Some("claude-key".to_string())),
    );
    Arc::new(ConfigStore::new(configs))
}

fn synthesizer_with(mock: &MockAiProvider, store: Arc<ConfigStore>) -> SqlSynthesizer {
    let dispatcher = ProviderDispatcher::empty().with_provider(Box::new(mock.clone()));
    SqlSynthesizer::new(dispatcher, store)
}

#[tokio::test]
async fn test_synthesis_returns_sql_and_report() {
    setup_tracing();
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec!["SELECT u.id, u.emial FROM users u"]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    let result = synthesizer
        .synthesize("Show every user's email", &shop_schema(), "openai")
        .await
        .expect("synthesis failed");

    // The SQL comes back untouched even though it has an issue.
    assert_eq!(result.sql, "SELECT u.id, u.emial FROM users u");
    assert_eq!(result.provider, ProviderId::OpenAi);
    assert_eq!(result.model_name, "gpt-3.5-turbo");
    assert!(result.validation.has_issues);
    assert_eq!(result.validation.issues.len(), 1);
    assert_eq!(result.validation.issues[0].kind, IssueKind::UnknownColumn);

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("\"Show every user's email\""));
    assert!(calls[0].0.contains("TABLE: orders"));
}

#[tokio::test]
async fn test_fenced_response_is_unwrapped() {
    let mock = MockAiProvider::new(
        ProviderId::Claude,
        vec!["```sql\nSELECT o.total FROM orders o\n```"],
    );
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    let result = synthesizer
        .synthesize("order totals", &shop_schema(), "claude")
        .await
        .unwrap();

    assert_eq!(result.sql, "SELECT o.total FROM orders o");
    assert!(!result.validation.has_issues);
}

#[tokio::test]
async fn test_empty_schema_never_reaches_dispatcher() {
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec!["SELECT 1"]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    let err = synthesizer
        .synthesize_from("anything", &MockSchemaProvider::Empty, "openai")
        .await
        .unwrap_err();

    assert!(matches!(err, PromptError::EmptySchema));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_unavailable_schema_is_surfaced() {
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec!["SELECT 1"]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    let err = synthesizer
        .synthesize_from("anything", &MockSchemaProvider::Disconnected, "openai")
        .await
        .unwrap_err();

    assert!(matches!(err, PromptError::SchemaUnavailable(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_synthesis_from_schema_provider() {
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec!["SELECT u.email FROM users u"]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    let result = synthesizer
        .synthesize_from(
            "emails",
            &MockSchemaProvider::Fixed(shop_schema()),
            "openai",
        )
        .await
        .unwrap();

    assert!(!result.validation.has_issues);
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test]
async fn test_unsupported_provider_and_missing_key() {
    let mock = MockAiProvider::new(ProviderId::Claude, vec!["SELECT 1"]);
    let synthesizer = synthesizer_with(&mock, Arc::new(ConfigStore::default()));

    let err = synthesizer
        .synthesize("q", &shop_schema(), "mistral")
        .await
        .unwrap_err();
    assert!(matches!(err, PromptError::UnsupportedProvider(_)));

    let err = synthesizer
        .synthesize("q", &shop_schema(), "claude")
        .await
        .unwrap_err();
    assert!(matches!(err, PromptError::MissingCredential(ProviderId::Claude)));

    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_blank_question_is_rejected() {
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec!["SELECT 1"]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    let err = synthesizer
        .synthesize("   ", &shop_schema(), "openai")
        .await
        .unwrap_err();
    assert!(matches!(err, PromptError::InvalidRequest(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_question_reaches_prompt_verbatim() {
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec!["SELECT 1"]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    synthesizer
        .synthesize("  List users\t", &shop_schema(), "openai")
        .await
        .unwrap();

    assert!(mock.calls()[0].0.contains("\"  List users\t\""));
}

#[tokio::test]
async fn test_sqlite_tagged_fence_is_unwrapped() {
    let mock = MockAiProvider::new(
        ProviderId::OpenAi,
        vec!["```sqlite\nSELECT u.email FROM users u\n```"],
    );
    let synthesizer = synthesizer_with(&mock, store_with_keys()).dialect("SQLite");

    let result = synthesizer
        .synthesize("emails", &shop_schema(), "openai")
        .await
        .unwrap();

    assert_eq!(result.sql, "SELECT u.email FROM users u");
    assert!(!result.validation.has_issues);
}

#[tokio::test]
async fn test_config_update_applies_to_next_call() {
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec!["SELECT 1", "SELECT 2"]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    synthesizer
        .synthesize("first", &shop_schema(), "openai")
        .await
        .unwrap();
    assert!(synthesizer
        .update_provider_config("openai", &ProviderConfigUpdate::model_name("gpt-4o")));
    let second = synthesizer
        .synthesize("second", &shop_schema(), "openai")
        .await
        .unwrap();

    let models: Vec<String> = mock.calls().into_iter().map(|(_, model)| model).collect();
    assert_eq!(models, vec!["gpt-3.5-turbo", "gpt-4o"]);
    assert_eq!(second.model_name, "gpt-4o");

    let summary = synthesizer.provider_config_summary();
    assert_eq!(summary[&ProviderId::OpenAi].model_name, "gpt-4o");
    assert!(summary[&ProviderId::OpenAi].has_api_key);
}

#[tokio::test]
async fn test_rejected_update_reports_false() {
    let mock = MockAiProvider::new(ProviderId::OpenAi, vec![]);
    let synthesizer = synthesizer_with(&mock, store_with_keys());

    assert!(!synthesizer.update_provider_config("mistral", &ProviderConfigUpdate::model_name("x")));
    let summary = synthesizer.provider_config_summary();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[&ProviderId::OpenAi].model_name, "gpt-3.5-turbo");
}

#[tokio::test]
async fn test_summary_serialization_hides_secrets() {
    let store = store_with_keys();
    let json = serde_json::to_value(store.summary()).unwrap();
    assert_eq!(
        json,
        json!({
            "openai": {"modelName": "gpt-3.5-turbo", "hasApiKey": true},
            "claude": {"modelName": "claude-3-opus-20240229", "hasApiKey": true}
        })
    );
    assert!(!json.to_string().contains("sk-test"));
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("gpt-4o");
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "SELECT o.id, o.user_id FROM orders o"}}]
            }));
        })
        .await;

    let store = store_with_keys();
    store
        .update_config(
            "openai",
            &ProviderConfigUpdate {
                model_name: Some("gpt-4o".to_string()),
                api_url: Some(server.url("/v1/chat/completions")),
                ..Default::default()
            },
        )
        .unwrap();
    let synthesizer = SqlSynthesizer::new(
        ProviderDispatcher::new(Duration::from_secs(5)).unwrap(),
        store,
    );

    let result = synthesizer
        .synthesize("orders with their users", &shop_schema(), "openai")
        .await
        .unwrap();

    assert_eq!(result.sql, "SELECT o.id, o.user_id FROM orders o");
    assert!(!result.validation.has_issues);
    mock.assert_async().await;
}
