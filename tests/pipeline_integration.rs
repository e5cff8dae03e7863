use std::collections::HashMap;

use httpmock::{Method::POST, Mock, MockServer};
use pdfchat::{
    AppServices,
    config::Config,
    conversation::NOT_READY_MESSAGE,
    processing::ProcessingError,
    session::{Session, SessionPhase},
};
use serde_json::json;

const EMBEDDINGS_PATH: &str = "/openai/deployments/text-embedding-3-small/embeddings";
const CHAT_PATH: &str = "/openai/deployments/gpt-4o/chat/completions";

const REPORT: &str = "revenue grew in the north region\nthe office moved to the harbour";

fn config_for(server: &MockServer, overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("AZURE_OPENAI_ENDPOINT", server.base_url()),
        ("AZURE_OPENAI_API_KEY", "integration-key".to_string()),
        ("AZURE_EMBEDDING_MODEL", "text-embedding-3-small".to_string()),
        ("AZURE_CHAT_MODEL", "gpt-4o".to_string()),
        ("OPENAI_API_VERSION", "2024-02-01".to_string()),
        ("TEXT_SPLITTER_CHUNK_SIZE", "40".to_string()),
        ("TEXT_SPLITTER_CHUNK_OVERLAP", "0".to_string()),
        ("EMBEDDING_BATCH_SIZE", "1".to_string()),
        ("RETRIEVAL_TOP_K", "1".to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid config")
}

/// One embedding mock per topic so retrieval is deterministic.
async fn mock_embeddings(server: &MockServer) -> (Mock<'_>, Mock<'_>) {
    let revenue = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EMBEDDINGS_PATH)
                .query_param("api-version", "2024-02-01")
                .header("api-key", "integration-key")
                .body_contains("revenue");
            then.status(200).json_body(json!({
                "data": [{ "index": 0, "embedding": [1.0, 0.0] }]
            }));
        })
        .await;
    let office = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EMBEDDINGS_PATH)
                .body_contains("office");
            then.status(200).json_body(json!({
                "data": [{ "index": 0, "embedding": [0.0, 1.0] }]
            }));
        })
        .await;
    (revenue, office)
}

async fn mock_answer<'a>(server: &'a MockServer, context: &str, answer: &str) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH).body_contains(context);
            then.status(200).json_body(json!({
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": answer } }]
            }));
        })
        .await
}

#[tokio::test]
async fn two_questions_produce_two_turns_in_order() {
    let server = MockServer::start_async().await;
    let (revenue_embeddings, office_embeddings) = mock_embeddings(&server).await;
    let first_answer =
        mock_answer(&server, "revenue grew in the north region", "Revenue grew.").await;
    let second_answer =
        mock_answer(&server, "the office moved to the harbour", "At the harbour.").await;

    let config = config_for(&server, &[("CONDENSE_FOLLOW_UPS", "false")]);
    let services = AppServices::from_config(&config).expect("services");
    let mut session = Session::new();

    let outcome = session
        .process_text(&services.processor, REPORT)
        .await
        .expect("index built");
    assert_eq!(outcome.chunk_count, 2);
    assert_eq!(session.phase(), SessionPhase::Ready);

    session
        .ask(&services.pipeline, "How was revenue?")
        .await
        .expect("first answer");
    let history = session
        .ask(&services.pipeline, "Where is the office?")
        .await
        .expect("second answer");

    let turns = history.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].question, "How was revenue?");
    assert_eq!(turns[0].answer, "Revenue grew.");
    assert_eq!(turns[1].question, "Where is the office?");
    assert_eq!(turns[1].answer, "At the harbour.");

    revenue_embeddings.assert_hits_async(2).await;
    office_embeddings.assert_hits_async(2).await;
    first_answer.assert_async().await;
    second_answer.assert_async().await;
    assert_eq!(services.metrics.snapshot().questions_answered, 2);
}

#[tokio::test]
async fn follow_ups_are_condensed_before_retrieval() {
    let server = MockServer::start_async().await;
    let (_revenue, office_embeddings) = mock_embeddings(&server).await;
    mock_answer(&server, "revenue grew in the north region", "Revenue grew.").await;
    let condense = mock_answer(&server, "Standalone question:", "Where is the office?").await;
    let harbour =
        mock_answer(&server, "the office moved to the harbour", "At the harbour.").await;

    let config = config_for(&server, &[]);
    let services = AppServices::from_config(&config).expect("services");
    let mut session = Session::new();
    session
        .process_text(&services.processor, REPORT)
        .await
        .expect("index built");

    session
        .ask(&services.pipeline, "How was revenue?")
        .await
        .expect("first answer");
    let history = session
        .ask(&services.pipeline, "And where did it move?")
        .await
        .expect("follow-up answer");

    // the raw follow-up is what the user sees
    assert_eq!(history.turns()[1].question, "And where did it move?");
    assert_eq!(history.turns()[1].answer, "At the harbour.");
    condense.assert_async().await;
    harbour.assert_async().await;
    // indexing the office chunk plus the condensed question
    office_embeddings.assert_hits_async(2).await;
}

#[tokio::test]
async fn embedding_outage_leaves_session_idle() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(EMBEDDINGS_PATH);
            then.status(500).body("internal error");
        })
        .await;

    let config = config_for(&server, &[]);
    let services = AppServices::from_config(&config).expect("services");
    let mut session = Session::new();

    let error = session
        .process_text(&services.processor, REPORT)
        .await
        .expect_err("service failure");

    assert!(matches!(error, ProcessingError::Embedding(_)));
    assert!(error.guidance().is_none());
    assert!(error.to_string().contains("500"));
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn question_while_idle_never_reaches_the_service() {
    let server = MockServer::start_async().await;
    let any_call = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200);
        })
        .await;

    let config = config_for(&server, &[]);
    let services = AppServices::from_config(&config).expect("services");
    let mut session = Session::new();

    let error = session
        .ask(&services.pipeline, "What does the report say?")
        .await
        .expect_err("idle");
    assert_eq!(error.guidance().as_deref(), Some(NOT_READY_MESSAGE));
    any_call.assert_hits_async(0).await;
}
