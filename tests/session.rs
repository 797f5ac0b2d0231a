mod common;

use common::*;
use finchat::agent::Session;
use finchat::error::CycleError;
use finchat::llm::ModelResponse;
use finchat::types::*;
use std::sync::Arc;
use std::time::Duration;

fn session(model: Arc<FakeModel>) -> Arc<Session> {
    Arc::new(Session::new(Arc::new(orchestrator(model))))
}

fn answered(text: &'static str) -> Arc<FakeModel> {
    FakeModel::new(move |_| {
        let mut response = ModelResponse::text(text);
        response.usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        Ok(response)
    })
}

async fn wait_until_loading(session: &Session) {
    for _ in 0..200 {
        if session.is_loading() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never started loading");
}

#[tokio::test]
async fn messages_accumulate_history_and_usage() {
    let session = session(answered("Hello!"));

    session.send_message("Hi").await.unwrap();
    session.send_message("Hi again").await.unwrap();

    let history = session.history();
    assert_eq!(history.len(), 4);
    let roles: Vec<Role> = history.iter().map(|t| t.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(session.usage().total_tokens, 30);
    assert!(!session.is_loading());
    assert!(session.error().is_none());
}

#[tokio::test]
async fn blank_message_changes_nothing() {
    let session = session(answered("unused"));
    assert!(session.send_message("  ").await.unwrap().is_none());
    assert_eq!(session.turn_count(), 0);
}

#[tokio::test]
async fn second_message_while_loading_is_busy() {
    let model = FakeModel::slow(Duration::from_millis(300), |_| Ok(ModelResponse::text("done")));
    let session = session(model);

    let background = Arc::clone(&session);
    let first = tokio::spawn(async move { background.send_message("first").await });
    wait_until_loading(&session).await;

    let err = session.send_message("second").await.unwrap_err();
    assert!(matches!(err, CycleError::Busy));

    let turn = first.await.unwrap().unwrap().unwrap();
    assert_eq!(turn.content, "done");
    assert_eq!(session.turn_count(), 2);
}

#[tokio::test]
async fn clear_during_cycle_discards_the_late_reply() {
    let model = FakeModel::slow(Duration::from_secs(30), |_| Ok(ModelResponse::text("late")));
    let session = session(model);

    let background = Arc::clone(&session);
    let pending = tokio::spawn(async move { background.send_message("Hi").await });
    wait_until_loading(&session).await;
    assert_eq!(session.turn_count(), 1);

    session.clear_session();

    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("cycle should stop promptly")
        .unwrap();
    assert!(matches!(result, Err(CycleError::Cancelled)));
    assert!(session.history().is_empty());
    assert!(!session.is_loading());
    assert!(session.error().is_none());
}

#[tokio::test]
async fn failed_cycle_sets_error_until_next_send() {
    let model = FakeModel::new(|request| {
        if request.user_text == "break" {
            Err(anyhow::anyhow!("provider down"))
        } else {
            Ok(ModelResponse::text("fine"))
        }
    });
    let session = session(model);

    assert!(session.send_message("break").await.is_err());
    let error = session.error().unwrap();
    assert!(error.contains("provider down"));
    assert!(!session.is_loading());
    assert_eq!(session.turn_count(), 1);

    session.send_message("hello").await.unwrap();
    assert!(session.error().is_none());
    assert_eq!(session.turn_count(), 3);
}

#[tokio::test]
async fn clear_is_idempotent() {
    let session = session(answered("Hello!"));
    session.clear_session();
    session.send_message("Hi").await.unwrap();
    session.clear_session();
    session.clear_session();

    assert!(session.history().is_empty());
    assert_eq!(session.usage(), TokenUsage::default());

    session.send_message("Hi").await.unwrap();
    assert_eq!(session.turn_count(), 2);
}

#[tokio::test]
async fn dropped_send_releases_the_busy_flag() {
    let model = FakeModel::slow(Duration::from_secs(30), |_| Ok(ModelResponse::text("late")));
    let session = session(model);

    let dropped = tokio::time::timeout(Duration::from_millis(50), session.send_message("Hi")).await;
    assert!(dropped.is_err());
    assert!(!session.is_loading());
    assert_eq!(session.turn_count(), 1);
}
