//! Feedback reconciler and assistant facade.

mod common;

use std::sync::Arc;

use common::{ScriptedEmbedder, build_index, engine, entry};
use helpdesk_rag::{
    Command, EvaluationLedger, Feedback, FeedbackAction, FeedbackLog, FeedbackLogEntry,
    FeedbackReconciler, FeedbackStatus, HelpdeskAssistant, Reconciliation, Reply,
};

fn embedder() -> ScriptedEmbedder {
    ScriptedEmbedder::new()
        .with("printer offline", [1.0, 0.0])
        .with("vpn drops", [0.0, 1.0])
        .with("printer broken", [0.8, 0.6])
        .with("vpn slow", [0.28, 0.96])
        .with("opposite", [-0.6, -0.8])
}

async fn assistant(log: Option<Arc<FeedbackLog>>) -> (HelpdeskAssistant, Arc<EvaluationLedger>) {
    let index = build_index(
        Arc::new(embedder()),
        vec![
            entry("1", "printer offline", "check the network cable"),
            entry("2", "vpn drops", "update the client"),
        ],
        100,
    )
    .await;
    let ledger = Arc::new(EvaluationLedger::new());
    let mut reconciler = FeedbackReconciler::new(ledger.clone());
    if let Some(log) = log {
        reconciler = reconciler.with_log(log);
    }
    let assistant =
        HelpdeskAssistant::new(Arc::new(engine(index, ledger.clone())), Arc::new(reconciler));
    (assistant, ledger)
}

#[tokio::test]
async fn solution_reply_carries_two_tagged_actions() {
    let (assistant, _) = assistant(None).await;

    let Reply::Solution(card) = assistant.on_user_text("u1", "printer broken").await.unwrap() else {
        panic!("expected a solution card");
    };
    assert_eq!(card.candidate_id, "1");
    assert_eq!(card.solution, "check the network cable");
    assert_eq!(card.actions.len(), 2);
    assert_eq!(card.actions[0].action.feedback, Feedback::Helpful);
    assert_eq!(card.actions[1].action.feedback, Feedback::NotHelpful);
    for reply_action in &card.actions {
        assert_eq!(reply_action.action.candidate_id, "1");
        assert_eq!(reply_action.action.token, Some(card.token));
    }
}

#[tokio::test]
async fn rejected_and_unmatched_queries_reply_with_text() {
    let (assistant, ledger) = assistant(None).await;

    assert!(matches!(assistant.on_user_text("u1", "bodoh").await.unwrap(), Reply::Text { .. }));
    assert!(matches!(assistant.on_user_text("u1", "opposite").await.unwrap(), Reply::Text { .. }));
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn interleaved_users_feedback_lands_on_their_own_queries() {
    let (assistant, ledger) = assistant(None).await;

    let Reply::Solution(first) = assistant.on_user_text("alice", "printer broken").await.unwrap()
    else {
        panic!("expected a solution card");
    };
    let Reply::Solution(_second) = assistant.on_user_text("bob", "vpn slow").await.unwrap() else {
        panic!("expected a solution card");
    };

    // alice answers after bob asked: the token keeps it on alice's record
    let helpful = first.actions[0].action.clone();
    let (_, outcome) = assistant.on_feedback_action("alice", &helpful).await.unwrap();
    assert!(matches!(outcome.reconciliation, Reconciliation::Applied { .. }));

    let records = ledger.records().await;
    assert_eq!(records[0].feedback, FeedbackStatus::Helpful);
    assert_eq!(records[1].feedback, FeedbackStatus::Pending);
}

#[tokio::test]
async fn tokenless_mismatched_feedback_is_ignored_not_failed() {
    let (assistant, ledger) = assistant(None).await;
    assistant.on_user_text("alice", "printer broken").await.unwrap();
    assistant.on_user_text("bob", "vpn slow").await.unwrap();

    // legacy payload for alice's answer now points at bob's record
    let stale = FeedbackAction::new(Feedback::Helpful, "1");
    let (reply, outcome) = assistant.on_feedback_action("alice", &stale).await.unwrap();

    assert!(matches!(reply, Reply::Text { .. }));
    assert!(matches!(outcome.reconciliation, Reconciliation::Ignored { .. }));
    assert!(ledger.records().await.iter().all(|r| r.feedback == FeedbackStatus::Pending));
}

#[tokio::test]
async fn every_feedback_event_is_appended_to_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(FeedbackLog::new(dir.path().join("evaluation_logs.jsonl")));
    let (assistant, _) = assistant(Some(log.clone())).await;

    let Reply::Solution(card) = assistant.on_user_text("42", "printer broken").await.unwrap() else {
        panic!("expected a solution card");
    };
    let (_, applied) = assistant.on_feedback_action("42", &card.actions[1].action).await.unwrap();
    let (_, repeated) = assistant.on_feedback_action("42", &card.actions[0].action).await.unwrap();

    assert!(applied.logged && repeated.logged);
    assert!(matches!(repeated.reconciliation, Reconciliation::Ignored { .. }));

    let content = std::fs::read_to_string(log.path()).unwrap();
    let entries: Vec<FeedbackLogEntry> =
        content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].user_id, "42");
    assert_eq!(entries[0].candidate_id, "1");
    assert_eq!(entries[0].feedback, Feedback::NotHelpful);
}

#[tokio::test]
async fn stats_command_reflects_feedback() {
    let (assistant, _) = assistant(None).await;
    let Reply::Solution(card) = assistant.on_user_text("u1", "vpn slow").await.unwrap() else {
        panic!("expected a solution card");
    };
    assistant.on_feedback_action("u1", &card.actions[0].action).await.unwrap();

    let stats = assistant.stats().await;
    assert_eq!(stats.total_queries, 1);
    assert_eq!(stats.precision_at_1, 1.0);

    let Reply::Text { text } = assistant.on_command(Command::Stats).await else {
        panic!("expected text");
    };
    assert!(text.contains("Total Queries: 1"));
    assert!(text.contains("MRR:"));
}
