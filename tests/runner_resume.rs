use std::sync::Arc;
use std::sync::atomic::Ordering;

use routeloom::channels::errors::ErrorScope;
use routeloom::graphs::GraphBuilder;
use routeloom::reducers::{FieldPolicies, FieldPolicy};
use routeloom::runtimes::{AppRunner, Checkpointer, InMemoryCheckpointer, RunnerError, SessionInit};
use routeloom::state::VersionedState;
use routeloom::types::NodeKind;
use serde_json::json;

mod common;
use common::*;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

fn counter_policies() -> FieldPolicies {
    FieldPolicies::new()
        .with_field("first", FieldPolicy::overwrite(json!(0)))
        .with_field("second", FieldPolicy::overwrite(json!(0)))
        .with_field("third", FieldPolicy::overwrite(json!(0)))
        .with_field("route_idea", FieldPolicy::overwrite(json!("")))
}

fn chain_app(
    first: CountingNode,
    second: CountingNode,
    third: CountingNode,
) -> routeloom::app::App {
    GraphBuilder::new()
        .add_node(custom("first"), first)
        .add_node(custom("second"), second)
        .add_node(custom("third"), third)
        .add_edge(NodeKind::Start, custom("first"))
        .add_edge(custom("first"), custom("second"))
        .add_edge(custom("second"), custom("third"))
        .add_edge(custom("third"), NodeKind::End)
        .with_field_policies(counter_policies())
        .compile()
        .unwrap()
}

#[tokio::test]
async fn resume_after_crash_skips_completed_steps() {
    let first = CountingNode::new("first");
    let second = CountingNode::new("second");
    let third = CountingNode::new("third");
    let first_runs = first.executions.clone();
    let second_runs = second.executions.clone();
    let third_runs = third.executions.clone();

    let checkpointer = Arc::new(InMemoryCheckpointer::new());
    let app = chain_app(first.clone(), second.clone(), third.clone());

    // First runner completes two steps and then "crashes" (is dropped).
    {
        let mut runner = AppRunner::with_checkpointer(app.clone(), checkpointer.clone());
        let init = runner
            .create_session("job".into(), state_with_user("go"))
            .await
            .unwrap();
        assert_eq!(init, SessionInit::Fresh);
        runner.run_step("job").await.unwrap();
        runner.run_step("job").await.unwrap();
    }
    assert_eq!(first_runs.load(Ordering::SeqCst), 1);
    assert_eq!(second_runs.load(Ordering::SeqCst), 1);
    assert_eq!(third_runs.load(Ordering::SeqCst), 0);

    // A fresh runner sharing the checkpointer resumes at step 2 and only
    // executes the remaining node.
    let mut runner = AppRunner::with_checkpointer(app, checkpointer);
    let init = runner
        .create_session("job".into(), VersionedState::empty())
        .await
        .unwrap();
    assert_eq!(init, SessionInit::Resumed { checkpoint_step: 2 });

    let final_state = runner.run_until_complete("job").await.unwrap();
    assert_eq!(first_runs.load(Ordering::SeqCst), 1);
    assert_eq!(second_runs.load(Ordering::SeqCst), 1);
    assert_eq!(third_runs.load(Ordering::SeqCst), 1);

    let snap = final_state.snapshot();
    assert_eq!(snap.extra.get("first"), Some(&json!(1)));
    assert_eq!(snap.extra.get("third"), Some(&json!(1)));
}

#[tokio::test]
async fn failed_node_is_retried_on_resume() {
    let app = GraphBuilder::new()
        .add_node(custom("ok"), CountingNode::new("first"))
        .add_node(custom("boom"), FailingNode)
        .add_edge(NodeKind::Start, custom("ok"))
        .add_edge(custom("ok"), custom("boom"))
        .add_edge(custom("boom"), NodeKind::End)
        .with_field_policies(counter_policies())
        .compile()
        .unwrap();

    let checkpointer = Arc::new(InMemoryCheckpointer::new());
    let mut runner = AppRunner::with_checkpointer(app.clone(), checkpointer.clone());
    runner
        .create_session("job".into(), state_with_user("go"))
        .await
        .unwrap();
    runner.run_step("job").await.unwrap();

    let err = runner.run_step("job").await.unwrap_err();
    match err {
        RunnerError::NodeRun { node, step, .. } => {
            assert_eq!(node, "boom");
            assert_eq!(step, 2);
        }
        other => panic!("expected NodeRun, got {other:?}"),
    }

    // The failure is recorded as data, scoped to the failing node.
    let snap = runner.get_session("job").unwrap().state.snapshot();
    assert_eq!(snap.errors.len(), 1);
    assert!(matches!(
        &snap.errors[0].scope,
        ErrorScope::Node { node, step: 2 } if node == "boom"
    ));

    // The failing patch was never checkpointed: a new runner resumes at
    // the failed node.
    let mut runner = AppRunner::with_checkpointer(app, checkpointer);
    let init = runner
        .create_session("job".into(), VersionedState::empty())
        .await
        .unwrap();
    assert_eq!(init, SessionInit::Resumed { checkpoint_step: 1 });
    let session = runner.get_session("job").unwrap();
    assert_eq!(session.current, custom("boom"));
}

#[tokio::test]
async fn resume_merges_the_callers_initial_patch() {
    let checkpointer = Arc::new(InMemoryCheckpointer::new());
    let app = chain_app(
        CountingNode::new("first"),
        CountingNode::new("second"),
        CountingNode::new("third"),
    );

    {
        let mut runner = AppRunner::with_checkpointer(app.clone(), checkpointer.clone());
        runner
            .create_session("job".into(), state_with_user("go"))
            .await
            .unwrap();
        runner.run_step("job").await.unwrap();
    }

    // Re-invoking the session with changed inputs merges them into the
    // restored state instead of dropping them.
    let mut runner = AppRunner::with_checkpointer(app, checkpointer.clone());
    let patch = VersionedState::builder()
        .with_user_message("actually, make it volcanic")
        .with_extra("route_idea", json!("Ring of Fire"))
        .build();
    let init = runner.create_session("job".into(), patch).await.unwrap();
    assert_eq!(init, SessionInit::Resumed { checkpoint_step: 1 });

    let snap = runner.get_session("job").unwrap().state.snapshot();
    assert_eq!(snap.extra.get("route_idea"), Some(&json!("Ring of Fire")));
    assert_eq!(snap.extra.get("first"), Some(&json!(1)));
    assert_eq!(
        snap.messages.last().unwrap().content,
        "actually, make it volcanic"
    );

    // The merged patch is checkpointed immediately.
    let cp = checkpointer.load_latest("job").await.unwrap().unwrap();
    assert_eq!(
        cp.state.snapshot().extra.get("route_idea"),
        Some(&json!("Ring of Fire"))
    );
}

#[tokio::test]
async fn unknown_session_is_an_error() {
    let app = chain_app(
        CountingNode::new("first"),
        CountingNode::new("second"),
        CountingNode::new("third"),
    );
    let mut runner = AppRunner::new(app).await;
    let err = runner.run_step("nope").await.unwrap_err();
    assert!(matches!(err, RunnerError::SessionNotFound { .. }));
}
