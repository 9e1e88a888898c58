//! Integration tests for the capability runners wired up from configuration,
//! with events shipped through a transport.

mod common;

use common::*;
use hk_core::agents::{AgentInput, AgentRunner, MockAgent};
use hk_core::backend::{ChatModelInput, ChatModelRunner};
use hk_core::config::load_config;
use hk_core::context::RunOptions;
use hk_core::emitter::{ChildOptions, Emitter, EmitterOptions};
use hk_core::errors::ErrorKind;
use hk_core::retry::RetryOptions;
use hk_core::tools::ToolRunner;
use hk_core::transport::{attach_transport, ChannelTransport};
use hk_protocol::Message;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const FAST_RETRIES: &str = r#"
[retry]
max_retries = 2
factor = 1.0
base_delay_ms = 1

[agent]
max_iterations = 3
max_retries_per_step = 3
total_max_retries = 2
"#;

#[tokio::test]
async fn test_agent_run_is_published_through_transport() {
    let project = create_test_project(FAST_RETRIES).expect("Failed to create test project");
    let config = load_config(project.path()).await.expect("Failed to load config");

    let root = Emitter::new_root();
    let (transport, mut rx) = ChannelTransport::new(64);
    attach_transport(&root, "*.*", Arc::new(transport), EmitterOptions::default()).unwrap();

    let agent = AgentRunner::with_emitter(Arc::new(MockAgent::success()), &root)
        .unwrap()
        .with_config(&config);
    let output = agent
        .run(AgentInput::new("hello"), RunOptions::default())
        .await
        .unwrap();
    assert_eq!(output.result, Message::assistant("Mock response"));

    let mut records = Vec::new();
    while let Ok(record) = rx.try_recv() {
        records.push(record);
    }
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["start", "update", "update", "success", "finish"]);
    assert!(records.iter().all(|r| r.path.starts_with("agent.mock.")));
    assert!(records.iter().all(|r| r.creator.as_deref() == Some("agent")));

    let run_id = records[0].trace.as_ref().map(|t| t.run_id.clone()).unwrap();
    assert!(records.iter().all(|r| r.belongs_to_run(&run_id)));
    assert_eq!(records[1].data["iteration"], json!(1));
    assert_eq!(records[2].data["is_final"], json!(true));
}

#[tokio::test]
async fn test_agent_budget_from_config() {
    let project = create_test_project(FAST_RETRIES).expect("Failed to create test project");
    let config = load_config(project.path()).await.expect("Failed to load config");

    let agent = MockAgent::failing();
    let runner = AgentRunner::with_emitter(Arc::new(agent.clone()), &Emitter::new_root())
        .unwrap()
        .with_config(&config);
    let error = runner
        .run(AgentInput::new("hello"), RunOptions::default())
        .await
        .unwrap_err();

    // The third failure of the first step exceeds the global budget of 2.
    assert_eq!(error.kind(), ErrorKind::RetryExhausted);
    assert_eq!(agent.calls(), 3);
}

#[tokio::test]
async fn test_chat_model_retries_from_config() {
    let project = create_test_project(FAST_RETRIES).expect("Failed to create test project");
    let config = load_config(project.path()).await.expect("Failed to load config");

    let model = Arc::new(EchoChatModel::new(2));
    let runner = ChatModelRunner::with_emitter(model.clone(), &Emitter::new_root())
        .unwrap()
        .with_retry(config.retry.to_options());
    let output = runner
        .create(
            ChatModelInput::new(vec![Message::user("ping")]),
            RunOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(output.text(), "ping");
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_tool_retry_events_reach_root() {
    let root = Emitter::new_root();
    let recorder = Recorder::new();
    recorder.attach(&root, "root", "*.*");

    let tool = Arc::new(ScriptedTool::new("echo", 1));
    let runner = ToolRunner::with_emitter(tool.clone(), &root)
        .unwrap()
        .with_retry(RetryOptions::new(1).with_base_delay(Duration::from_millis(1)));
    let output = runner
        .run(json!({"q": 1}), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(output.result, json!({"q": 1}));
    assert_eq!(tool.calls(), 2);
    assert_eq!(
        recorder.paths(),
        vec![
            "tool.echo.start",
            "tool.echo.retry",
            "tool.echo.success",
            "tool.echo.finish"
        ]
    );
}

#[tokio::test]
async fn test_slow_tool_times_out() {
    let runner = ToolRunner::with_emitter(
        Arc::new(SlowTool {
            delay: Duration::from_secs(10),
        }),
        &Emitter::new_root(),
    )
    .unwrap();
    let error = runner
        .run(
            json!(null),
            RunOptions::default().with_timeout(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
    assert!(error.is_abort());
    assert_eq!(error.message(), "The operation has timed out.");
}

#[tokio::test]
async fn test_runner_under_dropped_intermediate_emitter_reaches_root() {
    let root = Emitter::new_root();
    let recorder = Recorder::new();
    recorder.attach(&root, "root", "*.*");

    let runner = AgentRunner::with_emitter(
        Arc::new(MockAgent::success()),
        &root.child(ChildOptions::namespace(["team"])).unwrap(),
    )
    .unwrap()
    .with_base_delay(Duration::from_millis(1));
    runner
        .run(AgentInput::new("hello"), RunOptions::default())
        .await
        .unwrap();

    let paths = recorder.paths();
    assert_eq!(paths.first().map(String::as_str), Some("team.agent.mock.start"));
    assert_eq!(paths.last().map(String::as_str), Some("team.agent.mock.finish"));
}
