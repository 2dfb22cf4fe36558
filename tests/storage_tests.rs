mod common;

use agentflow::{
    EngineDatabase, Execution, ExecutionEngine, ExecutionRepository, ExecutionStatus,
    InMemoryAgentMemory, NodeExecutor, NoopEventSink, WorkflowRegistry,
};
use agentflow::runtime::INTERRUPTED_MESSAGE;
use common::{ScriptedInvoker, WorkflowBuilder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn engine_over(database: &EngineDatabase, registry: Arc<WorkflowRegistry>) -> ExecutionEngine {
    let executor = Arc::new(NodeExecutor::new(
        Arc::new(ScriptedInvoker::new()),
        Arc::new(InMemoryAgentMemory::default()),
    ));
    ExecutionEngine::new(
        registry,
        Arc::new(database.execution_store()),
        executor,
        Arc::new(NoopEventSink),
    )
}

#[tokio::test]
async fn test_workflow_storage_round_trip() {
    let dir = TempDir::new().unwrap();
    let database = EngineDatabase::open(dir.path()).await.unwrap();
    let storage = database.workflow_storage();

    let workflow = WorkflowBuilder::new("research")
        .node("plan")
        .node("write")
        .labelled_edge("plan", "write", "outline")
        .parallel()
        .build();
    storage.save_workflow(&workflow).await.unwrap();

    let loaded = storage.get_workflow("research").await.unwrap().unwrap();
    assert_eq!(loaded, workflow);

    let listed = storage.list_workflows().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "research");
    assert_eq!(listed[0].execution_mode, "parallel");
    assert_eq!(listed[0].node_count, 2);
    assert_eq!(listed[0].edge_count, 1);

    assert!(storage.delete_workflow("research").await.unwrap());
    assert!(!storage.delete_workflow("research").await.unwrap());
    assert!(storage.get_workflow("research").await.unwrap().is_none());
}

#[tokio::test]
async fn test_registry_reloads_definitions_from_disk() {
    let dir = TempDir::new().unwrap();

    {
        let database = EngineDatabase::open(dir.path()).await.unwrap();
        let registry = WorkflowRegistry::new(database.workflow_storage());
        registry
            .register(WorkflowBuilder::new("wf").node("a").build())
            .await
            .unwrap();
    }

    let database = EngineDatabase::open(dir.path()).await.unwrap();
    let registry = WorkflowRegistry::new(database.workflow_storage());
    assert!(registry.get_workflow("wf").is_none());

    registry.init_from_storage().await.unwrap();
    let workflow = registry.get_workflow("wf").unwrap();
    assert_eq!(workflow.nodes.len(), 1);
    assert_eq!(registry.list_workflow_ids(), vec!["wf"]);
}

#[tokio::test]
async fn test_execution_store_queries() {
    let database = EngineDatabase::in_memory().await.unwrap();
    let store = database.execution_store();

    let older = Execution::new("wf", json!({ "n": 1 }));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let mut newer = Execution::new("wf", json!({ "n": 2 }));
    newer.finish(ExecutionStatus::Completed);
    let other = Execution::new("other", json!({}));

    for execution in [&older, &newer, &other] {
        store.save(execution).await.unwrap();
    }

    assert_eq!(store.load(&older.id).await.unwrap().unwrap(), older);
    assert!(store.load("exec_missing").await.unwrap().is_none());

    let history = store.list_for_workflow("wf").await.unwrap();
    let ids: Vec<&str> = history.iter().map(|execution| execution.id.as_str()).collect();
    assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);

    let mut unfinished: Vec<String> = store
        .list_unfinished()
        .await
        .unwrap()
        .into_iter()
        .map(|execution| execution.id)
        .collect();
    unfinished.sort();
    let mut expected = vec![older.id.clone(), other.id.clone()];
    expected.sort();
    assert_eq!(unfinished, expected);

    // Saving again replaces the snapshot
    let mut finished = older.clone();
    finished.finish(ExecutionStatus::Failed);
    store.save(&finished).await.unwrap();
    assert_eq!(
        store.load(&older.id).await.unwrap().unwrap().status,
        ExecutionStatus::Failed
    );
}

#[tokio::test]
async fn test_finished_run_survives_restart() {
    let dir = TempDir::new().unwrap();
    let workflow = WorkflowBuilder::new("wf").node("a").node("b").edge("a", "b").build();

    let execution = {
        let database = EngineDatabase::open(dir.path()).await.unwrap();
        let registry = Arc::new(WorkflowRegistry::new(database.workflow_storage()));
        registry.register(workflow).await.unwrap();
        engine_over(&database, registry)
            .submit_run("wf", json!({ "topic": "sqlite" }))
            .await
            .unwrap()
    };

    let database = EngineDatabase::open(dir.path()).await.unwrap();
    let registry = Arc::new(WorkflowRegistry::new(database.workflow_storage()));
    registry.init_from_storage().await.unwrap();
    let engine = engine_over(&database, registry);

    let stored = engine.get_execution(&execution.id).await.unwrap();
    assert_eq!(stored.status, ExecutionStatus::Completed);
    assert_eq!(stored.results.len(), 2);
    assert_eq!(stored, execution);

    let history = engine.list_executions("wf").await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_recover_interrupted_fails_abandoned_runs() {
    let database = EngineDatabase::in_memory().await.unwrap();
    let store = database.execution_store();

    let running = Execution::new("wf", json!({}));
    let mut paused = Execution::new("wf", json!({}));
    paused.status = ExecutionStatus::Paused;
    let mut completed = Execution::new("wf", json!({}));
    completed.finish(ExecutionStatus::Completed);
    for execution in [&running, &paused, &completed] {
        store.save(execution).await.unwrap();
    }

    let engine = engine_over(&database, Arc::new(WorkflowRegistry::in_memory()));
    let recovered = engine.recover_interrupted().await.unwrap();
    assert_eq!(recovered.len(), 2);

    for id in [&running.id, &paused.id] {
        let execution = store.load(id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.error.as_deref(), Some(INTERRUPTED_MESSAGE));
        assert!(execution.completed_at.is_some());
    }
    assert_eq!(store.load(&completed.id).await.unwrap().unwrap(), completed);

    assert!(engine.recover_interrupted().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_reload_picks_up_stored_edits() {
    let database = EngineDatabase::in_memory().await.unwrap();
    let storage = database.workflow_storage();
    let registry = WorkflowRegistry::new(storage.clone());

    registry
        .register(WorkflowBuilder::new("wf").node("a").build())
        .await
        .unwrap();
    storage
        .save_workflow(&WorkflowBuilder::new("wf").node("a").node("b").edge("a", "b").build())
        .await
        .unwrap();
    assert_eq!(registry.get_workflow("wf").unwrap().nodes.len(), 1);

    registry.reload_workflow("wf").await.unwrap();
    assert_eq!(registry.get_workflow("wf").unwrap().nodes.len(), 2);

    assert!(registry.reload_workflow("missing").await.is_err());
    assert!(WorkflowRegistry::in_memory().reload_workflow("wf").await.is_err());
}

#[tokio::test]
async fn test_engine_can_read_definitions_straight_from_storage() {
    let database = EngineDatabase::in_memory().await.unwrap();
    let storage = database.workflow_storage();
    storage
        .save_workflow(&WorkflowBuilder::new("wf").node("a").node("b").edge("a", "b").parallel().build())
        .await
        .unwrap();

    let executor = Arc::new(NodeExecutor::new(
        Arc::new(ScriptedInvoker::new()),
        Arc::new(InMemoryAgentMemory::default()),
    ));
    let engine = ExecutionEngine::new(
        Arc::new(storage),
        Arc::new(database.execution_store()),
        executor,
        Arc::new(NoopEventSink),
    );

    let execution = engine.submit_run("wf", json!({})).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.results.len(), 2);

    let err = engine.submit_run("missing", json!({})).await.unwrap_err();
    assert!(err.is_not_found());
}
