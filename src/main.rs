/// agentflow command line
///
/// Imports workflow definitions into the engine database, runs them with the echo
/// invoker and shows execution history.

use agentflow::{
    config::Config, BroadcastEventSink, EchoInvoker, EngineDatabase, EventSink, ExecutionEngine,
    ExecutionMode, InMemoryAgentMemory, NodeExecutor, TracingEventSink, Workflow,
    WorkflowRegistry,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentflow")]
#[command(about = "Run dependency-ordered agent workflows")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, env = "AGENTFLOW_DATA_DIR", help = "Directory holding agentflow.db")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a workflow definition (JSON) into the database
    Import {
        #[arg(help = "Path to workflow JSON file")]
        file: PathBuf,
    },

    /// Run a stored workflow and print the final execution
    Run {
        workflow_id: String,

        #[arg(long, default_value = "{}", help = "Initial context as JSON")]
        context: String,

        #[arg(long, help = "Override the workflow's execution mode (sequential|parallel)")]
        mode: Option<ExecutionMode>,
    },

    /// List executions of a workflow, newest first
    History { workflow_id: String },

    /// List stored workflows
    Workflows,

    /// Fail executions left running or paused by a crashed process
    ///
    /// Only safe while no other agentflow process is driving runs on the same database.
    Recover,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = Config::default();
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| PathBuf::from(&config.database.data_dir));

    let database = EngineDatabase::open(&data_dir).await?;
    let registry = Arc::new(WorkflowRegistry::new(database.workflow_storage()));
    registry.init_from_storage().await?;

    let executor = Arc::new(NodeExecutor::new(
        Arc::new(EchoInvoker),
        Arc::new(InMemoryAgentMemory::new(config.engine.memory_max_entries)),
    ));
    let events = Arc::new(BroadcastEventSink::new(config.engine.event_capacity));
    let mut rx = events.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => TracingEventSink.emit(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("⚠️ Event log lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let engine = ExecutionEngine::new(
        registry.clone(),
        Arc::new(database.execution_store()),
        executor,
        events,
    );

    match args.command {
        Commands::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let workflow: Workflow = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            let workflow_id = workflow.id.clone();
            registry.register(workflow).await?;
            tracing::info!("📋 Imported workflow '{}'", workflow_id);
        }
        Commands::Run { workflow_id, context, mode } => {
            let context: serde_json::Value =
                serde_json::from_str(&context).context("--context must be valid JSON")?;

            if let Some(mode) = mode {
                let mut workflow = registry
                    .get_workflow(&workflow_id)
                    .map(|workflow| (*workflow).clone())
                    .with_context(|| format!("workflow not found: {}", workflow_id))?;
                workflow.config.execution_mode = mode;
                registry.insert(workflow);
            }

            let execution = engine.submit_run(&workflow_id, context).await?;
            println!("{}", serde_json::to_string_pretty(&execution)?);
        }
        Commands::History { workflow_id } => {
            for execution in engine.list_executions(&workflow_id).await? {
                println!("{}\t{}\t{}\t{} results\t{} errors",
                    execution.id, execution.status, execution.started_at.to_rfc3339(),
                    execution.results.len(), execution.errors.len());
            }
        }
        Commands::Recover => {
            let recovered = engine.recover_interrupted().await?;
            for execution in &recovered {
                println!("{}\t{}\tfailed", execution.id, execution.workflow_id);
            }
            tracing::info!("♻️ Recovered {} interrupted executions", recovered.len());
        }
        Commands::Workflows => {
            for workflow in database.workflow_storage().list_workflows().await? {
                println!("{}\t{}\t{}\t{} nodes\t{}",
                    workflow.id, workflow.name, workflow.execution_mode,
                    workflow.node_count, workflow.updated_at);
            }
        }
    }

    // Closing the channel lets the event log drain and stop
    drop(engine);
    let _ = event_log.await;

    Ok(())
}
