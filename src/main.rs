use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sluice_config::WorkflowDef;
use sluice_gateway::Gateway;
use sluice_runtime::{DEFAULT_TIMEOUT, HttpTask, Runtime, RuntimeConfig, TaskRegistry};
use sluice_store::{InMemoryRecordStore, RetryPolicy, RetryingStore, StoreOptions};
use sluice_workflow::Workflow;

mod settings;
mod tasks;

use settings::Settings;

/// Sluice - A synchronous workflow engine for document pipelines
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the settings file (default: <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Path to the data directory (default: ~/.sluice)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow once, reading the request body from stdin
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Execution ceiling in milliseconds
    #[arg(long, env = "SLUICE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Print the store contents to stderr after the run
    #[arg(long)]
    dump_store: bool,
  },

  /// Check that a workflow resolves and every task it calls is available
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sluice=info")))
    .with_writer(io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".sluice"),
  };
  let settings = match &cli.config {
    Some(path) => Settings::load(path, true)?,
    None => Settings::load(&data_dir.join("config.json"), false)?,
  };

  match cli.command {
    Some(Commands::Run {
      workflow_file,
      timeout_ms,
      dump_store,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(workflow_file, settings, timeout_ms, dump_store))?;
    }
    Some(Commands::Validate { workflow_file }) => {
      validate_workflow(&workflow_file, &settings)?;
    }
    None => {
      println!("sluice - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_workflow(workflow_file: &Path) -> Result<Workflow> {
  let workflow_content = std::fs::read_to_string(workflow_file)
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let workflow_def: WorkflowDef = serde_json::from_str(&workflow_content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  sluice_workflow::resolve(workflow_def).context("failed to resolve workflow")
}

/// Built-in tasks plus the HTTP tasks named in the settings.
fn task_registry(settings: &Settings) -> Result<TaskRegistry> {
  let client = reqwest::Client::new();
  let mut registry = tasks::builtin();
  for (name, url) in &settings.tasks {
    let task = HttpTask::new(client.clone(), url)
      .with_context(|| format!("invalid endpoint for task '{}'", name))?;
    registry.register(name.clone(), Arc::new(task));
  }
  Ok(registry)
}

fn validate_workflow(workflow_file: &Path, settings: &Settings) -> Result<()> {
  let workflow = load_workflow(workflow_file)?;
  let node_count = workflow.nodes().len();
  let name = workflow.name.clone();

  let store = Arc::new(InMemoryRecordStore::new(settings.table.clone()));
  Runtime::new(workflow, task_registry(settings)?, store, RuntimeConfig::default())
    .context("workflow cannot run")?;

  println!("workflow '{}' is valid ({} nodes)", name, node_count);
  Ok(())
}

async fn run_workflow(
  workflow_file: PathBuf,
  settings: Settings,
  timeout_ms: Option<u64>,
  dump_store: bool,
) -> Result<()> {
  let workflow = load_workflow(&workflow_file)?;
  tracing::info!(
    workflow_id = %workflow.workflow_id,
    nodes = workflow.nodes().len(),
    "workflow_loaded"
  );

  let body = read_body_from_stdin()?;

  let store_options = StoreOptions {
    require_existing: settings.store.require_existing,
  };
  let mut policy = RetryPolicy::exponential();
  if let Some(attempts) = settings.store.max_attempts {
    policy = policy.with_max_attempts(attempts);
  }
  let store = Arc::new(RetryingStore::new(
    InMemoryRecordStore::with_options(settings.table.clone(), store_options),
    policy,
  ));

  let timeout = timeout_ms
    .or(settings.timeout_ms)
    .map(Duration::from_millis)
    .unwrap_or(DEFAULT_TIMEOUT);

  let runtime = Runtime::new(
    workflow,
    task_registry(&settings)?,
    store.clone(),
    RuntimeConfig { timeout },
  )
  .context("failed to create runtime")?;

  let gateway = Gateway::new(Arc::new(runtime), settings.input_schema(), settings.response.clone());

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_interrupt.cancel();
    }
  });

  let response = gateway.handle(&body, cancel).await;

  println!("{}", serde_json::to_string_pretty(&response.body)?);

  if dump_store {
    let records = store.inner().records();
    eprintln!("{}", serde_json::to_string_pretty(&records)?);
  }

  if !response.is_success() {
    bail!("request failed with status {}", response.status);
  }
  Ok(())
}

fn read_body_from_stdin() -> Result<String> {
  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    return Ok("{}".to_string());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read request body from stdin")?;

  if input.trim().is_empty() {
    Ok("{}".to_string())
  } else {
    Ok(input)
  }
}
