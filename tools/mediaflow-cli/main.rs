use clap::{Parser, Subcommand};
use mediaflow::adapter::JobMode;
use mediaflow::compiler::{self, CompiledWorkflow};
use mediaflow::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Compiles media pipeline graphs into workflow definitions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a pipeline and check every node's configuration
    Validate {
        /// Path to the pipeline JSON file
        pipeline: PathBuf,
    },
    /// Compile a pipeline and print the workflow definition
    Compile {
        /// Path to the pipeline JSON file
        pipeline: PathBuf,
        /// Optional deployment context JSON; environment defaults otherwise
        #[arg(short, long)]
        context: Option<PathBuf>,
        /// Write the definition to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the full artifact (names plus definition)
        #[arg(long)]
        artifact: bool,
    },
    /// Compile a pipeline and print a readable listing of its states
    Explain {
        /// Path to the pipeline JSON file
        pipeline: PathBuf,
        #[arg(short, long)]
        context: Option<PathBuf>,
    },
    /// List the built-in adapters and their provider statuses
    Adapters,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let registry = Arc::new(AdapterRegistry::with_defaults());
    match cli.command {
        Command::Validate { pipeline } => run_validate(&pipeline, &registry),
        Command::Compile {
            pipeline,
            context,
            output,
            artifact,
        } => {
            let compiled = run_compile(&pipeline, context.as_ref(), registry);
            let json = if artifact {
                serde_json::to_string_pretty(&compiled)
                    .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize artifact: {}", e)))
            } else {
                compiled.definition.to_json_pretty()
            };
            match output {
                Some(path) => {
                    fs::write(&path, json).unwrap_or_else(|e| {
                        exit_with_error(&format!("Failed to write '{}': {}", path.display(), e))
                    });
                    println!("Workflow '{}' written to {}", compiled.workflow_name, path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Explain { pipeline, context } => {
            let compiled = run_compile(&pipeline, context.as_ref(), registry);
            println!("{}", compiled.explain());
        }
        Command::Adapters => run_adapters(&registry),
    }
}

fn init_logging(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_pipeline(path: &PathBuf) -> Pipeline {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read pipeline '{}': {}", path.display(), e))
    });
    Pipeline::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load pipeline: {}", e)))
}

fn load_context(path: Option<&PathBuf>) -> DeploymentContext {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read context '{}': {}", path.display(), e))
            });
            DeploymentContext::from_json(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse context JSON: {}", e)))
        }
        None => DeploymentContext::from_env(),
    }
}

fn run_validate(path: &PathBuf, registry: &AdapterRegistry) {
    let pipeline = load_pipeline(path);
    let graph = PipelineGraph::validate(&pipeline, registry)
        .unwrap_or_else(|e| exit_with_error(&format!("Validation failed: {}", e)));
    compiler::precheck(&graph, registry)
        .unwrap_or_else(|e| exit_with_error(&format!("Validation failed: {}", e)));

    println!("Pipeline '{}' is valid ({} nodes)", graph.name(), graph.len());
    println!("Execution order: {}", graph.topological_ids().join(" -> "));
}

fn run_compile(
    path: &PathBuf,
    context: Option<&PathBuf>,
    registry: Arc<AdapterRegistry>,
) -> CompiledWorkflow {
    let pipeline = load_pipeline(path);
    let context = load_context(context);

    let start = Instant::now();
    let compiled = Compiler::builder(pipeline, registry)
        .with_context(context)
        .build()
        .compile()
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
    tracing::info!(elapsed = ?start.elapsed(), "compilation finished");
    compiled
}

fn run_adapters(registry: &AdapterRegistry) {
    for kind in registry.kinds() {
        let Ok(adapter) = registry.resolve(kind) else {
            continue;
        };
        let mode = match adapter.mode() {
            JobMode::Sync => "sync",
            JobMode::Async => "async",
        };
        println!("{:<24} {:<6} ({})", kind, mode, adapter.status_table().provider());
        for (status, canonical) in adapter.status_table().entries() {
            println!(
                "    {:<24} -> {} / {}",
                status, canonical.status, canonical.result
            );
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
