mod edit;

use anyhow::Result;
use catwalk_core::{
    schema::validate_flow, EdgeSpec, ExecutionEvent, FlowDocument, NodeSpec,
};
use catwalk_runtime::{
    compile, FunctionRegistry, Graph, RunOptions, Runtime, RuntimeConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "catwalk")]
#[command(about = "CatWalk workflow framework CLI - Build and execute JSON workflows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON workflow
    Run {
        /// Path to the JSON workflow file
        path: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Save execution results to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validate and compile without running
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a JSON flow
    Validate {
        /// Path to the JSON workflow file
        path: PathBuf,

        /// Show detailed validation errors
        #[arg(long)]
        detailed: bool,
    },

    /// Node management commands
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },

    /// Edge management commands
    Edge {
        #[command(subcommand)]
        action: EdgeAction,
    },

    /// Initialize a new workflow
    Init {
        /// Path for the new workflow file
        path: PathBuf,

        /// Workflow template
        #[arg(long, value_enum, default_value_t = Template::Simple)]
        template: Template,
    },

    /// Show workflow information
    Info {
        /// Path to the JSON workflow file
        path: PathBuf,

        /// Show statistics
        #[arg(long)]
        stats: bool,
    },
}

#[derive(Subcommand)]
enum NodeAction {
    /// Add a new node
    Add {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        r#type: NodeType,
        #[arg(long)]
        name: String,
        #[arg(long)]
        func: Option<String>,
        /// Node position as JSON
        #[arg(long)]
        position: Option<String>,
        /// Additional node data as JSON
        #[arg(long)]
        data: Option<String>,
    },

    /// Update an existing node
    Update {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        r#type: Option<NodeType>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        func: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        data: Option<String>,
    },

    /// Remove a node
    Remove {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        id: String,
        /// Also remove connected edges
        #[arg(long)]
        cascade: bool,
    },

    /// List all nodes
    List {
        #[arg(short, long)]
        file: PathBuf,
        /// Filter by node type
        #[arg(long)]
        r#type: Option<String>,
        #[arg(long, value_enum, default_value_t = ListFormat::Simple)]
        format: ListFormat,
    },
}

#[derive(Subcommand)]
enum EdgeAction {
    /// Add a new edge
    Add {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        id: Option<String>,
        /// Edge style as JSON
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        animated: bool,
    },

    /// Remove an edge
    Remove {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        target: Option<String>,
    },

    /// List all edges
    List {
        #[arg(short, long)]
        file: PathBuf,
        /// Filter edges from this node
        #[arg(long)]
        from: Option<String>,
        /// Filter edges to this node
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum NodeType {
    Trigger,
    Extraction,
    Conditional,
    Execution,
}

impl NodeType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Extraction => "extraction",
            Self::Conditional => "conditional",
            Self::Execution => "execution",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ListFormat {
    Table,
    Json,
    Simple,
}

impl ListFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Simple => "simple",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Template {
    Simple,
    Reactflow,
    Complex,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            verbose,
            output,
            dry_run,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::WARN
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_workflow(path, verbose, output, dry_run).await?;
        }

        Commands::Validate { path, detailed } => {
            validate_workflow(&path, detailed);
        }

        Commands::Node { action } => match action {
            NodeAction::Add {
                file,
                id,
                r#type,
                name,
                func,
                position,
                data,
            } => edit::node_add(
                &file,
                &id,
                r#type.as_str(),
                &name,
                func,
                position.as_deref(),
                data.as_deref(),
            )?,
            NodeAction::Update {
                file,
                id,
                r#type,
                name,
                func,
                position,
                data,
            } => edit::node_update(
                &file,
                &id,
                edit::NodeFields {
                    node_type: r#type.map(|t| t.as_str().to_string()),
                    name,
                    func,
                    position,
                    data,
                },
            )?,
            NodeAction::Remove { file, id, cascade } => {
                edit::node_remove(&file, &id, cascade)?
            }
            NodeAction::List {
                file,
                r#type,
                format,
            } => edit::node_list(&file, r#type.as_deref(), format.as_str())?,
        },

        Commands::Edge { action } => match action {
            EdgeAction::Add {
                file,
                source,
                target,
                id,
                style,
                animated,
            } => edit::edge_add(&file, &source, &target, id, style.as_deref(), animated)?,
            EdgeAction::Remove {
                file,
                id,
                source,
                target,
            } => edit::edge_remove(&file, id.as_deref(), source.as_deref(), target.as_deref())?,
            EdgeAction::List { file, from, to } => {
                edit::edge_list(&file, from.as_deref(), to.as_deref())?
            }
        },

        Commands::Init { path, template } => {
            create_workflow(&path, template)?;
        }

        Commands::Info { path, stats } => {
            show_info(&path, stats)?;
        }
    }

    Ok(())
}

async fn run_workflow(
    path: PathBuf,
    verbose: bool,
    output: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    println!("🚀 Loading workflow from: {}", path.display());

    let flow = edit::load_flow(&path)?;
    if verbose || dry_run {
        println!("✅ Flow validation passed.");
        println!("   Nodes: {}", flow.nodes.len());
        println!("   Edges: {}", flow.edges.len());
    }

    let graph = Graph::new(flow.nodes, &flow.edges)?;
    let order = compile(&graph);

    if dry_run {
        println!("🔍 Dry run complete - workflow is valid");
        println!("   Execution order: {}", serde_json::to_string(&order)?);
        return Ok(());
    }

    let mut registry = FunctionRegistry::new();
    catwalk_functions::register_all(&mut registry);
    let runtime = Runtime::with_registry(Arc::new(registry), RuntimeConfig::default());

    // Ctrl-C stops the run before the next node starts.
    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n⏹️  Cancelling run...");
            ctrl_c_token.cancel();
        }
    });

    let event_task = if verbose {
        let mut events = runtime.subscribe_events();
        Some(tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    ExecutionEvent::RunStarted { node_count, .. } => {
                        println!("▶️  Executing flow ({node_count} nodes)");
                    }
                    ExecutionEvent::NodeStarted {
                        node_id, node_type, ..
                    } => {
                        println!("  ⚡ Starting node: {node_id} ({node_type})");
                    }
                    ExecutionEvent::NodeCompleted {
                        node_id,
                        duration_ms,
                        ..
                    } => {
                        println!("  ✅ Node {node_id} completed in {duration_ms}ms");
                    }
                    ExecutionEvent::NodeFailed { node_id, error, .. } => {
                        println!("  ❌ Node {node_id} failed: {error}");
                    }
                    ExecutionEvent::RunCompleted {
                        success,
                        duration_ms,
                        ..
                    } => {
                        if success {
                            println!("✨ Flow completed successfully in {duration_ms}ms");
                        } else {
                            println!("💥 Flow failed after {duration_ms}ms");
                        }
                        break;
                    }
                }
            }
        }))
    } else {
        None
    };

    let options = RunOptions {
        seed: None,
        cancellation,
    };
    let result = runtime.run(&order, graph.nodes_by_id(), options).await;

    if let Some(task) = event_task {
        let _ = task.await;
    }

    let ctx = result?;
    let rendered = serde_json::to_string_pretty(&ctx)?;
    println!("{rendered}");

    if let Some(output) = output {
        std::fs::write(&output, rendered)?;
        println!("✅ Results saved to '{}'", output.display());
    }

    Ok(())
}

fn validate_workflow(path: &PathBuf, detailed: bool) {
    println!("🔍 Validating workflow: {}", path.display());

    let outcome = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|text| Ok(serde_json::from_str::<serde_json::Value>(&text)?))
        .and_then(|raw| Ok(validate_flow(&raw)?));

    match outcome {
        Ok(()) => println!("✅ Flow is valid."),
        Err(e) if detailed => {
            println!("❌ Validation failed:");
            println!("   Error: {e}");
            println!("   File: {}", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            println!("❌ Invalid flow: {e}");
            std::process::exit(1);
        }
    }
}

fn create_workflow(path: &PathBuf, template: Template) -> Result<()> {
    if path.exists() {
        anyhow::bail!("file '{}' already exists", path.display());
    }

    let flow = match template {
        Template::Simple => {
            let mut flow = FlowDocument::new();
            flow.add_node(
                NodeSpec::new("start", "trigger", "Start Node")
                    .with_func("|ctx| {'message': 'Hello World'}"),
            );
            flow
        }
        Template::Reactflow => {
            let mut flow = FlowDocument::new();
            flow.add_node(
                NodeSpec::new("start", "trigger", "Start Node")
                    .with_func("|ctx| {'data': [1, 2, 3]}")
                    .with_position(100.0, 100.0),
            );
            flow.add_node(
                NodeSpec::new("process", "extraction", "Process Data")
                    .with_func("|ctx| sum(ctx['start'].data)")
                    .with_position(300.0, 100.0),
            );
            let mut edge = EdgeSpec::between("start", "process");
            edge.id = Some("e1".to_string());
            flow.add_edge(edge);
            flow
        }
        Template::Complex => {
            let mut flow = FlowDocument::new();
            flow.add_node(
                NodeSpec::new("input", "trigger", "Data Input")
                    .with_func("|ctx| {'numbers': [1, 2, 3, 4, 5]}"),
            );
            flow.add_node(
                NodeSpec::new("validate", "conditional", "Validate Data")
                    .with_func("|ctx| len(ctx.input.numbers) > 0"),
            );
            flow.add_node(
                NodeSpec::new("process", "extraction", "Calculate Sum")
                    .with_func("|ctx| sum(ctx.input.numbers)"),
            );
            flow.add_node(
                NodeSpec::new("output", "execution", "Display Result")
                    .with_func("|ctx| 'Sum: ' + str(ctx.process)"),
            );
            flow.add_edge(EdgeSpec::between("input", "validate"));
            flow.add_edge(EdgeSpec::between("validate", "process"));
            flow.add_edge(EdgeSpec::between("process", "output"));
            flow
        }
    };

    edit::save_flow(path, &flow)?;
    println!("✨ Initialized workflow in '{}'", path.display());
    println!();
    println!("Run it with:");
    println!("  catwalk run {}", path.display());

    Ok(())
}

fn show_info(path: &PathBuf, stats: bool) -> Result<()> {
    let flow = edit::load_flow(path)?;

    println!("📊 Workflow Information");
    println!("   Nodes: {}", flow.nodes.len());
    println!("   Edges: {}", flow.edges.len());

    if stats {
        let mut node_types: Vec<(String, usize)> = Vec::new();
        for node in &flow.nodes {
            match node_types.iter_mut().find(|(t, _)| *t == node.node_type) {
                Some((_, count)) => *count += 1,
                None => node_types.push((node.node_type.clone(), 1)),
            }
        }

        println!();
        println!("📈 Node Types:");
        for (node_type, count) in node_types {
            println!("   {node_type}: {count}");
        }
    }

    Ok(())
}
