// crates/linkcli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use linkcore::{Chain, ChainConfig, ChainEvent, ErrorMode, NodeArgs, Transition, Value, ERROR_EVENT};
use linknodes::{DeadlineNode, DebugNode, Field, HttpNode, SuccessStatus, TickerNode, TICK_EVENT};
use linkruntime::{ChainRuntime, RunOutcome, RuntimeConfig, WiringGraph};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "link")]
#[command(about = "Linked event chain CLI", long_about = None)]
struct Cli {
    /// Show debug logs and every tick
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Deliver the first error to "error" listeners before halting
    #[arg(long, global = true)]
    deliver_errors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a deadline driven by a ticker
    Deadline {
        /// Seconds until the deadline fires
        #[arg(short, long, default_value_t = 3)]
        seconds: u64,

        /// Tick period in milliseconds
        #[arg(short, long, default_value_t = 1000)]
        tick_ms: u64,
    },

    /// Fetch a URL through a terminal HTTP node
    Fetch {
        #[arg(short, long)]
        url: String,

        #[arg(short, long, default_value = "GET")]
        method: String,
    },

    /// Print the wiring of the sample chains as Graphviz DOT
    Graph,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = if cli.deliver_errors {
        ChainConfig::default().with_error_mode(ErrorMode::DeliverFirst)
    } else {
        ChainConfig::default()
    };

    match cli.command {
        Commands::Deadline { seconds, tick_ms } => {
            run_deadline(config, seconds, tick_ms, cli.verbose).await?;
        }
        Commands::Fetch { url, method } => {
            run_fetch(config, url, method, cli.verbose).await?;
        }
        Commands::Graph => {
            print_graph(config);
        }
    }

    Ok(())
}

/// Ticker plus a deadline routed to a debug node.
fn deadline_chain(chain: &Chain<()>, seconds: u64, tick_ms: u64) {
    TickerNode::new(chain, NodeArgs::new("ticker"), Duration::from_millis(tick_ms.max(1)));
    DeadlineNode::new(
        chain,
        NodeArgs::new("deadline")
            .with_name("Deadline")
            .with_transition(Transition::always("expired")),
        Duration::from_secs(seconds),
    );
    DebugNode::new(chain, NodeArgs::new("expired").with_name("Expired"));
}

/// Terminal HTTP node whose successful responses continue to `response`.
fn fetch_chain(chain: &Chain<()>) {
    HttpNode::new(
        chain,
        NodeArgs::new("fetch")
            .with_name("Fetch")
            .with_transition(Transition::new(SuccessStatus, "body", Field::new("body")))
            .with_transition(Transition::always("response")),
    );
    DebugNode::new(chain, NodeArgs::new("body").with_name("Body"));
}

fn report_errors(chain: &Chain<()>) {
    chain.subscribe(ERROR_EVENT, |_chain, payload: Value| async move {
        println!("  ❌ Error: {}", payload.as_str().unwrap_or("unknown"));
    });
}

/// Print monitor events while a run is in progress.
fn watch(chain: &Chain<()>, verbose: bool) -> JoinHandle<()> {
    let mut events = chain.monitor();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ChainEvent::Dispatched { event, .. } if event == TICK_EVENT && !verbose => {}
                ChainEvent::Dispatched { event, listeners, .. } => {
                    println!("  ⚡ {} ({} listeners)", event, listeners);
                }
                ChainEvent::Dropped { event } => {
                    println!("  ⚠️  Dropped: {}", event);
                }
                ChainEvent::Halted { reason } => {
                    println!("  💥 Halted: {}", reason);
                }
            }
        }
    })
}

async fn run_deadline(config: ChainConfig, seconds: u64, tick_ms: u64, verbose: bool) -> Result<()> {
    println!("⏱️  Deadline in {}s, ticking every {}ms", seconds, tick_ms);

    let chain = Chain::with_config((), config);
    deadline_chain(&chain, seconds, tick_ms);
    report_errors(&chain);
    let watcher = watch(&chain, verbose);

    let runtime = ChainRuntime::with_config(
        chain,
        RuntimeConfig {
            timeout: Some(Duration::from_secs(seconds + 5)),
            ..RuntimeConfig::default()
        },
    );
    let outcome = runtime.run(None, "expired").await;
    watcher.abort();

    summarize(outcome, "expired")
}

async fn run_fetch(config: ChainConfig, url: String, method: String, verbose: bool) -> Result<()> {
    println!("🌐 {} {}", method, url);

    let chain = Chain::with_config((), config);
    fetch_chain(&chain);
    report_errors(&chain);
    let watcher = watch(&chain, verbose);

    let payload = Value::object([("url", Value::from(url)), ("method", Value::from(method))]);
    let outcome = ChainRuntime::new(chain)
        .run(Some(("fetch", payload)), "response")
        .await;
    watcher.abort();

    summarize(outcome, "response")
}

fn print_graph(config: ChainConfig) {
    let chain = Chain::with_config((), config);
    deadline_chain(&chain, 3, 1000);
    fetch_chain(&chain);

    let graph = WiringGraph::from_chain(&chain);
    println!("{}", graph.to_dot());

    eprintln!("📋 {} events, {} edges", graph.events().len(), graph.edge_count());
    if graph.has_cycle() {
        eprintln!("⚠️  Wiring contains a cycle");
    }
    for event in graph.unrouted() {
        eprintln!("   • '{}' has no listeners", event);
    }
}

fn summarize(outcome: RunOutcome, event: &str) -> Result<()> {
    let value = outcome.into_result(event)?;
    println!();
    println!("✨ Completed");
    println!("{}", serde_json::to_string_pretty(&value.to_plain_json())?);
    Ok(())
}
