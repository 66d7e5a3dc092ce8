use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use kdash_api::{init_base_path, Backend, ClientConfig};
use kdash_core::columns::{render_header, render_row, workload_columns};
use kdash_core::WorkloadInfo;
use kdash_live::{Dashboard, TracingNotifier, WatchOptions};
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "kdashctl", version, about = "CloneSet rollout dashboard CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Namespace (default: the backend's current namespace)
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    /// Dashboard backend base URL (overrides KDASH_BASE_URL)
    #[arg(long = "base-url", global = true)]
    base_url: Option<String>,

    /// Serve built-in demo CloneSets instead of calling a backend
    #[arg(long = "synthetic", global = true, action = ArgAction::SetTrue)]
    synthetic: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current and available namespaces
    Namespaces,
    /// List workloads once
    Ls,
    /// Follow the workload list and reprint it on every change
    Watch,
    /// Follow one workload
    Get {
        name: String,
        /// Stop reporting loading after this many milliseconds
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
}

fn init_tracing() {
    let env = std::env::var("KDASH_LOG").unwrap_or_else(|_| "info".to_string());
    let filter =
        tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KDASH_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid KDASH_METRICS_ADDR; expected host:port");
        }
    }
}

fn print_table(items: &[WorkloadInfo], all_namespaces: bool, output: Output) -> Result<()> {
    match output {
        Output::Human => {
            let cols = workload_columns(all_namespaces);
            println!("{}", render_header(&cols));
            for w in items {
                println!("{}", render_row(w, &cols));
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(items)?),
    }
    Ok(())
}

fn print_one(w: &WorkloadInfo, loading: bool, output: Output) -> Result<()> {
    match output {
        Output::Human if w.name().is_empty() => {
            println!("{}", if loading { "(loading)" } else { "(not found)" });
        }
        Output::Human => {
            let cols = workload_columns(true);
            println!("{}", render_header(&cols));
            println!("{}", render_row(w, &cols));
            for rs in &w.replica_sets {
                println!(
                    "  rev {:<4} {:<28} {}/{} ready  {}",
                    rs.revision,
                    rs.object_meta.name,
                    rs.status.ready_replicas,
                    rs.status.replicas,
                    rs.images.join(",")
                );
            }
        }
        Output::Json => println!("{}", serde_json::to_string(w)?),
    }
    Ok(())
}

async fn resolve_namespace(dash: &Dashboard, flag: Option<String>) -> String {
    if let Some(ns) = flag {
        return ns;
    }
    match dash.namespaces().await {
        Ok(info) if !info.namespace.is_empty() => info.namespace,
        _ => "default".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let mut cfg = ClientConfig::from_env();
    if let Some(url) = &cli.base_url {
        cfg.base_url = url.trim_end_matches('/').to_string();
    }
    cfg.synthetic |= cli.synthetic;
    init_base_path(&cfg.base_url);
    let backend = Backend::from_config(&cfg).context("building API client")?;
    let dash = Dashboard::from_backend(backend, Arc::new(TracingNotifier));

    match cli.command {
        Commands::Namespaces => {
            let info = dash.namespaces().await?;
            match cli.output {
                Output::Human => {
                    for ns in &info.available_namespaces {
                        let mark = if *ns == info.namespace { "*" } else { " " };
                        println!("{} {}", mark, ns);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&info)?),
            }
        }
        Commands::Ls => {
            let ns = resolve_namespace(&dash, cli.namespace).await;
            info!(ns = %ns, "ls invoked");
            let items = dash.list(&ns).await;
            print_table(&items, ns.is_empty(), cli.output)?;
        }
        Commands::Watch => {
            let ns = resolve_namespace(&dash, cli.namespace).await;
            info!(ns = %ns, "watch invoked");
            let mut sub = dash.watch_list(&ns);
            loop {
                tokio::select! {
                    more = sub.changed() => {
                        if !more {
                            warn!("subscription ended; exiting watch loop");
                            break;
                        }
                        let state = sub.state();
                        if matches!(cli.output, Output::Human) {
                            println!("--- epoch {} ({} workloads)", sub.epoch(), state.items.len());
                        }
                        print_table(&state.items, ns.is_empty(), cli.output)?;
                    }
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; shutting down watch loop");
                        break;
                    }
                }
            }
            sub.close();
        }
        Commands::Get { name, timeout_ms } => {
            let ns = resolve_namespace(&dash, cli.namespace).await;
            info!(ns = %ns, name = %name, "get invoked");
            let opts = WatchOptions {
                timeout: timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis).or(cfg.watch_timeout),
                ..Default::default()
            };
            let mut sub = dash.watch_one(&ns, &name, opts);
            loop {
                tokio::select! {
                    more = sub.changed() => {
                        if !more {
                            break;
                        }
                        let state = sub.state();
                        print_one(&state.entity, state.loading, cli.output)?;
                    }
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; stopping");
                        break;
                    }
                }
            }
            sub.close();
        }
    }

    Ok(())
}
