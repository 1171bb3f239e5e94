use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use llm_usage_hook::{
    host::{ConsoleNotifier, FileStore},
    models::{HostRequest, HostResponse},
    services::{notify::format_duration_ms, StatsStore, UsageHook},
};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "llm-usage-hook")]
#[command(about = "Per-request LLM latency, token usage and record-count tracking")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the data directory holding the persistent store
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Show about information including version and build details
    #[arg(long)]
    about: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the request-phase handler for one exchange
    Request {
        /// Upstream request URL
        #[arg(long)]
        url: String,
        /// Host-assigned request id; omit to exercise the NO_ID fallback
        #[arg(long)]
        id: Option<String>,
        /// Request body file; stdin when omitted
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
    /// Run the response-phase handler for one exchange
    Response {
        /// Upstream request URL
        #[arg(long)]
        url: String,
        /// Host-assigned request id matching the request phase
        #[arg(long)]
        id: Option<String>,
        /// Response body file; stdin when omitted
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
    /// Show accumulated per platform+model statistics
    Stats,
    /// Clear accumulated statistics
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.about {
        show_about();
        return Ok(());
    }

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("llm-usage-hook"),
    };
    let store = FileStore::new(&data_dir)
        .with_context(|| format!("failed to open data dir {}", data_dir.display()))?;
    let notifier = ConsoleNotifier;
    let hook = UsageHook::new(&store, &notifier);

    match cli.command {
        Some(Commands::Request { url, id, body_file }) => {
            let body = read_body(body_file.as_deref())?;
            let outcome = hook.handle_request(&HostRequest { url, body, id });
            log::debug!("request phase outcome: {outcome:?}");
        }
        Some(Commands::Response { url, id, body_file }) => {
            let body = read_body(body_file.as_deref())?;
            let outcome = hook.handle_response(
                &HostRequest {
                    url,
                    body: String::new(),
                    id,
                },
                &HostResponse { body },
            );
            log::debug!("response phase outcome: {outcome:?}");
        }
        Some(Commands::Stats) => show_stats(&store),
        Some(Commands::Reset) => {
            StatsStore::new(&store).reset();
            println!("Statistics cleared.");
        }
        None => {
            println!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

fn read_body(body_file: Option<&std::path::Path>) -> Result<String> {
    match body_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read body file {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("failed to read body from stdin")?;
            Ok(body)
        }
    }
}

fn show_stats(store: &FileStore) {
    let history = StatsStore::new(store).read_history();
    if history.by_key.is_empty() {
        println!("No statistics recorded yet.");
        return;
    }

    let mut keys: Vec<&String> = history.by_key.keys().collect();
    keys.sort();

    for key in keys {
        let record = &history.by_key[key];
        println!("{} / {}", record.platform, record.model);
        println!("  requests:     {}", record.request_count);
        println!(
            "  avg duration: {}",
            format_duration_ms(Some(record.avg_ms))
        );
        println!("  records:      {}", record.total_records);
        println!("  tokens:       {}", record.total_tokens);
        println!(
            "  updated:      {}",
            record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!();
    }
}

fn show_about() {
    println!("llm-usage-hook v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("Build time: {}", env!("LLM_USAGE_HOOK_BUILD_TIME"));
    println!("Build ID:   {}", env!("LLM_USAGE_HOOK_BUILD_ID"));
    if let Some(hash) = option_env!("LLM_USAGE_HOOK_GIT_HASH") {
        println!("Git commit: {hash}");
    }
}
