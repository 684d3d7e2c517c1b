use clap::{Args, Parser, Subcommand};
use flexi_logger::Logger;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

use wsperf::config::{ConfigOverrides, FileConfig, RunConfig};
use wsperf::constants::{EXIT_FATAL, EXIT_SUCCESS};
use wsperf::errors::WsPerfError;
use wsperf::{runner, summary};

#[derive(Parser, Debug)]
#[command(name = "wsperf", version, about = "WebSocket round-trip benchmark client")]
struct Cli {
    /// Log specification, e.g. `info` or `wsperf=debug`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the benchmark against a lower-case endpoint and record the result
    Test(TestArgs),
    /// Print a table of recorded results (files or directories)
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
struct TestArgs {
    /// TOML file using the `number.of.clients`, `server.host`, ... keys
    #[arg(long)]
    config: Option<PathBuf>,

    /// number.of.clients
    #[arg(long)]
    clients: Option<usize>,

    /// number.of.messages
    #[arg(long)]
    messages: Option<usize>,

    /// server.host
    #[arg(long)]
    host: Option<String>,

    /// server.port
    #[arg(long)]
    port: Option<u16>,

    /// server.path
    #[arg(long)]
    path: Option<String>,

    /// Seconds allowed for each phase
    #[arg(long)]
    timeout: Option<u64>,

    /// Pause between rounds, e.g. `100ms`, `2s` or `PT0.5S`
    #[arg(long)]
    message_interval: Option<String>,

    #[arg(long)]
    results_dir: Option<PathBuf>,
}

impl From<&TestArgs> for ConfigOverrides {
    fn from(args: &TestArgs) -> Self {
        ConfigOverrides {
            number_of_clients: args.clients,
            number_of_messages: args.messages,
            server_host: args.host.clone(),
            server_port: args.port,
            server_path: args.path.clone(),
            timeout_secs: args.timeout,
            message_interval: args.message_interval.clone(),
            results_dir: args.results_dir.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logger = Logger::try_with_str(&cli.log_level)
        .and_then(|op| op.log_to_stderr().start())
        .ok();

    let result = match cli.command {
        Command::Test(args) => run_test(&args).await,
        Command::Summary(args) => run_summary(&args),
    };
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run_test(args: &TestArgs) -> Result<u8, WsPerfError> {
    let file = args.config.as_ref().map(FileConfig::load).transpose()?;
    let config = RunConfig::resolve(file, args.into())?;
    let report = runner::run(&config).await?;
    Ok(report.exit_code())
}

fn run_summary(args: &SummaryArgs) -> Result<u8, WsPerfError> {
    if let Some(table) = summary::summarize(&args.paths)? {
        print!("{table}");
    }
    Ok(EXIT_SUCCESS)
}
