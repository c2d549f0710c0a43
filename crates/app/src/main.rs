mod demo;
mod identity;
mod logging;
mod play;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use backend::{Backend, RpcConfig};
use services::{AppServices, Clock, QueueConfig, Telemetry};
use ui::views::render_history;
use ui::vm::map_history_rows;

use crate::identity::FileIdentityStore;
use crate::logging::{LogConfig, init_logging};

const DEFAULT_IDENTITY_FILE: &str = ".split/device-id";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLookahead { raw: String },
    NoBackend,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLookahead { raw } => write!(f, "invalid --lookahead value: {raw}"),
            ArgsError::NoBackend => write!(
                f,
                "no backend configured: set SPLIT_API_URL and SPLIT_API_KEY, or pass --demo"
            ),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  split [play]  [options]   answer questions (default)");
    eprintln!("  split history [options]   list past votes, newest first");
    eprintln!("  split reset   [options]   forget this device and start over");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --demo                    use built-in sample questions, no network");
    eprintln!("  --api-url <url>           backend base URL");
    eprintln!("  --api-key <key>           backend anon key");
    eprintln!("  --identity-file <path>    where the device id is kept");
    eprintln!("  --lookahead <n>           questions to keep prefetched (default 1)");
    eprintln!("  -v, -vv, -vvv             more logging (RUST_LOG overrides)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SPLIT_API_URL, SPLIT_API_KEY, SPLIT_API_TIMEOUT_SECS, SPLIT_IDENTITY_FILE");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    History,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "history" => Some(Self::History),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    demo: bool,
    api_url: Option<String>,
    api_key: Option<String>,
    identity_file: PathBuf,
    lookahead: usize,
    verbosity: u8,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            demo: false,
            api_url: None,
            api_key: None,
            identity_file: std::env::var("SPLIT_IDENTITY_FILE")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_IDENTITY_FILE), PathBuf::from),
            lookahead: 1,
            verbosity: 0,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--demo" => parsed.demo = true,
                "--api-url" => parsed.api_url = Some(require_value(args, "--api-url")?),
                "--api-key" => parsed.api_key = Some(require_value(args, "--api-key")?),
                "--identity-file" => {
                    parsed.identity_file = PathBuf::from(require_value(args, "--identity-file")?);
                }
                "--lookahead" => {
                    let value = require_value(args, "--lookahead")?;
                    parsed.lookahead = value
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidLookahead { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if is_verbosity(flag) => {
                    let count = u8::try_from(flag.len() - 1).unwrap_or(u8::MAX);
                    parsed.verbosity = parsed.verbosity.saturating_add(count);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    /// Flags win over the environment; both URL and key are needed.
    fn rpc_config(&self) -> Option<RpcConfig> {
        let from_env = RpcConfig::from_env();
        let url = self
            .api_url
            .clone()
            .or_else(|| from_env.as_ref().map(|c| c.base_url.clone()))?;
        let key = self
            .api_key
            .clone()
            .or_else(|| from_env.as_ref().map(|c| c.api_key.clone()))?;
        let config = RpcConfig::new(url, key);
        Some(match from_env {
            Some(env) => config.with_timeout(env.timeout),
            None => config,
        })
    }
}

fn is_verbosity(flag: &str) -> bool {
    flag.len() > 1 && flag.starts_with('-') && flag[1..].chars().all(|c| c == 'v')
}

fn build_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    let store = Arc::new(FileIdentityStore::new(&args.identity_file));
    let telemetry = Telemetry::tracing();
    let config = QueueConfig::default().with_lookahead(args.lookahead);
    let clock = Clock::default_clock();

    if args.demo {
        tracing::info!("using built-in demo questions");
        let backend = Backend::in_memory(demo::demo_backend()?);
        return Ok(AppServices::new(backend, store, telemetry, config, clock));
    }

    let rpc = args.rpc_config().ok_or(ArgsError::NoBackend)?;
    tracing::info!(url = %rpc.base_url, "using hosted backend");
    Ok(AppServices::connect(rpc, store, telemetry, config, clock)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with('-') => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if argv.first().is_some_and(|first| !first.starts_with('-')) {
        argv.remove(0);
    }

    let args = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_logging(&LogConfig::from_verbosity(args.verbosity))?;

    let services = build_services(&args)?;
    match cmd {
        Command::Play => play::run(&services).await,
        Command::History => {
            let device = services.start().await?;
            let items = services.history().history(&device).await?;
            print!("{}", render_history(&map_history_rows(&items)));
            Ok(())
        }
        Command::Reset => {
            let device = services.devices().reset_identity().await?;
            println!("new device id: {device}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
