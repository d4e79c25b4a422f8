use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use host::{SessionEnd, TcpHost, run_local};
use log::{info, warn};
use services::{Clock, QuizService};
use storage::repository::Storage;

const DEFAULT_DATA: &str = "quizzes.json";
const DEFAULT_BIND: &str = "0.0.0.0:3030";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidData { raw: String },
    InvalidBind { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidData { raw } => write!(f, "invalid --data value: {raw:?}"),
            ArgsError::InvalidBind { raw } => write!(f, "invalid --bind value: {raw:?}"),
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
    eprintln!("  quiz [local] [--data <path|sqlite-url|:memory:>]");
    eprintln!("  quiz serve   [--data <path|sqlite-url|:memory:>] [--bind <addr>]");
    eprintln!("  quiz both    [--data <path|sqlite-url|:memory:>] [--bind <addr>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --data {DEFAULT_DATA}");
    eprintln!("  --bind {DEFAULT_BIND}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DATA, QUIZ_BIND, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// One session on this terminal.
    Local,
    /// Sessions for TCP clients only.
    Serve,
    /// The terminal session plus the TCP listener.
    Both,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "local" => Some(Self::Local),
            "serve" => Some(Self::Serve),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    fn default_log_filter(self) -> &'static str {
        match self {
            Command::Local => "warn",
            Command::Serve | Command::Both => "info",
        }
    }
}

/// Where the quiz collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DataSource {
    Memory,
    JsonFile(PathBuf),
    Sqlite(String),
}

impl DataSource {
    fn parse(raw: String) -> Result<Self, ArgsError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ArgsError::InvalidData { raw });
        }
        if trimmed == ":memory:" {
            return Ok(Self::Memory);
        }
        if trimmed.starts_with("sqlite:") {
            return Ok(Self::Sqlite(normalize_sqlite_url(trimmed.to_string())));
        }
        Ok(Self::JsonFile(PathBuf::from(trimmed)))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Memory => f.write_str(":memory:"),
            DataSource::JsonFile(path) => write!(f, "{}", path.display()),
            DataSource::Sqlite(url) => f.write_str(url),
        }
    }
}

struct Args {
    data: DataSource,
    bind: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut data = DataSource::parse(
            std::env::var("QUIZ_DATA").unwrap_or_else(|_| DEFAULT_DATA.into()),
        )?;
        let mut bind = std::env::var("QUIZ_BIND").unwrap_or_else(|_| DEFAULT_BIND.into());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data" => {
                    let value = require_value(args, "--data")?;
                    data = DataSource::parse(value)?;
                }
                "--bind" => {
                    let value = require_value(args, "--bind")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidBind { raw: value });
                    }
                    bind = value;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { data, bind })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidData {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidData {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn open_storage(data: &DataSource) -> Result<Storage, Box<dyn std::error::Error>> {
    let storage = match data {
        DataSource::Memory => Storage::in_memory(),
        DataSource::JsonFile(path) => Storage::json_file(path.clone())?,
        DataSource::Sqlite(url) => {
            prepare_sqlite_file(url)?;
            Storage::sqlite(url).await?
        }
    };
    Ok(storage)
}

fn init_logging(cmd: Command) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cmd.default_log_filter()),
    )
    .init();
}

async fn serve_until_interrupted(host: TcpHost) -> Result<(), Box<dyn std::error::Error>> {
    tokio::select! {
        () = host.serve() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("interrupted, shutting down");
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means the terminal session.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Local,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Local,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_logging(cmd);

    // An unreadable store is fatal; sessions never start on a partial collection.
    let storage = open_storage(&parsed.data).await?;
    let quizzes = Arc::new(QuizService::new(Clock::system(), storage.quizzes));
    if quizzes.ensure_seeded().await? {
        info!("seeded {} with the default quizzes", parsed.data);
    }
    info!("{} quizzes loaded from {}", quizzes.count().await?, parsed.data);

    match cmd {
        Command::Local => {
            run_local(quizzes).await?;
        }
        Command::Serve => {
            let host = TcpHost::bind(parsed.bind.as_str(), quizzes).await?;
            serve_until_interrupted(host).await?;
        }
        Command::Both => {
            let host = TcpHost::bind(parsed.bind.as_str(), Arc::clone(&quizzes)).await?;
            let server = tokio::spawn(host.serve());
            let end = run_local(quizzes).await;
            server.abort();
            if end? == SessionEnd::Disconnected {
                warn!("terminal closed, stopping the listener");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
