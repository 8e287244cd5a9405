use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nowfile_presence_core::{payload, timing, AppConfig, PayloadOutcome};
use nowfile_presence_discord_rpc::{DiscordRpcClient, PORTS};
use nowfile_presence_engine::{
    run_sync_loop, ActivityBuilder, ChangeDebouncer, PresenceSession, SessionConfig,
};
use nowfile_presence_source::{read_payload, spawn_file_watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "nowfile-presence",
    about = "Now playing file -> Discord Rich Presence"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run,
    Doctor,
    Status,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Run);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cmd {
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            init_config(&cfg_path)?;
            println!("Initialized config at {}", cfg_path.display());
            Ok(())
        }
        Commands::Doctor => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            doctor(&cfg).await
        }
        Commands::Status => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            status(&cfg).await
        }
        Commands::Run => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            run(cfg).await
        }
    }
}

async fn run(cfg: AppConfig) -> Result<()> {
    let discord = DiscordRpcClient::new(cfg.discord_app_id.clone())
        .with_call_timeout(Duration::from_millis(cfg.intervals.rpc_call_timeout_ms));
    let mut session = PresenceSession::new(discord, SessionConfig::from_app_config(&cfg));

    session
        .connect()
        .await
        .context("could not reach the local Discord client")?;

    let (tx, mut rx) = mpsc::channel(16);
    let watcher = spawn_file_watcher(
        cfg.now_playing_file.clone(),
        Duration::from_millis(cfg.intervals.file_watch_poll_ms),
        tx,
    );
    let mut debouncer = ChangeDebouncer::new(Duration::from_millis(cfg.intervals.settle_delay_ms));
    info!(
        file = %cfg.now_playing_file.display(),
        settle = ?debouncer.settle(),
        "nowfile-presence started"
    );

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c; shutting down");
        }
    };
    run_sync_loop(&mut session, &mut rx, &mut debouncer, shutdown).await;

    watcher.abort();
    Ok(())
}

async fn doctor(cfg: &AppConfig) -> Result<()> {
    println!("== nowfile-presence doctor ==");

    let discord_ok = discord_running().await;
    println!(
        "Discord RPC local endpoint: {}",
        if discord_ok {
            "reachable"
        } else {
            "not reachable"
        }
    );

    let path = &cfg.now_playing_file;
    match read_payload(path).await {
        Ok(raw) => match payload::parse(&raw) {
            Ok(PayloadOutcome::Record(record)) => {
                println!("Now playing file: {} (ok)", path.display());
                println!("Now playing: {} - {}", record.artist, record.title);
            }
            Ok(PayloadOutcome::Empty) => {
                println!("Now playing file: {} (empty)", path.display());
            }
            Err(err) => {
                println!("Now playing file: {} (invalid: {err})", path.display());
            }
        },
        Err(err) => println!("Now playing file: {err:#}"),
    }

    Ok(())
}

async fn status(cfg: &AppConfig) -> Result<()> {
    let raw = read_payload(&cfg.now_playing_file).await?;

    match payload::parse(&raw)? {
        PayloadOutcome::Empty => println!("track: <none>"),
        PayloadOutcome::Record(record) => {
            let window = timing::compute(SystemTime::now(), record.duration_secs);
            let activity = ActivityBuilder::from_app_config(cfg).build(&record, window);
            println!("details: {}", activity.details);
            println!("state: {}", activity.state_text);
            println!("length: {}s", record.duration_secs);
            println!("large image: {} ({})", activity.large_image_key, activity.large_image_text);
            for link in &activity.links {
                println!("button: {} -> {}", link.label, link.url);
            }
        }
    }

    Ok(())
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("nowfile-presence").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

async fn discord_running() -> bool {
    #[cfg(unix)]
    {
        let found = nowfile_presence_discord_rpc::IPC_SLOTS.iter().any(|&slot| {
            nowfile_presence_discord_rpc::ipc_socket_candidates(slot)
                .iter()
                .any(|p| p.exists())
        });
        if found {
            return true;
        }
    }

    for port in PORTS {
        let addr = format!("127.0.0.1:{port}");
        if tokio::time::timeout(
            Duration::from_millis(200),
            tokio::net::TcpStream::connect(addr),
        )
        .await
        .ok()
        .and_then(Result::ok)
        .is_some()
        {
            return true;
        }
    }
    false
}

fn apply_env_overrides(cfg: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("NOWFILE_PRESENCE_DISCORD_APP_ID") {
        if !v.trim().is_empty() {
            cfg.discord_app_id = v;
        }
    }
    if let Some(v) = var("NOWFILE_PRESENCE_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.log_level = v;
        }
    }
    if let Some(v) = var("NOWFILE_PRESENCE_FILE") {
        if !v.trim().is_empty() {
            cfg.now_playing_file = PathBuf::from(v);
        }
    }
}
