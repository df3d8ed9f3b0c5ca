mod app;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use roadmapper_core::SystemClock;
use roadmapper_session::{
    Environment, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, Workspace, WorkspaceConfig,
};
use roadmapper_sync::{AuthSession, MemoryAuth, MemoryBackend};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::{App, Outcome};

/// Timeline roadmap editor with local storage and account sync
#[derive(Parser, Debug)]
#[command(name = "roadmapper")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory for locally saved roadmaps
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Keep local roadmaps in memory only
    #[arg(long, conflicts_with = "data_dir")]
    in_memory: bool,

    /// Open a link: /share/TOKEN, /public/ID, /embed/ID or a #share= URL
    #[arg(long, value_name = "LOCATION")]
    open: Option<String>,

    /// Quiet period before a signed-in edit is saved
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    debounce_ms: u64,

    /// Number of undo steps kept
    #[arg(long, value_name = "STEPS", default_value_t = 50)]
    history: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr, command output to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roadmapper=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Local storage
    let kv: Arc<dyn KeyValueStore> = if args.in_memory {
        Arc::new(MemoryKeyValueStore::new())
    } else {
        let dir = args.data_dir.unwrap_or_else(FileKeyValueStore::default_dir);
        info!(dir = %dir.display(), "using local storage");
        Arc::new(FileKeyValueStore::new(dir))
    };

    // Accounts and remote roadmaps live in-process for this session
    let clock = Arc::new(SystemClock);
    let backend = Arc::new(MemoryBackend::new(clock.clone()));
    let auth: Arc<dyn AuthSession> = Arc::new(MemoryAuth::new(backend.clone()));

    let env = Environment {
        kv,
        store: backend,
        clock,
    };
    let config = WorkspaceConfig::default()
        .with_history_cap(args.history)
        .with_save_debounce(Duration::from_millis(args.debounce_ms));

    let mut app = App::new(Workspace::new(env, config), auth);
    let mut stdout = tokio::io::stdout();
    match app.mount(args.open.as_deref()).await {
        Ok(banner) => stdout.write_all(banner.as_bytes()).await?,
        Err(e) => stdout.write_all(format!("error: {e:#}\n").as_bytes()).await?,
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(app.prompt().as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match app.handle_line(&line).await {
            Ok(Outcome::Continue(output)) => stdout.write_all(output.as_bytes()).await?,
            Ok(Outcome::Quit) => break,
            Err(e) => stdout.write_all(format!("error: {e:#}\n").as_bytes()).await?,
        }
    }

    // Give a pending signed-in save a chance to go out
    app.shutdown().await;
    Ok(())
}
