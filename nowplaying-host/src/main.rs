use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::styling;
use eyre::{Context, Result};
use libnowplaying_bridge::SouvlakiPlatform;
use libnowplaying_bridge::now_playing::{
    BridgeChannel, CommandDispatcher, DEFAULT_CHANNEL_NAME, NowPlayingBridge, Settings,
};
use tap::TapFallible;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn styles() -> styling::Styles {
    styling::Styles::styled()
        .header(
            styling::Style::default()
                .bold()
                .fg_color(Some(styling::Color::Ansi(styling::AnsiColor::Blue))),
        )
        .placeholder(styling::Style::default().dimmed())
}

/// Bridges an application speaking JSON lines on stdin/stdout to the OS media controls.
#[derive(Parser, Debug)]
#[command(version, styles = styles())]
struct Cli {
    /// Name registered with the OS media service
    #[arg(long, env = "NOW_PLAYING_DBUS_NAME", default_value = "nowplaying")]
    dbus_name: String,
    #[arg(long, env = "NOW_PLAYING_DISPLAY_NAME", default_value = "Now Playing")]
    display_name: String,
    #[arg(long, env = "NOW_PLAYING_CHANNEL", default_value = DEFAULT_CHANNEL_NAME)]
    channel: String,
    #[arg(long, env = "NOW_PLAYING_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    fetch_timeout_secs: u64,
    #[arg(long, env = "NOW_PLAYING_FETCH_RETRIES", default_value_t = 2)]
    fetch_retries: u32,
    /// Let superseded artwork fetches run to completion instead of cancelling them
    #[arg(long, env = "NOW_PLAYING_KEEP_STALE_FETCHES")]
    keep_stale_fetches: bool,
    /// Also write daily rolling logs to this directory
    #[arg(long, env = "NOW_PLAYING_LOG_DIR")]
    log_dir: Option<PathBuf>,
    /// Write logs to the platform's data directory
    #[arg(long, env = "NOW_PLAYING_LOG_TO_FILE")]
    log_to_file: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            fetch_retries: self.fetch_retries,
            cancel_stale_fetches: !self.keep_stale_fetches,
            ..Default::default()
        }
    }

    fn log_dir(&self) -> Result<Option<PathBuf>> {
        if let Some(dir) = &self.log_dir {
            return Ok(Some(dir.clone()));
        }
        if !self.log_to_file {
            return Ok(None);
        }
        let dirs = directories::ProjectDirs::from("", "", "nowplaying")
            .ok_or_else(|| eyre::eyre!("Unable to find home directory"))?;
        Ok(Some(dirs.data_local_dir().join("logs")))
    }
}

fn init_logging(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    match log_dir {
        Some(log_dir) => {
            let appender = tracing_appender::rolling::daily(log_dir, "nowplaying.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(env_filter());
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir()?);

    let result = run(cli).await;
    if let Err(e) = &result {
        error!("{e:?}");
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let platform = SouvlakiPlatform::new(&cli.dbus_name, &cli.display_name)
        .wrap_err("Error creating OS media controls")?;
    let bridge = NowPlayingBridge::with_http_fetcher(platform.clone(), cli.settings())
        .wrap_err("Error creating artwork client")?;

    let mut dispatcher = CommandDispatcher::new(platform, bridge.forwarder());
    dispatcher
        .register_handlers()
        .wrap_err("Error registering transport handlers")?;
    let signals = bridge.attach().await?;
    let channel = BridgeChannel::new(cli.channel, bridge.clone());
    info!("Listening on channel {}", channel.name());

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(mut line) = out_rx.recv().await {
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err()
            {
                warn!("stdout closed");
                break;
            }
        }
    });

    let signal_tx = out_tx.clone();
    let signal_forwarder = tokio::spawn(async move {
        while let Ok(command) = signals.recv_async().await {
            if signal_tx
                .send(BridgeChannel::encode_signal(command))
                .is_err()
            {
                break;
            }
        }
    });

    let reader = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.wrap_err("Error reading stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = channel.handle_message(&line).await;
            if out_tx.send(reply).is_err() {
                break;
            }
        }
        info!("Application closed its end of the channel");
        Ok::<_, eyre::Report>(())
    };

    let read_result = tokio::select! {
        result = reader => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt");
            Ok(())
        }
    };

    bridge
        .shutdown()
        .await
        .tap_err(|e| warn!("Bridge already stopped: {e}"))
        .ok();
    signal_forwarder.abort();
    drop(out_tx);
    writer.await.ok();
    read_result
}
