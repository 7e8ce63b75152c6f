use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use task_notify::notice::drain_pending;
use task_notify::{
    auth::strategy_from_config,
    desktop::{LogNotifier, OverdueAlert},
    notification::{Bell, HttpNotificationApi, NotificationApi},
    resync::start_resync,
    websocket::{push_url, WsPushChannel},
    Config, NotificationSnapshot, Notices, NotificationSync,
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream, WatchStream};
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "task-notify", about = "Task notification bell for the terminal")]
struct Cli {
    /// Backend origin, overrides BACKEND_URL
    #[arg(long, env = "BACKEND_URL")]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep the bell mounted and print every change until Ctrl-C
    Watch,
    /// Fetch and print notifications once
    List,
    /// Mark one notification as read
    MarkRead { id: String },
    /// Clear all notifications
    Clear,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,task_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Some(url) = &cli.backend_url {
        std::env::set_var("BACKEND_URL", url);
    }
    let config = Config::from_env().context("loading configuration")?;

    let credentials = strategy_from_config(&config)?;
    let api: Arc<dyn NotificationApi> =
        Arc::new(HttpNotificationApi::new(&config.backend_url, credentials));
    let notices = Notices::new();

    tracing::info!(
        "Using backend {} ({} auth)",
        config.backend_url,
        config.auth_mode
    );

    match cli.command {
        Command::Watch => watch(config, api, notices).await,
        Command::List => {
            let sync = NotificationSync::new(api, notices);
            sync.fetch_all().await?;
            print_bell(&sync);
            Ok(())
        }
        Command::MarkRead { id } => {
            let sync = NotificationSync::new(api, notices.clone());
            let mut rx = notices.subscribe();
            let result = sync.mark_as_read(&id).await;
            for notice in drain_pending(&mut rx) {
                println!("{}", notice);
            }
            result?;
            print_bell(&sync);
            Ok(())
        }
        Command::Clear => {
            let sync = NotificationSync::new(api, notices.clone());
            let mut rx = notices.subscribe();
            let result = sync.clear_all().await;
            for notice in drain_pending(&mut rx) {
                println!("{}", notice);
            }
            result?;
            print_bell(&sync);
            Ok(())
        }
    }
}

fn print_bell(sync: &NotificationSync) {
    print_snapshot(&sync.snapshot());
}

fn print_snapshot(snapshot: &NotificationSnapshot) {
    let mut bell = Bell::default();
    bell.toggle();
    print!("{}", bell.view(snapshot, Utc::now()));
}

async fn watch(
    config: Config,
    api: Arc<dyn NotificationApi>,
    notices: Notices,
) -> anyhow::Result<()> {
    let url = push_url(&config.backend_url, &config.push_path, config.push_protocol)?;
    let channel = WsPushChannel::connect(&url, config.push_protocol)
        .await
        .with_context(|| format!("connecting push channel {}", url))?;

    let mut notice_stream = BroadcastStream::new(notices.subscribe());
    let sync = NotificationSync::mount(api, notices, channel);
    let mut snapshots = WatchStream::new(sync.subscribe());
    let mut overdue = BroadcastStream::new(sync.subscribe_overdue());
    let mut alert = OverdueAlert::new(LogNotifier::new());

    let mut scheduler = match &config.resync_schedule {
        Some(schedule) => Some(start_resync(sync.clone(), schedule).await?),
        None => None,
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(snapshot) = snapshots.next() => print_snapshot(&snapshot),
            Some(notice) = notice_stream.next() => match notice {
                Ok(notice) => println!("{}", notice),
                Err(BroadcastStreamRecvError::Lagged(n)) => tracing::debug!("Skipped {} notices", n),
            },
            Some(batch) = overdue.next() => match batch {
                Ok(tasks) => {
                    if let Err(e) = alert.on_overdue(&tasks).await {
                        tracing::warn!("Could not show desktop alert: {}", e);
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    tracing::debug!("Skipped {} overdue batches", n)
                }
            },
            else => break,
        }
    }

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Resync scheduler shutdown: {}", e);
        }
    }
    sync.unmount().await;
    Ok(())
}
