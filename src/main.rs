use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::sleep;

use lashmedia::cli::{Cli, Commands};
use lashmedia::core::web_server::{self, DashboardState};
use lashmedia::core::{config, init_logger, log_startup_configuration, metrics, CooldownGate};
use lashmedia::download::{cleanup, detect, ytdlp, FetchRequest, FetcherSettings, MediaFetcher, Platform};
use lashmedia::download::{QueueLimits, TaskQueue};
use lashmedia::storage::{create_pool, db, get_connection, DownloadLog};
use lashmedia::telegram::router::RouterSettings;
use lashmedia::telegram::{create_bot, schema, setup_bot_commands, BotTaskRunner, HandlerDeps};

/// Attempts at `get_me` before giving up (5 seconds apart)
const STARTUP_MAX_RETRIES: u32 = 24;

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so LOG_FILE_PATH and friends see it
    let _ = dotenv();

    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;
    metrics::init_metrics();

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Status) => run_status().await,
        Some(Commands::Fetch { input, search }) => run_cli_fetch(input, search).await,
        Some(Commands::SeedDemo { count }) => run_seed_demo(count),
    }
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    log_startup_configuration();

    let bot = create_bot()?;

    // Bot API may still be coming up; retry transient failures
    let me = {
        let mut attempt = 0;
        loop {
            match bot.get_me().await {
                Ok(me) => break me,
                Err(e) => {
                    attempt += 1;
                    let retryable = matches!(e, teloxide::RequestError::Network(_) | teloxide::RequestError::Io(_));
                    if attempt >= STARTUP_MAX_RETRIES || !retryable {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} attempt(s): {}",
                            attempt,
                            e
                        ));
                    }
                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...",
                        attempt,
                        STARTUP_MAX_RETRIES,
                        e
                    );
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    };
    log::info!("Bot username: {:?}, Bot ID: {}", me.username.as_deref(), me.id);

    let router = match me.username.as_deref() {
        Some(username) => RouterSettings::from_env().with_username(username),
        None => RouterSettings::from_env(),
    };

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let pool = create_pool(&config::DATABASE_PATH)?;
    let log_store = DownloadLog::new(pool);

    let fetcher = MediaFetcher::new(FetcherSettings::from_env());
    let runner = Arc::new(BotTaskRunner::new(bot.clone(), fetcher, log_store.clone()));
    let queue = TaskQueue::start(runner, QueueLimits::from_env());

    tokio::spawn(cleanup::run_sweeper(config::DOWNLOAD_DIR.clone()));

    let port = *config::dashboard::PORT;
    if port > 0 {
        let state = DashboardState::new(log_store.clone());
        tokio::spawn(async move {
            if let Err(e) = web_server::run_dashboard(port, state).await {
                log::error!("Dashboard server error: {}", e);
            }
        });
    } else {
        log::info!("Dashboard disabled (DASHBOARD_PORT=0)");
    }

    let deps = HandlerDeps::new(
        queue,
        CooldownGate::from_env(),
        router,
        config::YTDL_BIN.clone(),
        *config::SEARCH_PICKER,
    );

    log::info!("Bot is running");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Bot stopped");
    Ok(())
}

async fn run_status() -> Result<()> {
    let version = ytdlp::version(&config::YTDL_BIN).await;
    println!("yt-dlp: {}", version.as_deref().unwrap_or("not installed"));

    let pool = create_pool(&config::DATABASE_PATH)?;
    let conn = get_connection(&pool)?;
    println!("Downloads logged: {}", db::total(&conn)?);
    for entry in db::platform_counts(&conn)? {
        println!("  {:<12} {}", entry.platform, entry.count);
    }
    Ok(())
}

async fn run_cli_fetch(input: String, search: bool) -> Result<()> {
    let platform = if search {
        Platform::Search
    } else {
        url::Url::parse(&input)?;
        detect(&input).ok_or_else(|| anyhow::anyhow!("Unsupported platform: {}", input))?
    };

    let fetcher = MediaFetcher::new(FetcherSettings::from_env());
    println!("Fetching {} ({})...", input, platform.display_name());

    let media = fetcher
        .fetch(&FetchRequest::new(input, platform))
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("Title: {}", media.title);
    println!("Size:  {:.1}MB", media.size_mb());
    println!("Path:  {}", media.path.display());
    Ok(())
}

fn run_seed_demo(count: usize) -> Result<()> {
    let pool = create_pool(&config::DATABASE_PATH)?;
    let conn = get_connection(&pool)?;
    match db::seed_demo(&conn, count)? {
        0 => println!("Download log is not empty; nothing seeded"),
        n => println!("Seeded {} demo entries", n),
    }
    Ok(())
}
