//! Brief Bot - Main Entry Point
//!
//! Long-polls the Bot API and feeds every update through the draft,
//! review and project-tracking flow.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use brief_bot::bot::UpdateHandler;
use brief_bot::config::AppConfig;
use brief_bot::document::{OfficeConverter, ProposalBuilder};
use brief_bot::flow::Partners;
use brief_bot::llm::OpenAiClient;
use brief_bot::reminders::{PartnerReminder, ReminderScheduler};
use brief_bot::storage::Database;
use brief_bot::telegram::{TelegramBot, TelegramError};

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram assistant for client briefs and project tracking.
#[derive(Parser, Debug)]
#[command(name = "brief_bot")]
#[command(about = "Turn client briefs into posts and proposals, and track the resulting projects")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Database URL, overrides `DB_URL`.
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let database_url = args.database.as_deref().unwrap_or(&config.bot.database_url);

    let db = Arc::new(Database::open(database_url).context("Failed to open database")?);
    let bot = Arc::new(
        TelegramBot::new(&config.telegram, config.bot.min_send_interval_ms)
            .context("Failed to create Bot API client")?,
    );
    bot.get_me().await.context("Bot token was rejected")?;

    let llm = Arc::new(OpenAiClient::from_config(&config.llm).context("Failed to create LLM client")?);
    let partners = Partners::from_config(&config.access);

    let scheduler = ReminderScheduler::new(
        db.clone(),
        Arc::new(PartnerReminder::new(bot.clone(), partners.clone())),
        config.bot.reminder_delay(),
    );
    let (reminders, reminder_task) = scheduler.spawn();

    let mut handler = UpdateHandler::new(bot.clone(), llm.clone(), db, reminders.clone(), partners);
    if config.bot.proposal_enabled {
        let mut builder = ProposalBuilder::new(llm, config.bot.proposal_dir.clone());
        if config.bot.convert_pdf {
            builder = builder.with_converter(Arc::new(OfficeConverter::new(config.bot.soffice_bin.clone())));
        }
        info!("Proposal documents go to {}", config.bot.proposal_dir.display());
        handler = handler.with_proposals(builder);
    }

    info!(
        "Reminders for new projects every {}s",
        config.bot.reminder_delay().as_secs()
    );
    info!("Bot is running. Use Ctrl+C to stop.");

    tokio::select! {
        () = poll_updates(&bot, &handler) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    info!("Shutting down...");
    reminders.shutdown().await;
    let _ = reminder_task.await;

    Ok(())
}

/// Fetches updates forever and handles them one by one, in order.
async fn poll_updates(bot: &TelegramBot, handler: &UpdateHandler) {
    let mut offset = 0;
    loop {
        match bot.get_updates(offset).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    handler.handle(update).await;
                }
            }
            Err(TelegramError::FloodWait(secs)) => {
                warn!("Polling throttled, waiting {}s", secs);
                tokio::time::sleep(Duration::from_secs(u64::from(secs))).await;
            }
            Err(e) => {
                warn!("Failed to fetch updates: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
