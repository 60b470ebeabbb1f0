//! Finance bot launcher
//!
//! # Usage
//!
//! ```bash
//! # Telegram long polling
//! export TELEGRAM_BOT_TOKEN="123:abc"
//! cargo run --bin finbot -- telegram --workbook Data-test-companies.xlsx
//!
//! # Local session in the terminal
//! cargo run --bin finbot -- repl --out-dir charts
//! ```

use clap::{Parser, Subcommand};
use finbot::platforms::{CliBot, CliInterface, TelegramBot, TelegramConfig};
use finbot::{BotConfig, BotService};
use finbot_utils::{LogFormat, init_tracing};
use std::path::PathBuf;
use tracing::info;

const DEFAULT_FILTER: &str = "warn,finbot=info";
const REPL_FILTER: &str = "warn";

#[derive(Parser, Debug)]
#[command(name = "finbot")]
#[command(about = "Chat bot for monthly company financials", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the bot over the Telegram Bot API
    Telegram {
        /// Workbook to read companies from (overrides FINBOT_WORKBOOK)
        #[arg(short, long)]
        workbook: Option<PathBuf>,

        /// Log as JSON lines
        #[arg(long)]
        json_logs: bool,
    },

    /// Talk to the bot from the terminal
    Repl {
        /// Workbook to read companies from (overrides FINBOT_WORKBOOK)
        #[arg(short, long)]
        workbook: Option<PathBuf>,

        /// Directory charts are written to
        #[arg(short, long, default_value = "charts")]
        out_dir: PathBuf,
    },
}

fn load_config(workbook: Option<PathBuf>) -> anyhow::Result<BotConfig> {
    let mut builder = BotConfig::builder();
    if let Some(path) = workbook {
        builder = builder.workbook_path(path);
    }
    Ok(builder.with_env()?.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Telegram {
            workbook,
            json_logs,
        } => {
            let format = if json_logs {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            };
            init_tracing(DEFAULT_FILTER, format);

            let config = load_config(workbook)?;
            let service = BotService::from_config(&config)?;
            let bot = TelegramBot::new(TelegramConfig::from_bot_config(&config)?, service)?;

            info!("Starting finbot on Telegram");
            tokio::select! {
                result = bot.run() => result?,
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
            }
        }
        Command::Repl { workbook, out_dir } => {
            init_tracing(REPL_FILTER, LogFormat::Pretty);

            let config = load_config(workbook)?;
            let service = BotService::from_config(&config)?;
            println!("Companies: {}", service.controller().datasets().join(", "));
            println!("Type /start to begin, /quit to end the session, Ctrl-D to exit.\n");

            let bot = CliBot::new(service, CliInterface::new(std::io::stdout(), out_dir));
            bot.run(tokio::io::BufReader::new(tokio::io::stdin())).await?;
        }
    }

    Ok(())
}
