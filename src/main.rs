use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotify_history::{
    cli,
    config::{self, Config},
    error, logging,
    management::stats::Period,
    warning,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Record listening history until interrupted
    Collect(CollectOptions),

    /// Summarize collected listening history
    Stats(StatsOptions),

    /// Show collected plays, newest first
    History(HistoryOptions),

    /// Show credential and file status
    Status,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct CollectOptions {
    /// Log to file only, without mirroring to the terminal
    #[clap(long)]
    background: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct StatsOptions {
    /// Time window to summarize
    #[clap(long, value_enum, default_value_t = Period::All)]
    period: Period,

    /// Number of entries per ranking
    #[clap(long, default_value_t = 10)]
    top: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryOptions {
    /// Page to show (50 plays per page)
    #[clap(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    page: u64,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        warning!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    if !matches!(cli.command, Command::Collect(_)) {
        logging::init_console();
    }

    match cli.command {
        Command::Auth => cli::auth(&config).await,
        Command::Collect(opt) => cli::collect(&config, opt.background).await,
        Command::Stats(opt) => cli::stats(&config, opt.period, opt.top).await,
        Command::History(opt) => cli::history(&config, opt.page as usize).await,
        Command::Status => cli::status(&config).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
