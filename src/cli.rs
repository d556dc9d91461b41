use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lashmedia")]
#[command(author, version, about = "Telegram bot that fetches media through yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot, the dashboard and the temp-file sweeper (default)
    Run,

    /// Print yt-dlp version and download log totals
    Status,

    /// Fetch one link or search query from the terminal
    Fetch {
        /// URL, or search text with --search
        input: String,

        /// Treat input as a search query
        #[arg(long)]
        search: bool,
    },

    /// Fill an empty download log with sample entries
    SeedDemo {
        /// Number of entries to insert
        #[arg(short, long, default_value_t = 20)]
        count: usize,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
