//! Command-line interface definitions for Latest AI News.
//!
//! Two subcommands share a global `--config` option. Options can be given as
//! flags or, where noted, environment variables.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the Latest AI News application.
///
/// # Examples
///
/// ```sh
/// # One-shot digest of the last week
/// latest_ai_news fetch -j ./json -m ./markdown
///
/// # Only two sources, from a given day on
/// latest_ai_news fetch -j ./json -m ./markdown --start-date 2025-04-01 -s "OpenAI News,NVIDIA Blog"
///
/// # JSON API with a custom feed list
/// latest_ai_news --config feeds.yaml serve --bind 127.0.0.1:8000
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, env = "LATEST_NEWS_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every source once and write JSON and Markdown digests
    Fetch(FetchArgs),
    /// Serve the news API over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Output directory for the JSON digest
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Output directory for the Markdown digest
    #[arg(short, long)]
    pub markdown_output_dir: String,

    /// Earliest publication date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Latest publication date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Comma-separated source labels to keep; all sources when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub sources: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, env = "LATEST_NEWS_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_parsing() {
        let cli = Cli::parse_from([
            "latest_ai_news",
            "fetch",
            "--json-output-dir",
            "./json",
            "--markdown-output-dir",
            "./markdown",
        ]);

        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.json_output_dir, "./json");
        assert_eq!(args.markdown_output_dir, "./markdown");
        assert!(args.start_date.is_none());
        assert!(args.sources.is_empty());
    }

    #[test]
    fn test_fetch_short_flags_and_filters() {
        let cli = Cli::parse_from([
            "latest_ai_news",
            "fetch",
            "-j",
            "/tmp/json",
            "-m",
            "/tmp/markdown",
            "--start-date",
            "2025-04-01",
            "--end-date",
            "2025-04-07",
            "-s",
            "OpenAI News,NVIDIA Blog",
        ]);

        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.json_output_dir, "/tmp/json");
        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(args.end_date, NaiveDate::from_ymd_opt(2025, 4, 7));
        assert_eq!(args.sources, vec!["OpenAI News", "NVIDIA Blog"]);
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let result = Cli::try_parse_from([
            "latest_ai_news",
            "fetch",
            "-j",
            "j",
            "-m",
            "m",
            "--start-date",
            "April 1st",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_with_global_config() {
        let cli = Cli::parse_from([
            "latest_ai_news",
            "serve",
            "--config",
            "feeds.yaml",
            "--bind",
            "127.0.0.1:9000",
        ]);

        assert_eq!(cli.config.as_deref(), Some("feeds.yaml"));
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind, "127.0.0.1:9000");
    }
}
