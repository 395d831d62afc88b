//! CLI entry point for tooltrace.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_CHAT_PROMPT: &str = "What are 3 things to visit in Seattle?";
pub const DEFAULT_WEATHER_PROMPT: &str = "What is the weather and temperature in Seattle?";

/// Traced chat completions and tool calling.
#[derive(Parser, Debug)]
#[command(name = "tooltrace", version, about = "Traced chat completions with tool calling")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (TOML); defaults to config.toml in the user config dir
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable span creation
    #[arg(long, global = true)]
    pub no_trace: bool,

    /// Record message text and tool payloads on spans
    #[arg(long, global = true)]
    pub record_content: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one traced chat completion
    Chat(ChatArgs),
    /// Answer a weather question with the demo tools
    Weather(WeatherArgs),
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// User prompt
    #[arg(default_value = DEFAULT_CHAT_PROMPT)]
    pub prompt: String,

    /// System prompt
    #[arg(short, long, default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system: String,

    /// Max tokens
    #[arg(long, default_value_t = 1000)]
    pub max_tokens: u32,
}

#[derive(Args, Debug)]
pub struct WeatherArgs {
    /// User prompt
    #[arg(default_value = DEFAULT_WEATHER_PROMPT)]
    pub prompt: String,

    /// Cap on completion requests (overrides config)
    #[arg(long)]
    pub max_rounds: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_defaults_match_demo() {
        let cli = Cli::try_parse_from(["tooltrace", "chat"]).unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.prompt, DEFAULT_CHAT_PROMPT);
                assert_eq!(args.system, DEFAULT_SYSTEM_PROMPT);
                assert_eq!(args.max_tokens, 1000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["tooltrace", "weather", "--no-trace", "--max-rounds", "3"])
            .unwrap();
        assert!(cli.global.no_trace);
        match cli.command {
            Commands::Weather(args) => assert_eq!(args.max_rounds, Some(3)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
