//! Main entry point for Gated Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gated_translator::cli::commands::{self, Commands};
use gated_translator::ProviderConfig;

/// Gated Translator - concurrent translation with single-flight token refresh
#[derive(Parser, Debug)]
#[command(name = "gated-translator", version, about, long_about = None)]
struct Args {
    /// Subscription key (optional, defaults to SUBSCRIPTION_KEY env var)
    #[arg(long)]
    subscription_key: Option<String>,

    /// Config file (json, yaml or toml); environment variables are used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn load_config(args: &Args) -> anyhow::Result<ProviderConfig> {
    // Override config with CLI args if provided
    if let Some(key) = &args.subscription_key {
        std::env::set_var("SUBSCRIPTION_KEY", key);
    }

    let mut config = match &args.config {
        Some(path) => ProviderConfig::from_file(path)?,
        None => ProviderConfig::from_env()?,
    };

    if let Some(key) = &args.subscription_key {
        config.subscription_key = key.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gated_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args)?;

    // Execute command
    match args.command {
        Some(Commands::Translate {
            texts,
            source_lang,
            target_lang,
            token_free,
            json,
        }) => {
            let config = commands::apply_overrides(config, source_lang, target_lang, token_free);
            commands::handle_translate(config, texts, json).await?;
        }
        Some(Commands::Token) => {
            commands::handle_token(config).await?;
        }
        Some(Commands::Config { output }) => {
            commands::handle_config(config, output).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_key_flag_keeps_env_settings() {
        std::env::remove_var("SUBSCRIPTION_KEY");
        std::env::set_var("TARGET_LANG", "ja");
        std::env::set_var("ENABLE_TOKEN_FREE", "1");

        let args = Args::parse_from(["gated-translator", "--subscription-key", "k", "token"]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.subscription_key, "k");
        assert_eq!(config.target_lang, "ja");
        assert!(config.enable_token_free);

        std::env::remove_var("TARGET_LANG");
        std::env::remove_var("ENABLE_TOKEN_FREE");
    }
}
