//! CLI command definitions and handlers

use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;

use crate::core::config::ProviderConfig;

/// Commands for Gated Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate texts concurrently
    Translate {
        /// Texts to translate
        #[arg(required = true)]
        texts: Vec<String>,

        /// Source language (default from config)
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language (default from config)
        #[arg(short, long)]
        target_lang: Option<String>,

        /// Use the token-free provider
        #[arg(long)]
        token_free: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch (or reuse) a bearer token and show its status
    Token,

    /// Write the effective configuration to a JSON file
    Config {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// One line of `translate` output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslateOutput {
    pub text: String,
    pub status: Option<u16>,
    pub result: String,
    /// Set when the translate call failed and the original text is shown instead
    pub fallback: bool,
}

impl TranslateOutput {
    fn render(&self) -> String {
        match self.status {
            Some(status) => format!("[{}] {} => {}", status, self.text, self.result),
            None => format!("[fallback] {}", self.result),
        }
    }
}

/// Apply per-command overrides to the loaded configuration
pub fn apply_overrides(
    mut config: ProviderConfig,
    source_lang: Option<String>,
    target_lang: Option<String>,
    token_free: bool,
) -> ProviderConfig {
    if let Some(source_lang) = source_lang {
        config.source_lang = source_lang;
    }
    if let Some(target_lang) = target_lang {
        config.target_lang = target_lang;
    }
    if token_free {
        config.enable_token_free = true;
    }
    config
}

/// Handle translate command
pub async fn handle_translate(
    config: ProviderConfig,
    texts: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    use crate::core::dispatcher::TranslationDispatcher;
    use crate::core::models::TranslationRequest;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tokio::sync::mpsc;
    use tracing::info;

    let start_time = Instant::now();

    info!("Provider: {}", config.effective_provider());
    info!("Language pair: {} -> {}", config.source_lang, config.target_lang);

    let dispatcher = TranslationDispatcher::new(config)?;
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, TranslateOutput)>();

    for (index, text) in texts.iter().enumerate() {
        let on_result = tx.clone();
        let on_fallback = tx.clone();
        let original = text.clone();

        let request = TranslationRequest::new(
            text.clone(),
            index,
            move |response, index| {
                let _ = on_result.send((
                    index,
                    TranslateOutput {
                        text: original,
                        status: Some(response.status),
                        result: response.body,
                        fallback: false,
                    },
                ));
            },
            move |text, index| {
                let _ = on_fallback.send((
                    index,
                    TranslateOutput {
                        text: text.clone(),
                        status: None,
                        result: text,
                        fallback: true,
                    },
                ));
            },
        );

        // detached; every request reports back through the channel
        let _ = dispatcher.dispatch(request);
    }
    drop(tx);

    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut outputs: Vec<Option<TranslateOutput>> = vec![None; texts.len()];
    while let Some((index, output)) = rx.recv().await {
        outputs[index] = Some(output);
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    let outputs: Vec<TranslateOutput> = outputs.into_iter().flatten().collect();
    let fallbacks = outputs.iter().filter(|o| o.fallback).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        for output in &outputs {
            println!("{}", output.render());
        }
    }

    info!(
        "Translated {} texts ({} fell back) in {:.2?}",
        outputs.len(),
        fallbacks,
        start_time.elapsed()
    );

    Ok(())
}

/// Handle token command
pub async fn handle_token(config: ProviderConfig) -> anyhow::Result<()> {
    use crate::core::dispatcher::TranslationDispatcher;
    use crate::core::models::ProviderKind;

    if config.effective_provider() == ProviderKind::TokenFree {
        println!("Token-free provider configured; no bearer token is used.");
        return Ok(());
    }

    let dispatcher = TranslationDispatcher::new(config)?;
    let credential = dispatcher.current_credential().await?;
    let status = dispatcher.token_status().await;

    match credential {
        Some(credential) if status.fresh => {
            println!("Token: {}", mask_credential(&credential));
            if let Some(expires_in) = status.expires_in {
                let expires_at = chrono::Utc::now() + chrono::Duration::from_std(expires_in)?;
                println!("Trusted until: {}", expires_at.to_rfc3339());
            }
        }
        _ => {
            anyhow::bail!("Could not obtain a bearer token; check the subscription key and token endpoint");
        }
    }

    Ok(())
}

/// Handle config command
pub async fn handle_config(config: ProviderConfig, output: PathBuf) -> anyhow::Result<()> {
    config.to_file(&output)?;
    println!("Configuration written to {}", output.display());
    Ok(())
}

/// Show only the head of a credential
pub fn mask_credential(credential: &str) -> String {
    let head: String = credential.chars().take(8).collect();
    if head.len() == credential.len() {
        "*".repeat(credential.chars().count())
    } else {
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_credential() {
        assert_eq!(mask_credential("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGci...");
        assert_eq!(mask_credential("short"), "*****");
    }

    #[derive(clap::Parser, Debug)]
    struct Cli {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_translate_flags() {
        use clap::Parser;

        let cli = Cli::parse_from([
            "gated-translator",
            "translate",
            "--source-lang",
            "fr",
            "--target-lang",
            "ja",
            "--token-free",
            "bonjour",
            "monde",
        ]);

        match cli.command {
            Commands::Translate {
                texts,
                source_lang,
                target_lang,
                token_free,
                json,
            } => {
                assert_eq!(texts, vec!["bonjour", "monde"]);
                assert_eq!(source_lang.as_deref(), Some("fr"));
                assert_eq!(target_lang.as_deref(), Some("ja"));
                assert!(token_free);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_apply_overrides() {
        let config = ProviderConfig {
            subscription_key: "k".to_string(),
            ..Default::default()
        };
        let config = apply_overrides(config, None, Some("ja".to_string()), true);

        assert_eq!(config.source_lang, "en");
        assert_eq!(config.target_lang, "ja");
        assert!(config.enable_token_free);
    }

    #[test]
    fn test_render_output() {
        let translated = TranslateOutput {
            text: "hello".to_string(),
            status: Some(200),
            result: "hallo".to_string(),
            fallback: false,
        };
        assert_eq!(translated.render(), "[200] hello => hallo");

        let fallback = TranslateOutput {
            text: "hello".to_string(),
            status: None,
            result: "hello".to_string(),
            fallback: true,
        };
        assert_eq!(fallback.render(), "[fallback] hello");
    }

    #[tokio::test]
    async fn test_handle_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let config = ProviderConfig {
            subscription_key: "k".to_string(),
            ..Default::default()
        };

        tokio_test::assert_ok!(handle_config(config.clone(), path.clone()).await);
        let reloaded = ProviderConfig::from_file(&path).unwrap();
        assert_eq!(reloaded.subscription_key, "k");
    }
}
