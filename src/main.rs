//! Quill 命令行客户端
//!
//! 入口：初始化日志、加载配置、装配服务，执行单个子命令并以 JSON 输出结果。

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use quill::config::load_config;
use quill::core::RuntimeConfigUpdate;
use quill::services::{EditRequest, GrammarCheckConfig, Mode, Tone};
use quill::ServicesBuilder;

#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Route text editing and analysis requests to local or remote models")]
struct Cli {
    /// 额外的配置文件（在 config/default.toml 之后合并）
    #[arg(long, global = true, env = "QUILL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit text in the given mode
    Edit {
        #[arg(long)]
        mode: Mode,
        #[arg(long)]
        tone: Option<Tone>,
        #[arg(long)]
        extra: Option<String>,
        text: String,
    },
    /// Report clarity issues with verified offsets
    Analyze { text: String },
    /// Run the grammar checker
    Check {
        text: String,
        /// Category id to ignore, repeatable
        #[arg(long = "disable")]
        disable: Vec<String>,
    },
    /// List models available on the configured backend
    Models,
    /// Show or change the runtime routing config
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        grammar_model: Option<String>,
        #[arg(long)]
        general_model: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quill::observability::init();

    let cli = Cli::parse();
    let config = load_config(cli.config).context("Failed to load config")?;
    let services = ServicesBuilder::new(config)
        .build()
        .context("Failed to build services")?;

    match cli.command {
        Command::Edit {
            mode,
            tone,
            extra,
            text,
        } => {
            let mut request = EditRequest::new(text, mode);
            if let Some(tone) = tone {
                request = request.with_tone(tone);
            }
            if let Some(extra) = extra {
                request = request.with_extra_instructions(extra);
            }
            let result = services.editing.edit(&request).await.context("Edit failed")?;
            print_json(&result)?;
        }
        Command::Analyze { text } => {
            let report = services.analysis.analyze(&text).await.context("Analysis failed")?;
            print_json(&report)?;
        }
        Command::Check { text, disable } => {
            if !services.grammar.is_enabled() {
                tracing::warn!("Grammar checker is not enabled; result will be empty");
            }
            let rules = GrammarCheckConfig {
                disabled_categories: disable,
            };
            let response = services.grammar.check(&text, Some(&rules)).await;
            print_json(&response)?;
        }
        Command::Models => {
            let models = services
                .list_available_models()
                .await
                .context("Failed to list models")?;
            print_json(&serde_json::json!({ "models": models }))?;
        }
        Command::Config { action } => match action {
            ConfigAction::Show => print_json(&services.store.get())?,
            ConfigAction::Set {
                base_url,
                grammar_model,
                general_model,
            } => {
                let updated = services
                    .update_runtime_config(RuntimeConfigUpdate {
                        base_url,
                        grammar_model,
                        general_model,
                    })
                    .await
                    .context("Failed to update runtime config")?;
                print_json(&updated)?;
            }
        },
    }

    Ok(())
}
