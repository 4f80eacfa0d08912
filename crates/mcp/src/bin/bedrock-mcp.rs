// Standalone MCP server binary

use anyhow::{Context, Result};
use bedrock_mcp::logging;
use bedrock_mcp::server::McpServer;
use bedrock_mcp::tools::{InvokeClaudeTool, ToolRegistry};
use bedrock_mcp_core::bedrock::BedrockClient;
use bedrock_mcp_core::probe::{probe_models, ProbeOptions, DEFAULT_PROBE_PROMPT};
use bedrock_mcp_core::{ApiFlavor, BedrockConfig, ModelInfo, MAX_TOKENS_LIMIT};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "bedrock-mcp")]
#[command(about = "MCP server exposing Claude on AWS Bedrock as the invoke_claude tool", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "bedrock-mcp.toml", env = "BEDROCK_MCP_CONFIG", global = true)]
    config: PathBuf,

    /// AWS region hosting the Bedrock runtime
    #[arg(long, global = true)]
    region: Option<String>,

    /// Bedrock API to call: converse or invoke_model
    #[arg(long, global = true)]
    api: Option<ApiFlavor>,

    /// Model used when a tool call does not name one
    #[arg(long, global = true)]
    default_model: Option<String>,

    /// Named AWS credentials profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Cross-region inference profile prefix (us, eu, apac)
    #[arg(long, global = true)]
    inference_profile: Option<String>,

    /// Append logs to this file as well as stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the invoke_claude tool over stdio (default)
    Serve,

    /// Try models one at a time and report which ones respond
    Probe {
        /// Model id to probe; repeatable. Defaults to the whole catalog
        #[arg(long = "model")]
        models: Vec<String>,

        /// Prompt sent to each model
        #[arg(long, default_value = DEFAULT_PROBE_PROMPT)]
        prompt: String,

        /// Tokens to generate per model
        #[arg(
            long,
            default_value_t = 50,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TOKENS_LIMIT))
        )]
        max_tokens: u32,

        /// Stop after the first model that answers
        #[arg(long)]
        stop_at_first: bool,
    },
}

impl Args {
    /// Defaults, then the config file, then the environment, then flags.
    /// The flag reports whether the config file existed.
    fn resolve_config(&self) -> Result<(BedrockConfig, bool)> {
        let file = BedrockConfig::load_file(&self.config)?;
        let from_file = file.is_some();
        let mut config = file.unwrap_or_default();
        config.apply_env()?;

        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(api) = self.api {
            config.api = api;
        }
        if let Some(model) = &self.default_model {
            config.default_model = Some(model.clone());
        }
        if let Some(profile) = &self.profile {
            config.profile = Some(profile.clone());
        }
        if let Some(inference_profile) = &self.inference_profile {
            config.inference_profile = Some(inference_profile.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        Ok((config, from_file))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let (config, from_file) = args.resolve_config()?;

    logging::init(config.log_file.as_deref())?;

    if !from_file {
        tracing::info!(
            path = %args.config.display(),
            "Configuration file not found, using defaults"
        );
    }

    tracing::info!(
        config = %args.config.display(),
        region = %config.region,
        api = %config.api,
        "Bedrock MCP starting"
    );

    match args.command {
        None | Some(Command::Serve) => serve(config).await,
        Some(Command::Probe {
            models,
            prompt,
            max_tokens,
            stop_at_first,
        }) => {
            let options = ProbeOptions {
                prompt,
                max_tokens,
                stop_at_first,
            };
            probe(config, models, options).await
        }
    }
}

async fn serve(config: BedrockConfig) -> Result<()> {
    let catalog = config.catalog()?;
    tracing::info!(
        api = config.api.label(),
        default_model = catalog.default_model().id,
        models = catalog.models().len(),
        "Model catalog loaded"
    );

    let client = BedrockClient::connect(&config).await;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(InvokeClaudeTool::new(
        client.invoker(config.api),
        catalog,
    )));

    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(registry);
    server.start().await?;

    Ok(())
}

async fn probe(config: BedrockConfig, models: Vec<String>, options: ProbeOptions) -> Result<()> {
    let catalog = config.catalog()?;
    let selected: Vec<&'static ModelInfo> = if models.is_empty() {
        catalog.models().to_vec()
    } else {
        models
            .iter()
            .map(|id| catalog.resolve(Some(id.as_str())))
            .collect::<Result<_, _>>()
            .context("Cannot probe model")?
    };

    let client = BedrockClient::connect(&config).await;
    let invoker = client.invoker(config.api);

    println!(
        "Probing {} model(s) via the {} in {}",
        selected.len(),
        config.api.label(),
        config.region
    );

    let outcomes = probe_models(invoker.as_ref(), &selected, &options).await;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(preview) => println!("OK    {} ({}): {}", outcome.model_id, outcome.model_name, preview),
            Err(message) => println!(
                "FAIL  {} ({}): {}",
                outcome.model_id,
                outcome.model_name,
                message.lines().next().unwrap_or_default()
            ),
        }
    }

    let working: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.is_success())
        .map(|o| o.model_id)
        .collect();
    if working.is_empty() {
        anyhow::bail!("No model responded; check credentials, region and model access");
    }
    println!("Working models: {}", working.join(", "));

    Ok(())
}
