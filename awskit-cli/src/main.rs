//! `awskit`: list, describe and invoke the AWS adapter tools from a shell.

use anyhow::{anyhow, bail, Context, Result};
use awskit_core::{logging, DynTool, ProviderConfig, ToolError, ToolResult};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "awskit")]
#[command(about = "Run AWS adapter tools with flat JSON parameters", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Provider config file (TOML)
    #[arg(long, global = true, env = "AWSKIT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List tool names and descriptions
    List,

    /// Print a tool's input JSON schema
    Schema {
        /// Tool name
        tool: String,
    },

    /// Run a tool and print its output messages as JSON
    Invoke {
        /// Tool name
        tool: String,

        /// Parameters as a JSON object, or `@path` to read them from a file
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Write blob outputs into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<ProviderConfig> {
    let config = match path {
        Some(path) => ProviderConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ProviderConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn parse_params(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters from {}", path))?,
        None => raw.to_string(),
    };
    let params: Value = serde_json::from_str(&text).context("Parameters must be valid JSON")?;
    if !params.is_object() {
        bail!("Parameters must be a JSON object");
    }
    Ok(params)
}

fn find_tool<'a>(tools: &'a [Box<dyn DynTool>], name: &str) -> Result<&'a dyn DynTool> {
    tools
        .iter()
        .find(|t| t.name() == name)
        .map(|t| t.as_ref())
        .ok_or_else(|| anyhow!("Unknown tool '{}'. Run `awskit list` to see available tools.", name))
}

/// Save every blob in `result` under `dir`, returning the written paths.
fn write_blobs(result: &ToolResult, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    result
        .blobs()
        .into_iter()
        .enumerate()
        .map(|(i, blob)| {
            let name = blob
                .filename
                .as_deref()
                .and_then(|f| Path::new(f).file_name())
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("blob_{}", i));
            let path = dir.join(name);
            std::fs::write(&path, &blob.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

async fn run(cli: Cli) -> Result<()> {
    let config = Arc::new(load_config(cli.config.as_deref())?);
    let tools = awskit_tools::all_tools(config);

    match cli.command {
        Commands::List => {
            let width = tools.iter().map(|t| t.name().len()).max().unwrap_or(0);
            for tool in &tools {
                println!("{:width$}  {}", tool.name(), tool.description(), width = width);
            }
        }
        Commands::Schema { tool } => {
            let tool = find_tool(&tools, &tool)?;
            println!("{}", serde_json::to_string_pretty(&tool.input_schema())?);
        }
        Commands::Invoke {
            tool,
            params,
            out_dir,
        } => {
            let tool = find_tool(&tools, &tool)?;
            let params = parse_params(&params)?;
            log::debug!("{}", tool.format_input_plain(&params));

            let result = tool.execute_raw(params).await.map_err(ToolFailure)?;
            if let Some(dir) = out_dir {
                for path in write_blobs(&result, &dir)? {
                    log::info!("Wrote {}", path.display());
                }
            }
            println!("{}", serde_json::to_string_pretty(&result.to_messages())?);
        }
    }
    Ok(())
}

/// A tool error carried through `anyhow` so it can be printed with its structure.
#[derive(Debug)]
struct ToolFailure(ToolError);

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ToolFailure {}

fn error_body(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<ToolFailure>() {
        Some(ToolFailure(tool_error)) => json!({ "error": tool_error.to_json() }),
        None => json!({ "error": { "kind": "error", "message": format!("{:#}", err) } }),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        logging::LevelFilter::DEBUG
    } else {
        logging::LevelFilter::WARN
    };
    if let Err(e) = logging::init(level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let body = error_body(&err);
            println!(
                "{}",
                logging::mask_sensitive_text(&serde_json::to_string_pretty(&body).unwrap_or_default())
            );
            ExitCode::FAILURE
        }
    }
}
