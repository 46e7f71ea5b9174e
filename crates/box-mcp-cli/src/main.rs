mod args;
mod config;
mod render;

use anyhow::Context as _;
use box_mcp_tools::{BoxServerConfig, BoxToolSource};
use clap::{Parser, Subcommand};
use config::{CliConfig, default_config_path, load_config, save_config};
use owo_colors::OwoColorize as _;
use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "box-mcp", version, about = "List, describe and call Box API operations")]
struct Cli {
    /// Path to the CLI config file (defaults to `$XDG_CONFIG_HOME/box-mcp/config.json`).
    #[arg(long, env = "BOX_MCP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Extra endpoint descriptors (YAML) merged over the built-in catalogue.
    #[arg(long, env = "BOX_MCP_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    /// Access token sent as `Authorization: Bearer ...`.
    #[arg(long, env = "BOX_ACCESS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Base URL of the Box API host.
    #[arg(long, env = "BOX_API_BASE", global = true)]
    api_base: Option<String>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List operations in the catalogue.
    Tools {
        /// Print the MCP tool definitions as JSON.
        #[arg(long)]
        json: bool,
        /// Only show operations whose id contains this substring.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show the MCP definition (schema and annotations) of one operation.
    Describe { tool: String },
    /// Invoke one operation and print the JSON result.
    Call {
        tool: String,
        /// Arguments as a JSON object, or `@path` to read them from a file.
        #[arg(long)]
        args: Option<String>,
        /// One argument: `key=value` (string) or `key:=json`. Repeatable.
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        arg: Vec<String>,
    },
    /// Inspect or edit the persisted CLI config.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the config (token redacted).
    Show,
    /// Print the config file path.
    Path,
    /// Store an access token.
    SetToken {
        #[arg(value_name = "TOKEN")]
        value: String,
    },
    /// Store base URLs for the Box hosts.
    SetBaseUrl {
        #[arg(long)]
        api: Option<String>,
        #[arg(long)]
        upload: Option<String>,
        #[arg(long)]
        oauth: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => default_config_path()?,
    };

    match &cli.command {
        Command::Config { command } => run_config(&config_path, command),
        Command::Tools { json, filter } => {
            let source = build_source(&cli, &config_path)?;
            list_tools(&source, *json, filter.as_deref())
        }
        Command::Describe { tool } => {
            let source = build_source(&cli, &config_path)?;
            let def = source
                .tool(tool)
                .with_context(|| format!("unknown operation '{tool}'"))?;
            println!("{}", serde_json::to_string_pretty(&def)?);
            Ok(())
        }
        Command::Call { tool, args, arg } => {
            let source = build_source(&cli, &config_path)?;
            let arguments = args::build_arguments(args.as_deref(), arg)?;
            debug!(tool = %tool, "calling Box operation");
            let result = source
                .invoke(tool, &arguments)
                .await
                .with_context(|| format!("call {tool}"))?;
            if let Some(body) = result {
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Ok(())
        }
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_source(cli: &Cli, config_path: &Path) -> anyhow::Result<BoxToolSource> {
    let saved = load_config(config_path)?;
    let mut server = BoxServerConfig::embedded().context("load built-in catalogue")?;

    if let Some(path) = &cli.catalog {
        let extra = BoxServerConfig::from_path(path)?;
        debug!(path = %path.display(), tools = extra.tools.len(), "merging extra descriptors");
        server.merge_tools(extra.tools);
    }

    saved.apply(&mut server);
    if let Some(api) = &cli.api_base {
        server.servers.api.clone_from(api);
    }
    if let Some(token) = cli.token.as_ref().or(saved.access_token.as_ref()) {
        server = server.with_bearer_token(token.clone());
    }

    Ok(BoxToolSource::new(server)?)
}

fn list_tools(source: &BoxToolSource, json: bool, filter: Option<&str>) -> anyhow::Result<()> {
    let tools: Vec<_> = source
        .list_tools()
        .into_iter()
        .filter(|t| filter.is_none_or(|f| t.name.contains(f)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    let color = std::io::stdout().is_terminal();
    for tool in &tools {
        println!("{}", render::tool_line(tool, color));
    }
    let summary = format!("{} operation(s)", tools.len());
    if color {
        eprintln!("{}", summary.dimmed());
    } else {
        eprintln!("{summary}");
    }
    Ok(())
}

fn run_config(path: &Path, command: &ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            let cfg = load_config(path)?;
            println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
        }
        ConfigCommand::SetToken { value } => {
            let mut cfg = load_config(path)?;
            cfg.access_token = Some(value.clone());
            save_config(path, &cfg)?;
            eprintln!("saved token to {}", path.display());
        }
        ConfigCommand::SetBaseUrl {
            api,
            upload,
            oauth,
        } => {
            if api.is_none() && upload.is_none() && oauth.is_none() {
                anyhow::bail!("nothing to set: pass --api, --upload and/or --oauth");
            }
            let mut cfg: CliConfig = load_config(path)?;
            if api.is_some() {
                cfg.api_base.clone_from(api);
            }
            if upload.is_some() {
                cfg.upload_base.clone_from(upload);
            }
            if oauth.is_some() {
                cfg.oauth_base.clone_from(oauth);
            }
            save_config(path, &cfg)?;
            eprintln!("saved base URLs to {}", path.display());
        }
    }
    Ok(())
}
