//! `blockforge` command line
//!
//! Loads a tenant's schema directory and a config file, then sends, fetches
//! or validates JSON documents against the tenant API.
//!
//! ```text
//! blockforge send --schemas ./schemas --config forge.toml --root Order --input order.json
//! blockforge fetch --schemas ./schemas --config forge.toml --root Order
//! blockforge validate --schemas ./schemas --root Order --input order.json
//! blockforge clean-schema --schemas ./schemas --name Order
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use forge_request::{ForgeConfig, Method, RequestSequencer};
use forge_schema::{CachedSchemas, SchemaCache};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "blockforge=info,forge_request=info";

/// Properties file whose values overlay the config
const TENANT_PROPERTIES: &str = "tenant";

const DEFAULT_TENANT: &str = "default";

#[derive(Debug, Parser)]
#[command(name = "blockforge", version, about = "Send nested block trees to tenant APIs")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a JSON document as an ordered series of requests
    Send(SendArgs),
    /// GET the root route of a type
    Fetch(FetchArgs),
    /// Validate a JSON document against a schema
    Validate(ValidateArgs),
    /// Print the validator form of a schema
    CleanSchema(CleanSchemaArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Directory holding the tenant's schema and properties files
    #[arg(long)]
    schemas: PathBuf,

    /// Tenant id
    #[arg(long)]
    tenant: Option<String>,
}

#[derive(Debug, Args)]
struct ConnectArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Config file (.json, .yaml, .yml or .toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Answer every request with a canned id instead of calling the API
    #[arg(long)]
    mock: bool,
}

#[derive(Debug, Args)]
struct SendArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Root schema type
    #[arg(long)]
    root: String,

    /// JSON document to send, `-` for stdin
    #[arg(long)]
    input: PathBuf,

    /// Method of the root request
    #[arg(long, default_value = "POST")]
    method: Method,

    /// Print the full report as JSON instead of the response log
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct FetchArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Schema type whose route is fetched
    #[arg(long)]
    root: String,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Schema type to validate against
    #[arg(long)]
    root: String,

    /// JSON document, `-` for stdin
    #[arg(long)]
    input: PathBuf,
}

#[derive(Debug, Args)]
struct CleanSchemaArgs {
    #[command(flatten)]
    schema: SchemaArgs,

    /// Schema type
    #[arg(long)]
    name: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "command failed");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

async fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Send(args) => send(args).await,
        Command::Fetch(args) => fetch(args).await,
        Command::Validate(args) => validate(args).await,
        Command::CleanSchema(args) => clean_schema(args).await,
    }
}

async fn send(args: SendArgs) -> Result<ExitCode> {
    let schemas = load_schemas(&args.connect.schema).await?;
    let config = build_config(&args.connect, &schemas)?;
    let input = read_input(&args.input).await?;

    let sequencer = RequestSequencer::over_http(config, Arc::new(schemas.registry.clone()))?;
    let report = sequencer
        .send_payload(args.method, &args.root, &input)
        .await
        .with_context(|| format!("cannot build a {} tree from {}", args.root, args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.transcript());
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn fetch(args: FetchArgs) -> Result<ExitCode> {
    let schemas = load_schemas(&args.connect.schema).await?;
    let config = build_config(&args.connect, &schemas)?;

    let sequencer = RequestSequencer::over_http(config, Arc::new(schemas.registry.clone()))?;
    let fetched = sequencer.fetch(&args.root).await?;
    println!("{}", serde_json::to_string_pretty(&fetched)?);
    Ok(ExitCode::SUCCESS)
}

async fn validate(args: ValidateArgs) -> Result<ExitCode> {
    let schemas = load_schemas(&args.schema).await?;
    let input = read_input(&args.input).await?;

    let report = schemas.registry.validate(&args.root, &input)?;
    if report.valid {
        println!("valid");
        return Ok(ExitCode::SUCCESS);
    }
    for error in &report.errors {
        println!("{error}");
    }
    Ok(ExitCode::FAILURE)
}

async fn clean_schema(args: CleanSchemaArgs) -> Result<ExitCode> {
    let schemas = load_schemas(&args.schema).await?;
    let Some(cleaned) = schemas.registry.cleaned(&args.name) else {
        bail!("no schema named '{}' in {}", args.name, args.schema.schemas.display());
    };
    println!("{}", serde_json::to_string_pretty(cleaned)?);
    Ok(ExitCode::SUCCESS)
}

async fn load_schemas(args: &SchemaArgs) -> Result<Arc<CachedSchemas>> {
    let tenant = args.tenant.as_deref().unwrap_or(DEFAULT_TENANT);
    let cache = SchemaCache::default();
    cache
        .load_dir(tenant, &args.schemas)
        .await
        .with_context(|| format!("cannot load schemas from {}", args.schemas.display()))
}

/// Config file, overlaid with tenant properties and command line flags
fn build_config(args: &ConnectArgs, schemas: &CachedSchemas) -> Result<ForgeConfig> {
    let mut config = match &args.config {
        Some(path) => ForgeConfig::from_path(path)?,
        None => ForgeConfig::new(),
    };
    if let Some(properties) = schemas.bundle.property_map(TENANT_PROPERTIES) {
        config = config.with_tenant_properties(properties);
    }
    if let Some(tenant) = &args.schema.tenant {
        config = config.with_tenant(tenant.as_str());
    }
    if args.mock {
        config = config.with_mock_responses(true);
    }
    Ok(config)
}

async fn read_input(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin())).await??
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}
