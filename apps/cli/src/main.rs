//! `trellis`: validate JSON submissions against form definitions.

mod report;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use trellis_form::{FormConfig, FormFactory, FormNode};
use trellis_validator::MetadataRegistry;

use crate::report::Outcome;
use crate::settings::{FlagOverrides, OutputFormat, Settings};

#[derive(Parser)]
#[command(name = "trellis", version, about = "Validate JSON submissions against form definitions")]
struct Cli {
    /// Settings file (defaults to ./trellis.toml when present).
    #[arg(long, global = true, env = "TRELLIS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `trellis_form=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bind a submission to a form and report validation errors.
    Validate(ValidateArgs),
    /// Check that form and metadata definitions are well formed.
    Check(CheckArgs),
}

#[derive(Args)]
struct Definitions {
    /// Form definition (JSON).
    #[arg(long)]
    form: PathBuf,

    /// Class metadata (JSON).
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Name of the root form.
    #[arg(long, default_value = "form")]
    name: String,
}

#[derive(Args)]
struct ValidateArgs {
    #[command(flatten)]
    definitions: Definitions,

    /// Submitted data (JSON).
    #[arg(long)]
    data: PathBuf,

    /// Data bound before submission (JSON).
    #[arg(long)]
    initial: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Keep fields that are missing from the submitted data.
    #[arg(long)]
    partial: bool,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    definitions: Definitions,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let (format, partial) = match &cli.command {
        Command::Validate(args) => (args.format, args.partial),
        Command::Check(_) => (None, false),
    };
    let flags = FlagOverrides {
        log_level: cli.log_level.clone(),
        format,
        partial,
    };
    let settings = Settings::load(cli.config.as_deref(), &flags)?;
    init_logging(&settings.log_level)?;
    tracing::debug!(?settings, "settings loaded");

    match cli.command {
        Command::Validate(args) => validate(&args, &settings),
        Command::Check(args) => check(&args.definitions),
    }
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level).with_context(|| format!("invalid log filter `{level}`"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {e}"))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn load_factory(definitions: &Definitions) -> anyhow::Result<(FormFactory, FormConfig)> {
    let metadata = match &definitions.metadata {
        Some(path) => MetadataRegistry::from_json_value(read_json(path)?)
            .with_context(|| format!("invalid metadata in {}", path.display()))?,
        None => MetadataRegistry::new(),
    };
    let form = &definitions.form;
    let config: FormConfig = serde_json::from_value(read_json(form)?)
        .with_context(|| format!("invalid form definition in {}", form.display()))?;
    config
        .check()
        .with_context(|| format!("invalid form definition in {}", form.display()))?;
    Ok((FormFactory::new().with_metadata(metadata), config))
}

fn build(definitions: &Definitions) -> anyhow::Result<FormNode> {
    let (factory, config) = load_factory(definitions)?;
    factory
        .create(definitions.name.clone(), config)
        .context("failed to build the form tree")
}

fn validate(args: &ValidateArgs, settings: &Settings) -> anyhow::Result<ExitCode> {
    let mut form = build(&args.definitions)?;
    if let Some(initial) = &args.initial {
        form.set_data(read_json(initial)?)
            .context("failed to bind initial data")?;
    }

    let data = read_json(&args.data)?;
    let submitted = if settings.partial {
        form.submit_partial(data)
    } else {
        form.submit(data)
    };
    submitted.context("submission rejected")?;

    let outcome = Outcome::from_form(&form);
    match settings.format {
        OutputFormat::Text => print!("{}", outcome.to_text()),
        OutputFormat::Json => println!("{}", outcome.to_json()?),
    }
    Ok(if outcome.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn check(definitions: &Definitions) -> anyhow::Result<ExitCode> {
    let form = build(definitions)?;
    println!(
        "ok: {} with {} top-level field(s)",
        form.path_display(),
        form.child_count()
    );
    Ok(ExitCode::SUCCESS)
}
