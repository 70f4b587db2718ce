//! Command line front end.
//!
//! Each command builds a [`Session`], loads one file into it and drives the
//! same operations an interactive front end would.

#![expect(clippy::print_stdout)]

use crate::ai::AIAssistant;
use crate::config::{self, AppConfig};
use crate::export::ExportFormat;
use crate::pipeline::{ApplyOutcome, OperationScript, validate_script};
use crate::session::Session;
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "tabletalk",
    version,
    about = "Transform tables and ask questions about them"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the summary the question-answering model sees
    Summary {
        /// CSV or XLSX file
        file: PathBuf,

        /// Rows in the preview section
        #[arg(long)]
        rows: Option<usize>,
    },
    /// Ask a question about a table
    Ask {
        /// CSV or XLSX file
        file: PathBuf,

        question: String,

        /// Operation script applied before asking
        #[arg(long)]
        ops: Option<PathBuf>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },
    /// Apply an operation script and export the result
    Transform {
        /// CSV or XLSX file
        file: PathBuf,

        /// JSON operation script (see `ops-template`)
        #[arg(long)]
        ops: PathBuf,

        /// Output path. Defaults to `<stem>_transformed.<ext>` next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format. Inferred from `--output` when omitted.
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// Stop at the first operation that fails instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Check an operation script against a table without applying it
    Validate {
        file: PathBuf,

        #[arg(long)]
        ops: PathBuf,
    },
    /// Print an example operation script
    OpsTemplate,
    /// Show the configuration file location and effective settings
    Config {
        /// Write the defaults to the configuration file
        #[arg(long)]
        init: bool,
    },
}

pub async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Summary { file, rows } => handle_summary(&file, rows),
        Commands::Ask {
            file,
            question,
            ops,
            model,
        } => handle_ask(&file, &question, ops.as_deref(), model).await,
        Commands::Transform {
            file,
            ops,
            output,
            format,
            strict,
        } => handle_transform(&file, &ops, output, format, strict),
        Commands::Validate { file, ops } => handle_validate(&file, &ops),
        Commands::OpsTemplate => {
            println!("{}", OperationScript::template().to_json()?);
            Ok(())
        }
        Commands::Config { init } => handle_config(init),
    }
}

fn file_label(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Invalid file name: {}", path.display()))
}

/// Session with `file` loaded, using the stored config and environment key.
fn open_session(file: &Path, config: AppConfig) -> Result<Session> {
    let mut session = Session::new(config, config::api_key_from_env());
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    session.upload(&file_label(file)?, &bytes)?;
    Ok(session)
}

/// Apply every operation of `script`, returning the failures as warnings.
fn run_script(session: &mut Session, script: &OperationScript, strict: bool) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    for (index, op) in script.operations.iter().enumerate() {
        match session.apply(op) {
            Ok(ApplyOutcome::Applied(description)) => println!("  ✓ {description}"),
            Ok(ApplyOutcome::Skipped(reason)) => {
                println!("  - {reason}");
                warnings.push(format!("Operation {}: {reason}", index + 1));
            }
            Err(e) if strict => {
                return Err(e).with_context(|| format!("Operation {} ({}) failed", index + 1, op.kind()));
            }
            Err(e) => {
                println!("  ✗ {}: {e}", op.kind());
                warnings.push(format!("Operation {} ({}): {e}", index + 1, op.kind()));
            }
        }
    }

    Ok(warnings)
}

fn handle_summary(file: &Path, rows: Option<usize>) -> Result<()> {
    let mut config = config::load_app_config();
    if let Some(rows) = rows {
        config.preview_rows = rows;
    }
    let session = open_session(file, config)?;
    println!("{}", session.summary()?);
    Ok(())
}

async fn handle_ask(
    file: &Path,
    question: &str,
    ops: Option<&Path>,
    model: Option<String>,
) -> Result<()> {
    let mut config = config::load_app_config();
    if let Some(model) = model {
        config.ai.model = model;
    }
    let mut session = open_session(file, config)?;

    if let Some(ops) = ops {
        let script = OperationScript::from_file(ops)?;
        run_script(&mut session, &script, true)?;
    }

    let api_key = session.api_key().with_context(|| {
        format!(
            "API key not configured: set {}",
            config::API_KEY_VARS.join(" or ")
        )
    })?;
    let assistant = AIAssistant::new(api_key, session.config().ai.clone());
    let answer = session.ask(&assistant, question).await?;
    println!("{answer}");
    Ok(())
}

fn handle_transform(
    file: &Path,
    ops: &Path,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    strict: bool,
) -> Result<()> {
    let script = OperationScript::from_file(ops)?;
    let mut session = open_session(file, config::load_app_config())?;

    if let Some(pipeline) = session.pipeline() {
        for error in validate_script(&script.operations, pipeline.original()) {
            tracing::warn!("{error}");
        }
    }

    println!(
        "Applying {} operation(s) from '{}'",
        script.operations.len(),
        script.name
    );
    let warnings = run_script(&mut session, &script, strict)?;

    let format = format
        .or_else(|| output.as_deref().and_then(format_from_path))
        .unwrap_or(ExportFormat::Csv);
    let output = match output {
        Some(path) => path,
        None => file.with_file_name(session.export_file_name(None, format)),
    };

    let bytes = session.export(format)?;
    std::fs::write(&output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(pipeline) = session.pipeline() {
        println!(
            "Wrote {} rows x {} columns to {}",
            pipeline.current().height(),
            pipeline.current().width(),
            output.display()
        );
    }
    if !warnings.is_empty() {
        println!("{} operation(s) did not change the table", warnings.len());
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
    }
    Ok(())
}

fn format_from_path(path: &Path) -> Option<ExportFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some(ExportFormat::Csv),
        "xlsx" => Some(ExportFormat::Xlsx),
        _ => None,
    }
}

fn handle_validate(file: &Path, ops: &Path) -> Result<()> {
    let script = OperationScript::from_file(ops)?;
    let session = open_session(file, config::load_app_config())?;
    let pipeline = session.pipeline().context("No dataset loaded")?;

    let errors = validate_script(&script.operations, pipeline.original());
    if errors.is_empty() {
        println!("{} operation(s) look valid", script.operations.len());
        return Ok(());
    }
    for error in &errors {
        println!("{error}");
    }
    anyhow::bail!("{} of {} operation(s) failed validation", errors.len(), script.operations.len())
}

fn handle_config(init: bool) -> Result<()> {
    let path = config::get_config_path()?;
    let config = config::load_app_config();
    if init {
        config::save_app_config(&config)?;
        println!("Wrote {}", path.display());
    } else {
        println!("{}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
