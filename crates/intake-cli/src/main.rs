//! Intake form command line interface.
//!
//! ```bash
//! # Validate a schema document (YAML or JSON)
//! intake validate schemas/trust_intake.yaml --strict
//!
//! # Print the normalized schema
//! intake normalize my_form.json --json
//!
//! # Replay an answers script against the bundled trust intake schema
//! intake fill --answers answers.yaml
//!
//! # ...and post the payload to INTAKE_API_URL
//! intake fill --answers answers.yaml --submit --user-id u-123
//! ```

mod script;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use intake_client::{HttpSubmissionClient, SubmissionEnvelope, SubmissionSink};
use intake_form::builtin::{trust_intake_schema, TRUST_INTAKE_YAML};
use intake_form::{
    load_schema_json, load_schema_yaml, EngineConfig, EventOutcome, FormSchema, FormSession,
    NormalizeOptions, Normalized,
};

#[derive(Parser)]
#[command(name = "intake")]
#[command(version)]
#[command(about = "Validate intake form schemas and replay answers into a form session")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine config YAML (INTAKE_* variables override it)
    #[arg(long, global = true, env = "INTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a schema document and report warnings
    Validate {
        /// Schema file (.json or .yaml); reads YAML from stdin if omitted
        file: Option<PathBuf>,

        /// Fail on dependencies naming fields outside their section
        #[arg(long)]
        strict: bool,
    },

    /// Print the normalized form of a schema document
    Normalize {
        file: Option<PathBuf>,

        /// Emit JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Print the bundled trust intake schema
    Builtin {
        /// Section list only
        #[arg(long)]
        summary: bool,
    },

    /// Replay an answers script and print the submission payload
    Fill {
        /// Schema file; the bundled trust intake schema if omitted
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Answers script (YAML list of set/add/remove steps)
        #[arg(long, short)]
        answers: Option<PathBuf>,

        /// Exit non-zero if any step is rejected
        #[arg(long)]
        strict: bool,

        /// POST the payload to the intake API
        #[arg(long)]
        submit: bool,

        #[arg(long, env = "INTAKE_USER_ID")]
        user_id: Option<String>,

        #[arg(long, env = "INTAKE_CLIENT_ID")]
        client_id: Option<String>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { file, strict } => {
            let options = NormalizeOptions {
                strict_dependencies: strict || config.strict_dependencies,
            };
            cmd_validate(file.as_deref(), options, cli.format)
        }
        Commands::Normalize { file, json } => cmd_normalize(file.as_deref(), &config, json),
        Commands::Builtin { summary } => cmd_builtin(summary),
        Commands::Fill {
            schema,
            answers,
            strict,
            submit,
            user_id,
            client_id,
        } => {
            let payload = cmd_fill(schema.as_deref(), answers.as_deref(), strict, config, cli.format)?;
            if submit {
                let user_id = user_id.context("--submit needs --user-id (or INTAKE_USER_ID)")?;
                cmd_submit(user_id, client_id, payload, cli.format).await?;
            }
            Ok(())
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_validate(file: Option<&Path>, options: NormalizeOptions, format: OutputFormat) -> Result<()> {
    let normalized = load_schema(file, options)?;
    let schema = &normalized.schema;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "sections": schema.len(),
                "fields": schema.field_count(),
                "warnings": normalized.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Pretty => {
            println!(
                "{} {} section(s), {} field(s)",
                "OK".green(),
                schema.len(),
                schema.field_count()
            );
            for warning in &normalized.warnings {
                println!("  {} {}", "warning".yellow(), warning);
            }
        }
    }
    Ok(())
}

fn cmd_normalize(file: Option<&Path>, config: &EngineConfig, json: bool) -> Result<()> {
    let normalized = load_schema(file, NormalizeOptions::from(config))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&normalized.schema.to_document())?);
    } else {
        print!("{}", normalized.schema.to_yaml_string()?);
    }
    Ok(())
}

fn cmd_builtin(summary: bool) -> Result<()> {
    if !summary {
        print!("{TRUST_INTAKE_YAML}");
        return Ok(());
    }
    let schema = trust_intake_schema()?;
    for (index, section) in schema.sections().iter().enumerate() {
        let repeat = if section.is_repeatable() {
            format!(" (up to {})", section.max_instances())
        } else {
            String::new()
        };
        println!(
            "{index:>2}  {}{}  [{} field(s)]",
            section.title.bold(),
            repeat.dimmed(),
            section.fields.len()
        );
    }
    Ok(())
}

fn cmd_fill(
    schema_file: Option<&Path>,
    answers: Option<&Path>,
    strict: bool,
    config: EngineConfig,
    format: OutputFormat,
) -> Result<intake_form::SubmissionPayload> {
    let schema: FormSchema = match schema_file {
        Some(path) => load_schema(Some(path), NormalizeOptions::from(&config))?.schema,
        None => trust_intake_schema()?,
    };
    let events = match answers {
        Some(path) => script::parse_script(&read_file(path)?)?,
        None => Vec::new(),
    };

    let mut session = FormSession::with_config(Arc::new(schema), config);
    let mut rejected = 0usize;
    for (index, event) in events.into_iter().enumerate() {
        if let EventOutcome::Rejected { message } = session.apply(event) {
            rejected += 1;
            eprintln!("{} step {index}: {message}", "rejected".yellow());
        }
    }
    if strict && rejected > 0 {
        bail!("{rejected} step(s) rejected");
    }

    let payload = session.submit();
    let fingerprint = payload.fingerprint()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&payload)?),
        OutputFormat::Pretty => {
            for (key, value) in payload.iter() {
                println!("{}: {}", key.cyan(), serde_json::to_string(value)?);
            }
            eprintln!("{} {} entries, fingerprint {}", "payload".green(), payload.len(), fingerprint);
        }
    }
    Ok(payload)
}

async fn cmd_submit(
    user_id: String,
    client_id: Option<String>,
    payload: intake_form::SubmissionPayload,
    format: OutputFormat,
) -> Result<()> {
    let client = HttpSubmissionClient::from_env()?;
    let envelope = SubmissionEnvelope::new(user_id, client_id, payload)?;
    let receipt = client
        .submit(&envelope)
        .await
        .with_context(|| format!("submitting to {}", client.endpoint()))?;

    match format {
        OutputFormat::Json => eprintln!("{}", serde_json::to_string(&receipt)?),
        OutputFormat::Pretty => eprintln!(
            "{} {} (id {})",
            "submitted".green().bold(),
            receipt.message,
            receipt.id.as_deref().unwrap_or("-")
        ),
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let base = match path {
        Some(path) => EngineConfig::from_yaml_str(&read_file(path)?)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(base.apply_env_overrides()?)
}

fn load_schema(file: Option<&Path>, options: NormalizeOptions) -> Result<Normalized> {
    let normalized = match file {
        Some(path) => {
            let text = read_file(path)?;
            let is_json = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            let loaded = if is_json {
                load_schema_json(&text, options)
            } else {
                load_schema_yaml(&text, options)
            };
            loaded.with_context(|| format!("loading schema {}", path.display()))?
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading schema from stdin")?;
            load_schema_yaml(&text, options)?
        }
    };
    Ok(normalized)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
