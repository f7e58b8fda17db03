use crate::{
    commands::{Commands, SettingsCommand, TemplatesCommand},
    env::EnvManager,
    error::CliError,
    shutdown::{ExitStatus, cancel_on_signal},
};
use clap::Parser;
use engine_config::{
    report::columns::summarize_columns,
    settings::{
        ProcessingSettings, ValidatedSettings, env::apply_overrides_from, loader,
        validator::SettingsValidator,
    },
};
use engine_runtime::{
    executor::{Executor, TaskSpec},
    factory,
    workflow::{WorkflowDefinition, WorkflowRunner},
};
use model::jobs::RowRange;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "cellpipe",
    version,
    about = "Rewrite spreadsheet cells with a language model"
)]
struct Cli {
    #[arg(long, global = true, help = "Settings file (defaults to the user config dir)")]
    settings: Option<PathBuf>,

    #[arg(long, global = true, help = "Extra .env file to load")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitStatus::Failed
        }
    };

    std::process::exit(code.code());
}

async fn run(cli: Cli) -> Result<ExitStatus, CliError> {
    let mut env = EnvManager::new();
    env.load_dotenv()?;
    if let Some(path) = &cli.env_file {
        env.load_from_file(path)?;
    }

    let settings_path = match cli.settings {
        Some(path) => path,
        None => loader::default_path()?,
    };
    let stored = loader::load_from(&settings_path)?;
    init_logging(&stored.log_level);

    match cli.command {
        Commands::Run {
            input,
            targets,
            context,
            prompt,
            template,
            system_prompt,
            start,
            end,
            output,
        } => {
            let (settings, validated) = effective_settings(stored, &env)?;
            let user_prompt = match (prompt, template) {
                (Some(prompt), _) => prompt,
                (None, Some(name)) => settings.templates.resolve(&name)?.to_string(),
                (None, None) => {
                    return Err(CliError::Config(
                        "either --prompt or --template is required".into(),
                    ));
                }
            };
            let rows = start.zip(end).map(|(start, end)| RowRange::new(start, end));
            let task = TaskSpec {
                rows,
                targets,
                context,
                system_prompt,
                user_prompt,
            };

            let provider = factory::create_provider(&settings, &validated)?;
            let executor = Executor::new(settings, validated);
            let cancel = cancel_on_signal();

            let report = executor
                .run_file(&input, &task, provider, cancel.clone())
                .await?;

            if output.is_some() {
                output::print_summary(&report.summary);
            }
            output::emit_reports(std::slice::from_ref(&report.summary), output.as_deref())?;
            Ok(ExitStatus::after_run(report.outcome.cancelled, &cancel))
        }
        Commands::Workflow {
            config,
            input,
            output,
        } => {
            let (settings, validated) = effective_settings(stored, &env)?;
            let definition = WorkflowDefinition::from_path(&config)?;
            info!(workflow = %definition.name, steps = definition.steps.len(), "Loaded workflow");

            let provider = factory::create_provider(&settings, &validated)?;
            let executor = Executor::new(settings, validated);
            let cancel = cancel_on_signal();

            let report = WorkflowRunner::new(&executor)
                .run_file(&definition, input.as_deref(), provider, cancel.clone())
                .await?;

            if output.is_some() {
                report.reports.iter().for_each(output::print_summary);
            }
            output::emit_reports(&report.reports, output.as_deref())?;
            if report.cancelled {
                warn!(
                    workflow = %report.workflow,
                    steps_run = report.steps_run(),
                    "Workflow stopped early"
                );
            }
            Ok(ExitStatus::after_run(report.cancelled, &cancel))
        }
        Commands::Inspect { input, json } => {
            let store = factory::create_store(&input)?;
            let table = store.load()?;
            let columns = summarize_columns(&table);

            if json {
                println!("{}", serde_json::to_string_pretty(&columns)?);
            } else {
                output::print_columns(table.row_count(), &columns);
            }
            Ok(ExitStatus::Ok)
        }
        Commands::TestConn => {
            let (settings, validated) = effective_settings(stored, &env)?;
            conn::pinger_for(&settings, &validated)?.ping().await?;
            println!("Connection to {} OK", settings.api_type);
            Ok(ExitStatus::Ok)
        }
        Commands::Settings { command } => {
            settings_command(command, stored, &settings_path)?;
            Ok(ExitStatus::Ok)
        }
        Commands::Templates { command } => {
            templates_command(command, stored, &settings_path)?;
            Ok(ExitStatus::Ok)
        }
    }
}

/// `RUST_LOG` wins; otherwise the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn effective_settings(
    mut settings: ProcessingSettings,
    env: &EnvManager,
) -> Result<(ProcessingSettings, ValidatedSettings), CliError> {
    apply_overrides_from(&mut settings, |var| env.get(var))?;
    let validated = SettingsValidator::new(&settings).validate()?;
    Ok((settings, validated))
}

fn settings_command(
    command: SettingsCommand,
    settings: ProcessingSettings,
    path: &Path,
) -> Result<(), CliError> {
    match command {
        SettingsCommand::Show => {
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            loader::save(&ProcessingSettings::default(), path)?;
            println!("Wrote default settings to {}", path.display());
        }
    }
    Ok(())
}

fn templates_command(
    command: TemplatesCommand,
    mut settings: ProcessingSettings,
    path: &Path,
) -> Result<(), CliError> {
    match command {
        TemplatesCommand::List => {
            for (name, prompt) in settings.templates.iter() {
                println!("{name:<24} {prompt}");
            }
        }
        TemplatesCommand::Add {
            name,
            prompt,
            force,
        } => {
            settings.templates.add(name.as_str(), prompt, force)?;
            loader::save(&settings, path)?;
            println!("Saved template '{name}'");
        }
        TemplatesCommand::Remove { name } => {
            settings.templates.remove(&name)?;
            loader::save(&settings, path)?;
            println!("Removed template '{name}'");
        }
    }
    Ok(())
}
