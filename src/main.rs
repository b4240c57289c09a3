use anyhow::{Context, Result};
use nutri_report::cli::{parse_args, Command};
use nutri_report::config::PipelineConfig;
use nutri_report::error::{ServiceError, ServiceResult};
use nutri_report::profile::QuizAnswers;
use nutri_report::service::{ReportRequest, ReportService};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use tokio::fs;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_answers(path: &Path) -> Result<QuizAnswers> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read profile file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Profile file '{}' is not valid quiz JSON", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> ServiceResult<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", rendered);
    Ok(())
}

async fn run(service: &ReportService, command: Command) -> ServiceResult<()> {
    // An unreadable profile file is a bad request, not an internal failure.
    let answers = read_answers(command.profile_path())
        .await
        .map_err(|e| ServiceError::invalid_input(format!("{:#}", e)))?;

    match command {
        Command::MealPlan { days, .. } => print_json(&service.generate_meal_plan(&answers, days)?),
        Command::Narratives { .. } => print_json(&service.generate_narratives(&answers).await?),
        Command::Report {
            tier,
            order_id,
            add_ons,
            days,
            ..
        } => {
            let request = ReportRequest {
                profile: answers,
                tier,
                order_id,
                add_ons,
                num_days: days,
            };
            print_json(&service.generate_full_report(&request).await?)
        }
    }
}

fn exit_code_for(err: &ServiceError) -> ExitCode {
    match err {
        ServiceError::InvalidInput(_) => ExitCode::from(2),
        ServiceError::ValidationExhausted { .. } => ExitCode::from(3),
        ServiceError::Unexpected(_) => ExitCode::from(1),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_args();
    // Loads `.env` first, so RUST_LOG set there reaches the subscriber.
    let config = PipelineConfig::from_env();
    init_logging();

    let service = config.and_then(|config| ReportService::from_config(config, !cli.no_rewrite));
    let result = match service {
        Ok(service) => run(&service, cli.command).await,
        Err(e) => Err(ServiceError::Unexpected(e)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(status = err.status_code().as_u16(), error = %err, "Request failed");
            println!("{}", err.to_body());
            exit_code_for(&err)
        }
    }
}
