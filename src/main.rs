use chrono::{Local, NaiveDate};
use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use slotbook::client::{BetterClient, BetterClientFactory, BookingClient};
use slotbook::config::Config;
use slotbook::domain::{AttemptOutcome, AttemptSpec, BookingJob, Credentials, JobOutcome, TimeWindow, format_slots};
use slotbook::notify::LogSink;
use slotbook::retry::RetryPolicy;
use slotbook::runner::{AttemptExecutor, JobRunner, validate_credentials};

mod cli;

use cli::Cli;
use cli::commands::{AccountArgs, Commands};

fn setup_logging(verbose: bool, level: Option<&str>) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    let mut builder = env_logger::Builder::from_env(env);

    if verbose {
        builder.target(env_logger::Target::Stderr).init();
        info!("Logging initialized, writing to stderr");
        return Ok(());
    }

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slotbook")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("slotbook.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config, cancel: CancellationToken) -> Result<ExitCode> {
    info!("Starting application");

    match &cli.command {
        Commands::Book {
            venue,
            activity,
            date,
            min_slot_time,
            max_slot_time,
            n_slots,
            account,
        } => {
            let window = TimeWindow::parse(min_slot_time.as_deref(), max_slot_time.as_deref())?;
            let spec = AttemptSpec::new(credentials(account), venue, activity, window, *n_slots)?;
            handle_book_command(&spec, *date, config, cancel).await
        }
        Commands::Run { jobs, skip_validation } => handle_run_command(jobs, *skip_validation, config, cancel).await,
        Commands::Slots {
            venue,
            activity,
            date,
            account,
        } => handle_slots_command(venue, activity, *date, account, config, cancel).await,
        Commands::Validate => handle_validate_command(config, cancel).await,
        Commands::Jobs => handle_jobs_command(config),
    }
}

fn credentials(account: &AccountArgs) -> Credentials {
    Credentials::new(account.username.clone(), account.password.clone())
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn handle_book_command(
    spec: &AttemptSpec,
    date: NaiveDate,
    config: &Config,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let today = Local::now().date_naive();
    if date < today {
        bail!("Cannot book {}: the date is in the past", date);
    }

    info!("One-shot booking: {} on {}", spec, date);
    println!("{} {} on {}", "Booking:".cyan(), spec, date);

    let client = BetterClient::new(&config.api)?;
    let executor = AttemptExecutor::new(RetryPolicy::new(&config.retry), cancel);
    let outcome = executor.execute(&client, spec, date, 0).await;

    match &outcome {
        AttemptOutcome::Success { .. } => println!("{} {}", "✓".green(), outcome),
        AttemptOutcome::Failure(_) => println!("{} {}", "✗".red(), outcome),
    }
    Ok(exit_code(outcome.is_success()))
}

fn select_jobs(all: Vec<BookingJob>, names: &[String]) -> Result<Vec<BookingJob>> {
    if all.is_empty() {
        bail!("No booking jobs configured");
    }
    if names.is_empty() {
        return Ok(all);
    }

    let unknown: Vec<&str> = names
        .iter()
        .filter(|name| !all.iter().any(|job| job.name() == name.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        bail!("Unknown job(s): {}", unknown.join(", "));
    }

    Ok(all
        .into_iter()
        .filter(|job| names.iter().any(|name| name == job.name()))
        .collect())
}

fn print_job_outcome(outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Success {
            job,
            attempt,
            confirmation,
            slots,
        } => println!(
            "{} {}: booked {} (attempt {}, order {})",
            "✓".green(),
            job.bold(),
            format_slots(slots),
            attempt + 1,
            confirmation
        ),
        JobOutcome::AllFailed { job, failures } => {
            println!(
                "{} {}: all {} attempt(s) failed",
                "✗".red(),
                job.bold(),
                failures.len()
            );
            for failure in failures {
                println!("    {}", failure.to_string().dimmed());
            }
        }
    }
}

async fn handle_run_command(
    names: &[String],
    skip_validation: bool,
    config: &Config,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let jobs = select_jobs(config.jobs()?, names)?;
    let policy = RetryPolicy::new(&config.retry);
    let factory = Arc::new(BetterClientFactory::new(&config.api)?);

    if skip_validation {
        warn!("Skipping credential validation");
    } else {
        let checked = validate_credentials(factory.as_ref(), &policy, &cancel, &jobs).await?;
        println!("{} {} account(s) validated", "✓".green(), checked);
    }

    println!("{} {} job(s)", "Running:".cyan(), jobs.len());
    let runner = JobRunner::new(factory, policy, cancel)
        .with_sink(Arc::new(LogSink))
        .with_job_timeout(config.job_timeout());
    let outcomes = runner.run_all(&jobs, Local::now().date_naive()).await;

    for outcome in &outcomes {
        print_job_outcome(outcome);
    }
    Ok(exit_code(outcomes.iter().all(JobOutcome::is_success)))
}

async fn handle_slots_command(
    venue: &str,
    activity: &str,
    date: NaiveDate,
    account: &AccountArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let client = BetterClient::new(&config.api)?;
    let policy = RetryPolicy::new(&config.retry);
    let credentials = credentials(account);

    let client = &client;
    let credentials = &credentials;
    let session = policy
        .run(&cancel, move || client.authenticate(credentials))
        .await
        .context("Failed to log in")?;
    let session = &session;
    let slots = policy
        .run(&cancel, move || client.list_slots(session, venue, activity, date))
        .await
        .context("Failed to list slots")?;

    if slots.is_empty() {
        println!("No available slots for {} at {} on {}", activity, venue, date);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {} at {} on {}", "Available:".cyan(), activity, venue, date);
    for slot in &slots {
        println!("  {}", slot);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_validate_command(config: &Config, cancel: CancellationToken) -> Result<ExitCode> {
    let jobs = config.jobs()?;
    let factory = BetterClientFactory::new(&config.api)?;
    let policy = RetryPolicy::new(&config.retry);

    match validate_credentials(&factory, &policy, &cancel, &jobs).await {
        Ok(checked) => {
            println!("{} {} account(s) valid", "✓".green(), checked);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn handle_jobs_command(config: &Config) -> Result<ExitCode> {
    let jobs = config.jobs()?;
    if jobs.is_empty() {
        println!("No booking jobs configured");
        return Ok(ExitCode::SUCCESS);
    }

    for job in &jobs {
        println!(
            "{}  schedule: {}  days ahead: {}{}",
            job.name().bold(),
            job.schedule().unwrap_or("-"),
            job.days_ahead(),
            if job.discord_webhook_url().is_some() { "  (discord)" } else { "" }
        );
        for (i, spec) in job.attempts().iter().enumerate() {
            println!("  {}. {} {}", i + 1, spec.credentials().username.yellow(), spec);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // .env first so clap can read credentials from it
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config_path = Config::locate(cli.config.as_ref());
    let loaded = match &config_path {
        Some(path) => Config::load_from_file(path),
        None => Ok(Config::default()),
    };
    // book and slots only need the api and retry sections
    let (config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) if !cli.command.uses_bookings() => (Config::default(), Some(e)),
        Err(e) => return Err(e).context("Failed to load configuration"),
    };

    setup_logging(cli.is_verbose(), config.log_level.as_deref()).context("Failed to setup logging")?;

    match (load_error, &config_path) {
        (Some(e), _) => {
            warn!("Using default configuration: {}", e);
            eprintln!("{} {}, using defaults", "Warning:".yellow(), e);
        }
        (None, Some(path)) => info!("Loaded config from: {}", path.display()),
        (None, None) => info!("No config file found, using defaults"),
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling running jobs");
                cancel.cancel();
            }
        }
    });

    run_application(&cli, &config, cancel).await.context("Application failed")
}
