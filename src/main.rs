//! stash - A periodic backup scheduler.
//!
//! Usage:
//!   stash run <config>             Run the scheduler with the jobs in a config file
//!   stash validate <config>        Validate a config file without running
//!   stash list <config>            List all jobs in a config file
//!   stash trigger <config> <job>   Run one job once and wait for it

use clap::{Parser, Subcommand};
use stash::config::{JobConfigBuilder, StashConfig, YamlLoader, build_scheduler};
use stash::{Event, EventHandler, SchedulerHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// stash - A periodic backup scheduler
#[derive(Parser)]
#[command(name = "stash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler with the jobs in a config file
    Run {
        /// Path to the YAML config file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Maximum concurrent jobs (overrides the config file)
        #[arg(short = 'j', long)]
        max_jobs: Option<usize>,

        /// Scheduler tick interval in milliseconds (overrides the config file)
        #[arg(long)]
        tick_interval_ms: Option<u64>,
    },

    /// Validate a config file without running
    Validate {
        /// Path to the YAML config file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// List all jobs in a config file
    List {
        /// Path to the YAML config file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Run one job once (one-shot execution)
    Trigger {
        /// Path to the YAML config file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Name of the job to run
        #[arg(value_name = "JOB")]
        job: String,
    },
}

/// Event handler that logs job lifecycle events.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::JobStarted { job_id, run_id, .. } => {
                info!(job = %job_id, run_id = %run_id, "Job started");
            }
            Event::JobCompleted {
                job_id,
                run_id,
                artifact,
                duration,
                ..
            } => match artifact {
                Some(path) => info!(
                    job = %job_id,
                    run_id = %run_id,
                    artifact = %path.display(),
                    ?duration,
                    "Job completed"
                ),
                None => error!(
                    job = %job_id,
                    run_id = %run_id,
                    ?duration,
                    "Job produced no artifact"
                ),
            },
            Event::JobSkipped { job_id, reason, .. } => {
                warn!(job = %job_id, %reason, "Job skipped");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            max_jobs,
            tick_interval_ms,
        } => {
            run_scheduler(config, max_jobs, tick_interval_ms).await?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
        Commands::List { config } => {
            list_jobs(config)?;
        }
        Commands::Trigger { config, job } => {
            trigger_job(config, job).await?;
        }
    }

    Ok(())
}

/// Run the scheduler until Ctrl+C.
async fn run_scheduler(
    path: PathBuf,
    max_jobs: Option<usize>,
    tick_interval_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(config = %path.display(), "Loading configuration");

    let mut config = YamlLoader::load_config(&path)?;
    if let Some(max) = max_jobs {
        config.settings.max_concurrent_jobs = Some(max);
    }
    if let Some(ms) = tick_interval_ms {
        config.settings.tick_interval_ms = ms;
    }

    if config.jobs.is_empty() {
        warn!(config = %path.display(), "No jobs defined");
        return Ok(());
    }

    let scheduler = build_scheduler(&config, JobConfigBuilder::new())?;
    scheduler.event_bus().register(Arc::new(LoggingHandler)).await;

    info!("Loaded {} job(s):", config.jobs.len());
    for job in scheduler.jobs() {
        info!(
            "  - {} ({}): every {:?}",
            job.id(),
            job.kind(),
            job.delay()
        );
    }

    info!(tick_interval = ?scheduler.tick_interval(), "Starting scheduler");
    info!("Press Ctrl+C to stop");

    let (handle, scheduler_task) = scheduler.start();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            handle.shutdown().await?;
        }
        _ = scheduler_task => {
            info!("Scheduler stopped");
        }
    }

    info!("Goodbye!");
    Ok(())
}

/// Validate a config file and build every job without running anything.
fn validate_config(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!(config = %path.display(), "Validating configuration");

    let result = YamlLoader::load_config(&path).and_then(|config| {
        JobConfigBuilder::new().build_all(&config.jobs)?;
        Ok(config)
    });

    match result {
        Ok(config) => {
            info!("All {} job(s) are valid:", config.jobs.len());
            for job in &config.jobs {
                info!("  - {} ({}): OK", job.name, job.job_type.to_lowercase());
            }
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Print every job in a config file.
fn list_jobs(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config: StashConfig = YamlLoader::load_config(&path)?;

    if config.jobs.is_empty() {
        println!("No jobs defined in {}", path.display());
        return Ok(());
    }

    println!("Jobs in {}:", path.display());
    println!();

    for job in &config.jobs {
        println!("Name: {}", job.name);
        println!("  Type: {}", job.job_type.to_lowercase());
        println!("  Delay: {:?}", job.delay());
        for source in job.directory.paths() {
            println!("    - {}", source);
        }
        if let Some(local) = job.local_path() {
            println!("  Destination: {}", local);
        }
        if let Some(server) = &job.server {
            println!(
                "  Remote: {}@{}:{}{}",
                server.user, server.address, server.port, server.destination
            );
            println!("  Keep local: {}", job.keep_local);
        }
        println!();
    }

    Ok(())
}

/// Event handler that signals when a specific job completes.
struct CompletionWatcher {
    target_job: String,
    completed: Arc<tokio::sync::Notify>,
}

#[async_trait::async_trait]
impl EventHandler for CompletionWatcher {
    async fn handle(&self, event: &Event) {
        if let Event::JobCompleted { job_id, .. } = event
            && job_id.as_str() == self.target_job
        {
            self.completed.notify_one();
        }
    }
}

/// Run one job once and wait for it to finish.
async fn trigger_job(path: PathBuf, job: String) -> Result<(), Box<dyn std::error::Error>> {
    info!(config = %path.display(), "Loading configuration");

    let config = YamlLoader::load_config(&path)?;

    if !config.jobs.iter().any(|j| j.name == job) {
        error!("Job '{}' not found", job);
        error!(
            "Available jobs: {}",
            config
                .jobs
                .iter()
                .map(|j| j.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        return Err(format!("Job '{}' not found", job).into());
    }

    let scheduler = build_scheduler(&config, JobConfigBuilder::new())?.start_paused();
    scheduler.event_bus().register(Arc::new(LoggingHandler)).await;

    // Register the watcher before starting so the completion cannot be missed
    let completed = Arc::new(tokio::sync::Notify::new());
    let watcher = CompletionWatcher {
        target_job: job.clone(),
        completed: completed.clone(),
    };
    scheduler.event_bus().register(Arc::new(watcher)).await;

    let (handle, scheduler_task) = scheduler.start();

    info!(job = %job, "Triggering job");
    if let Err(e) = handle.trigger(job.as_str()).await {
        error!("Failed to trigger job: {}", e);
        stop(&handle, scheduler_task).await?;
        return Err(e.into());
    }

    tokio::select! {
        _ = completed.notified() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, waiting for the running job to finish");
        }
    }

    stop(&handle, scheduler_task).await?;
    info!("Done!");
    Ok(())
}

async fn stop(
    handle: &SchedulerHandle,
    task: tokio::task::JoinHandle<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    handle.shutdown().await?;
    task.await?;
    Ok(())
}
