//! `abk run` and `abk copy`: plan a job tree and drive it to completion.

use abk_core::config::{AbkConfig, PathMapping};
use abk_core::control::JobControl;
use abk_core::copy::{plan_mapping, plan_mappings, CopyExecutor, FileCopyJob, PlanSettings};
use abk_core::job::Job;
use abk_core::scheduler::JobScheduler;
use abk_core::work::{BoundedScheduler, WorkSettings};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;

const PROGRESS_INTERVAL_MS: u128 = 500;

pub async fn run_mappings(cfg: &AbkConfig, jobs: Option<usize>) -> Result<()> {
    if cfg.mappings.is_empty() {
        println!("no mappings configured; see `abk map add`");
        return Ok(());
    }
    let control = Arc::new(JobControl::new());
    let token = control.register("run");
    let job = plan_mappings(&cfg.mappings, &PlanSettings::from(cfg), &token)?;
    let result = drive(cfg, jobs, job, &control).await;
    control.unregister("run");
    result
}

pub async fn run_copy(
    cfg: &AbkConfig,
    source: &Path,
    target: &Path,
    jobs: Option<usize>,
) -> Result<()> {
    let control = Arc::new(JobControl::new());
    let token = control.register("copy");
    let mapping = PathMapping {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
    };
    let job = plan_mapping(&mapping, &PlanSettings::from(cfg), &token)?;
    let result = drive(cfg, jobs, job, &control).await;
    control.unregister("copy");
    result
}

async fn drive(
    cfg: &AbkConfig,
    jobs: Option<usize>,
    job: Job<FileCopyJob>,
    control: &Arc<JobControl>,
) -> Result<()> {
    let mut settings = WorkSettings::from(cfg);
    if let Some(n) = jobs {
        settings.max_concurrency = n;
    }
    let work = BoundedScheduler::with_settings(settings)?;
    let scheduler = JobScheduler::new(CopyExecutor::from_config(cfg), work);

    let files = job.leaves().len();
    tracing::info!(
        job = %job.description(),
        files,
        max_concurrency = settings.max_concurrency,
        "backup starting"
    );

    let printer = job.progress().map(|p| {
        let mut rx = p.subscribe();
        tokio::spawn(async move {
            let mut last_print = Instant::now();
            loop {
                match rx.recv().await {
                    Ok(changed) => {
                        if last_print.elapsed().as_millis() >= PROGRESS_INTERVAL_MS {
                            println!("{}", progress_line(changed.new));
                            last_print = Instant::now();
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    let interrupt = {
        let control = Arc::clone(control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupted; cancelling backup");
                control.cancel_all();
            }
        })
    };

    let tracked = job.clone();
    let started = Instant::now();
    let result = scheduler.schedule_job(job).await;
    interrupt.abort();
    if let Some(printer) = printer {
        printer.abort();
        // Wait for the abort so the final line is not interleaved.
        let _ = printer.await;
    }

    match result {
        Ok(()) => {
            if let Some(line) = final_progress_line(&tracked) {
                println!("{line}");
            }
            println!(
                "backed up {} file(s) in {:.1}s",
                files,
                started.elapsed().as_secs_f64()
            );
            tracing::info!(files, "backup finished");
            Ok(())
        }
        Err(err) => {
            tracing::warn!(error = %err, "backup failed");
            Err(err).context("backup failed")
        }
    }
}

fn progress_line(progress: f64) -> String {
    format!("  {:.1}%", progress * 100.0)
}

/// Last progress value of the root job, read directly once the run is over.
fn final_progress_line(job: &Job<FileCopyJob>) -> Option<String> {
    job.progress().map(|p| progress_line(p.progress()))
}
