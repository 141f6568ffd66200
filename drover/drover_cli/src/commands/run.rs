use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use drover_core::{HandleId, PoolStatus};
use drover_driver::{session_pool, DriverConfig, SessionPool};
use drover_pool::ShutdownReport;
use serde::Serialize;
use tracing::{debug, error, info};

pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub capacity: Option<usize>,
    pub consumers: usize,
    pub hold_ms: u64,
    pub rounds: usize,
}

#[derive(Serialize)]
struct TeardownFailure {
    handle: HandleId,
    error: String,
}

#[derive(Serialize)]
struct ShutdownSummary {
    destroyed: usize,
    deferred: Vec<HandleId>,
    failures: Vec<TeardownFailure>,
}

impl From<&ShutdownReport> for ShutdownSummary {
    fn from(report: &ShutdownReport) -> Self {
        Self {
            destroyed: report.destroyed,
            deferred: report.deferred.clone(),
            failures: report
                .failures
                .iter()
                .map(|(handle, e)| TeardownFailure {
                    handle: *handle,
                    error: e.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct RunSummary {
    consumers: usize,
    rounds: usize,
    consumer_errors: Vec<String>,
    status: PoolStatus,
    shutdown: ShutdownSummary,
}

fn consume(pool: Arc<SessionPool>, worker: usize, rounds: usize, hold: Duration) -> Result<()> {
    for round in 0..rounds {
        let session = pool
            .acquire()
            .with_context(|| format!("consumer {} round {}", worker, round))?;
        debug!(
            "Consumer {} holds session {} at {}",
            worker,
            session.id(),
            session.endpoint()
        );
        thread::sleep(hold);
        session.release()?;
    }
    Ok(())
}

/// Drive a session pool with concurrent consumers, then shut it down and
/// report.
pub fn run(options: RunOptions) -> Result<ExitCode> {
    let mut config = DriverConfig::load(options.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(capacity) = options.capacity {
        config.pool.capacity = capacity;
    }

    let pool = session_pool(config).context("Invalid pool configuration")?;
    info!(
        "Running {} consumer(s) x {} round(s) against a pool of {}",
        options.consumers,
        options.rounds,
        pool.capacity()
    );

    let hold = Duration::from_millis(options.hold_ms);
    let workers: Vec<_> = (0..options.consumers)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            let rounds = options.rounds;
            thread::spawn(move || consume(pool, worker, rounds, hold))
        })
        .collect();

    let mut consumer_errors = Vec::new();
    for worker in workers {
        match worker.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{:#}", e);
                consumer_errors.push(format!("{:#}", e));
            }
            Err(_) => consumer_errors.push("consumer thread panicked".to_string()),
        }
    }

    let report = pool.shutdown()?;
    let summary = RunSummary {
        consumers: options.consumers,
        rounds: options.rounds,
        consumer_errors,
        status: pool.status(),
        shutdown: ShutdownSummary::from(&report),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.consumer_errors.is_empty() {
        return Err(anyhow!(
            "{} consumer(s) failed",
            summary.consumer_errors.len()
        ));
    }

    report
        .into_result()
        .map(|_| ExitCode::SUCCESS)
        .context("Pool teardown was incomplete")
}
