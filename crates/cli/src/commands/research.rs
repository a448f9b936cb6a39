//! Research command - launch a deep research job and follow it

use anyhow::{Result, bail};
use product_scout_domain::usecases::{
    PollHandle, PollState, ResearchObserver, ResearchPoller, format_elapsed,
};
use product_scout_domain::{Clock, ResearchJob, ResearchStatusSource, SystemClock};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::args::ResearchArgs;
use crate::config::AppConfig;
use crate::wiring;

/// Manual re-polls after a failed status read before giving up
const MAX_RETRIES: u32 = 3;

pub async fn execute(args: ResearchArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut options = wiring::research_options(&config);
    options.max_depth = args.max_depth.unwrap_or(options.max_depth);
    options.time_limit = args.time_limit.unwrap_or(options.time_limit);
    options.max_urls = args.max_urls.unwrap_or(options.max_urls);

    let search = wiring::build_search(&config, clock.clone());
    let launch = search.deep_research(&args.query, &options).await?;
    let started = Instant::now();

    println!("Deep research job: {}", launch.job_id);
    if launch.is_mock_data {
        println!("Note: showing mock data");
    }
    if let Some(error) = &launch.error {
        println!("Warning: {}", error);
    }

    if launch.data.is_completed() {
        print_final(&launch.data, started.elapsed());
        return Ok(());
    }

    let source: Arc<dyn ResearchStatusSource> =
        Arc::new(wiring::build_research_status(&config, clock));
    let interval = Duration::from_millis(config.research.poll_interval_ms.max(1));
    let poller = ResearchPoller::new(source).with_interval(interval);
    let observer = Arc::new(ConsoleObserver::new(started));
    let handle = poller.spawn(launch.job_id.clone(), started, observer);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let state = tokio::select! {
        state = follow(&handle, interval) => state,
        _ = &mut shutdown => {
            tracing::info!(job_id = %handle.job_id(), "Shutdown signal received");
            handle.cancel();
            handle.state()
        }
    };

    match state {
        PollState::Completed(job) => {
            print_final(&job, handle.elapsed());
            Ok(())
        }
        PollState::Cancelled => {
            println!(
                "[{}] Stopped following job {}",
                format_elapsed(handle.elapsed()),
                handle.job_id()
            );
            Ok(())
        }
        PollState::Errored(reason) => bail!("Deep research polling stopped: {}", reason),
        PollState::Polling => bail!("Deep research polling ended unexpectedly"),
    }
}

/// Wait for a terminal state, re-triggering a read after each failed one
async fn follow(handle: &PollHandle, retry_delay: Duration) -> PollState {
    let mut retries = 0;
    let mut state = handle.settled().await;
    loop {
        let PollState::Errored(reason) = &state else {
            return state;
        };
        if retries == MAX_RETRIES {
            return state;
        }

        retries += 1;
        eprintln!("{} (retry {}/{})", reason, retries, MAX_RETRIES);
        tokio::time::sleep(retry_delay).await;

        state = match handle.retry().await {
            PollState::Polling => handle.settled().await,
            other => other,
        };
    }
}

/// Prints a line whenever the job moves forward
struct ConsoleObserver {
    started: Instant,
    last: Mutex<Option<(u32, usize)>>,
}

impl ConsoleObserver {
    fn new(started: Instant) -> Self {
        Self {
            started,
            last: Mutex::new(None),
        }
    }
}

impl ResearchObserver for ConsoleObserver {
    fn on_progress(&self, job: &ResearchJob) {
        let key = (job.current_depth, job.data.activities.len());
        if let Ok(mut last) = self.last.lock() {
            if *last == Some(key) {
                return;
            }
            *last = Some(key);
        }

        let latest = job
            .data
            .activities
            .last()
            .map(|a| format!(" - {}", a.message))
            .unwrap_or_default();
        println!(
            "[{}] depth {}/{} ({}%){}",
            format_elapsed(self.started.elapsed()),
            job.current_depth,
            job.max_depth,
            job.progress_percentage,
            latest
        );
    }

    fn on_complete(&self, job: ResearchJob) {
        tracing::info!(
            job_id = %job.job_id,
            sources = job.data.sources.len(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Deep research finished"
        );
    }

    fn on_error(&self, error: &str) {
        eprintln!("[{}] {}", format_elapsed(self.started.elapsed()), error);
    }
}

fn print_final(job: &ResearchJob, elapsed: Duration) {
    println!();
    println!("Research completed in {}", format_elapsed(elapsed));
    println!("=========================");
    println!();

    match &job.data.final_analysis {
        Some(analysis) if !analysis.trim().is_empty() => println!("{}", analysis.trim()),
        _ => println!("No final analysis was returned."),
    }
    println!();

    if !job.data.sources.is_empty() {
        println!("Sources ({}):", job.data.sources.len());
        for source in &job.data.sources {
            println!("  - {} ({})", source.title, source.url);
        }
    }
}
