use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::DedupCache;
use crate::error::Result;
use crate::notify::Notifier;
use crate::poller::poll_site;
use crate::sites::SiteDescriptor;

/// Inter-cycle sleep bounds; the actual sleep is sampled fresh each cycle.
#[derive(Debug, Clone, Copy)]
pub struct Intervals {
    pub min: Duration,
    pub max: Duration,
}

/// Source of the randomized inter-cycle delay. Injectable so tests can pin
/// the interval.
pub trait Jitter: Send + Sync {
    /// Picks a duration in `[min, max)`.
    fn pick(&self, min: Duration, max: Duration) -> Duration;
}

/// Uniform jitter, so the polling cadence is not a fixed, detectable beat.
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn pick(&self, min: Duration, max: Duration) -> Duration {
        rand::thread_rng().gen_range(min..max)
    }
}

/// Runs poll cycles until cancelled. The first cycle starts immediately;
/// each subsequent one waits a freshly sampled jittered interval. A
/// notification-delivery failure aborts the loop with an error.
pub async fn run(
    sites: Vec<SiteDescriptor>,
    client: Client,
    cache: Arc<DedupCache>,
    notifier: Arc<dyn Notifier>,
    intervals: Intervals,
    jitter: impl Jitter,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        run_cycle(&sites, &client, &cache, &notifier, &cancel).await?;

        let sleep_for = jitter.pick(intervals.min, intervals.max);
        debug!(seconds = sleep_for.as_secs_f64(), "sleeping");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancellation received, not starting a new cycle");
                return Ok(());
            }
            _ = tokio::time::sleep(sleep_for) => {}
        }
    }
}

/// One pass over every site, dispatched concurrently. Waits for all site
/// tasks before returning, so a cycle never overlaps the next sleep.
async fn run_cycle(
    sites: &[SiteDescriptor],
    client: &Client,
    cache: &Arc<DedupCache>,
    notifier: &Arc<dyn Notifier>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    for site in sites {
        let site = site.clone();
        let client = client.clone();
        let cache = Arc::clone(cache);
        let notifier = Arc::clone(notifier);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            poll_site(&site, &client, &cancel, &cache, notifier.as_ref()).await
        });
    }

    // Collect every task before deciding the cycle's fate, so one failing
    // notification does not leave detached polls running.
    let mut result = Ok(());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => result = Err(err),
            Err(err) => error!(error = %err, "site poll task failed to join"),
        }
    }

    result
}
