use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::diag::{Diagnostics, TracingDiagnostics};
use crate::election::{elections, WindowEnd};
use crate::process::{CrawlEnd, CrawlOptions};
use crate::request::{self, HttpFetcher};
use crate::snapshot;
use crate::store::BadgeStore;
use crate::{
    info_time, Result, DAY_SECS, DEFAULT_DATA_DIR, DEFAULT_HOST, DEFAULT_SCHEME,
    FOREVER_SLEEP_SECS, HOUR_SECS, LEGACY_WINDOW_DAYS, REQUEST_INTERVAL_MS,
};

#[derive(Debug, Parser)]
#[command(name = "badge_scrap", version, about = "Incrementally scrape badge award listings")]
pub struct Args {
    /// Site to scrape, e.g. math.stackexchange.com
    #[arg(long, env = "BADGE_SCRAP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Badge id to track. Repeat for several badges.
    #[arg(short = 'b', long = "badge", required = true)]
    pub badges: Vec<u64>,

    /// Directory holding one snapshot per badge.
    #[arg(long, env = "BADGE_SCRAP_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_SCHEME)]
    pub scheme: String,

    /// Pause before every page request.
    #[arg(long, default_value_t = REQUEST_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Stop crawling at the first badge already in the snapshot.
    #[arg(short = 'x', long)]
    pub stop_on_existing: bool,

    /// Only analyze the existing snapshots.
    #[arg(short = 'n', long)]
    pub no_update: bool,

    /// Crawl but leave the snapshots untouched.
    #[arg(short = 'm', long)]
    pub no_write: bool,

    /// Repeat every few minutes until killed.
    #[arg(short = 'e', long)]
    pub forever: bool,

    /// Print per-election timelines as JSON to stdout.
    #[arg(long)]
    pub report: bool,

    #[arg(long, default_value_t = 1)]
    pub bucket_hours: i64,

    /// End each election a fixed number of days after its first award instead
    /// of at its last award.
    #[arg(long)]
    pub fixed_window: bool,

    #[arg(long, default_value_t = LEGACY_WINDOW_DAYS)]
    pub window_days: i64,
}

impl Args {
    fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            request_interval: Duration::from_millis(self.interval_ms),
            stop_on_existing: self.stop_on_existing,
        }
    }

    fn window_end(&self) -> WindowEnd {
        if self.fixed_window {
            WindowEnd::FixedOffset(self.window_days * DAY_SECS)
        } else {
            WindowEnd::LastObserved
        }
    }
}

/// Human-readable logs on stderr, `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub async fn run(args: Args) -> Result<()> {
    let mut diag = TracingDiagnostics;
    let opts = args.crawl_options();
    let client = request::client()?;

    let mut stores = Vec::with_capacity(args.badges.len());
    for &badge_id in &args.badges {
        let path = snapshot::path_for(&args.data_dir, &args.host, badge_id);
        let store = BadgeStore::load(&path, &args.host, badge_id).await?;
        info_time!("Loaded {} badges from {}", store.len(), path.display());
        stores.push((path, store));
    }

    loop {
        let round_start = Local::now();
        let mut first_err = None;

        if !args.no_update {
            for (path, store) in stores.iter_mut() {
                let fetcher = HttpFetcher::with_client(
                    client.clone(),
                    &args.scheme,
                    &args.host,
                    store.badge_id(),
                );
                match store.update(&fetcher, &opts, &mut diag).await {
                    Ok(summary) => {
                        let how = match summary.end {
                            CrawlEnd::ReachedEnd => "reached the end",
                            CrawlEnd::CaughtUp => "caught up",
                        };
                        info_time!(
                            round_start,
                            "{}/badges/{}: {} new over {} pages, {}",
                            store.host(),
                            store.badge_id(),
                            summary.added,
                            summary.pages,
                            how
                        );
                    }
                    Err(err) => {
                        tracing::error!(
                            badge_id = store.badge_id(),
                            "Update failed, snapshot left as is: {err}"
                        );
                        first_err.get_or_insert(err);
                        continue;
                    }
                }
                if !args.no_write {
                    store.save(path.as_path()).await?;
                    info_time!("Wrote {} badges to {}", store.len(), path.display());
                }
            }
        }

        if args.report {
            report(&args, &stores, &mut diag)?;
        }

        if !args.forever {
            return first_err.map_or(Ok(()), Err);
        }
        info_time!(round_start, "Sleeping for a while");
        tokio::time::sleep(Duration::from_secs(FOREVER_SLEEP_SECS)).await;
    }
}

fn report(args: &Args, stores: &[(PathBuf, BadgeStore)], diag: &mut dyn Diagnostics) -> Result<()> {
    let names: Vec<String> = stores.iter().map(|(_, s)| s.badge_id().to_string()).collect();
    let roles: Vec<(&str, &BadgeStore)> = names
        .iter()
        .zip(stores)
        .map(|(name, (_, store))| (name.as_str(), store))
        .collect();

    let windows = elections(&roles, args.bucket_hours * HOUR_SECS, args.window_end(), diag)?;
    info_time!("Built timelines for {} elections", windows.len());
    println!("{}", serde_json::to_string_pretty(&windows)?);
    Ok(())
}
