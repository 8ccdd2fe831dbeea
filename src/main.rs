use badge_scrap::cli::{self, Args};
use badge_scrap::{info_time, Result};
use chrono::Local;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    cli::init_tracing();
    let start_time = Local::now();
    cli::run(Args::parse()).await?;
    info_time!(start_time, "Full program time:");

    Ok(())
}
